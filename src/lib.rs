// Trip Scheduler Library
// Exports all modules for testing and reuse

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{Result, ScheduleError};
