// Utility modules shared across models and services

pub mod date;
