// Service module exports

pub mod activity;
pub mod database;
pub mod repository;
pub mod schedule;
pub mod trip;
