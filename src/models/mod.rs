// Module exports for models

pub mod activity;
pub mod settings;
pub mod trip;
