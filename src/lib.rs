// GT-Cal - campus events calendar: REST server and client-side sync layer

// Server
pub mod app_state;
pub mod calendar_interface;
pub mod config;
pub mod database;

// Domain types
pub mod models;

// Client-side state, validation and view projections
pub mod sync;
pub mod validation;
pub mod views;

// Common utilities
pub mod data_seeder;
pub mod error;
pub mod infrastructure;

// Re-exports for convenience
pub use error::{AppError, AppResult};
