//! CMS authentication and authorization server library.
//!
//! Exports the core modules used by the server binary and by integration
//! tests.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

#[cfg(test)]
pub mod test_support;

// Re-export commonly used types for convenience
pub use config::AppSettings;
pub use error::AppError;
