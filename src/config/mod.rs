//! Configuration
//!
//! Environment variables and the database pool.

pub mod database;
pub mod environment;

pub use database::DatabaseConfig;
pub use environment::EnvironmentConfig;
