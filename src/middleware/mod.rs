//! Middleware
//!
//! Session extraction and CORS.

pub mod auth;
pub mod cors;

pub use auth::{bearer_token, SessionUser};
pub use cors::cors_layer;
