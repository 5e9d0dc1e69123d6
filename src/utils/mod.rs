//! Shared utilities: the error type and request field validators.

pub mod errors;
pub mod validation;
