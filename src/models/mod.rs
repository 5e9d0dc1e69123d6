//! Domain models
//!
//! Ledger records, equipment, users, sessions and audit rows.

pub mod audit;
pub mod equipment;
pub mod session;
pub mod trip;
pub mod user;

pub use audit::*;
pub use equipment::*;
pub use session::*;
pub use trip::*;
pub use user::*;

/// A persisted label that does not name any known variant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown {kind} label: '{label}'")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub label: String,
}

impl UnknownLabel {
    pub fn new(kind: &'static str, label: &str) -> Self {
        Self {
            kind,
            label: label.to_string(),
        }
    }
}
