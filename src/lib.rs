//! EPJ tracker
//!
//! Checkout and check-in of electric pallet jacks, backed by an append-only
//! trip ledger. Every status shown to an operator is a projection over that
//! ledger, cached and invalidated per event type.

pub mod cache;
pub mod config;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::create_router;
pub use state::AppState;
