//! Request and response bodies

pub mod auth_dto;
pub mod common;
pub mod equipment_dto;
pub mod trip_dto;
pub mod user_dto;

pub use common::ApiResponse;
