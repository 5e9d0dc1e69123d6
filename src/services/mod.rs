//! Services module
//!
//! Projections over the ledger, the checkout coordinator that serializes every
//! write, and the session/account services around them.

pub mod active_trip_index;
pub mod auth_service;
pub mod checkout_coordinator;
pub mod geofence;
pub mod password;
pub mod projection_service;
pub mod session_store;
pub mod status_projector;
pub mod user_service;

pub use active_trip_index::ActiveTripIndex;
pub use auth_service::{AuthService, LoginAttempt};
pub use checkout_coordinator::{
    CheckInReport, CheckoutCoordinator, CheckoutTarget, SwapRequest, TripDetails, TripReceipt,
};
pub use geofence::Geofence;
pub use password::{BcryptHasher, PasswordHasher};
pub use projection_service::{ActiveCheckout, ActiveDriver, Dashboard, ProjectionService};
pub use session_store::SessionStore;
pub use user_service::{BulkCreateReport, MalformedBulkRow, NewUser, UserService};
