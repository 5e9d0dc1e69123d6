use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

/// Who is behind a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub role: Role,
}

/// Opaque token mapped to an identity, with an absolute expiry.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub identity: Identity,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
