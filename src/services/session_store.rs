//! Session store
//!
//! Opaque bearer tokens mapped to identities, each with an absolute expiry.

use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Identity, Session};

/// Default absolute session lifetime.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Opaque tokens mapped to identities. Independent of the ledger.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_hours: i64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Issue a fresh token for `identity`.
    pub async fn issue(&self, identity: Identity) -> Session {
        let issued_at = Utc::now();
        let session = Session {
            token: Uuid::new_v4().to_string(),
            identity,
            issued_at,
            expires_at: issued_at + self.ttl,
        };
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.clone());
        info!("🔑 Session issued for {}", session.identity.username);
        session
    }

    /// Identity behind `token`, or `None` when absent or expired.
    pub async fn resolve(&self, token: &str) -> Option<Identity> {
        let sessions = self.sessions.read().await;
        match sessions.get(token) {
            Some(session) if !session.is_expired_at(Utc::now()) => Some(session.identity.clone()),
            Some(_) => {
                debug!("⏰ Expired session presented");
                None
            }
            None => None,
        }
    }

    pub async fn logout(&self, token: &str) {
        if let Some(session) = self.sessions.write().await.remove(token) {
            info!("👋 Session closed for {}", session.identity.username);
        }
    }

    /// Drop every expired session. Returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        let removed = before - sessions.len();
        if removed > 0 {
            info!("🧹 Removed {} expired sessions", removed);
        }
        removed
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL_HOURS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn driver() -> Identity {
        Identity {
            username: "alice".to_string(),
            role: Role::Driver,
        }
    }

    #[tokio::test]
    async fn test_issue_resolve_logout() {
        let store = SessionStore::default();
        let session = store.issue(driver()).await;
        assert_eq!(store.resolve(&session.token).await, Some(driver()));

        store.logout(&session.token).await;
        store.logout(&session.token).await;
        assert_eq!(store.resolve(&session.token).await, None);
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let store = SessionStore::default();
        let a = store.issue(driver()).await;
        let b = store.issue(driver()).await;
        assert_ne!(a.token, b.token);
        assert_eq!(store.active_count().await, 2);
    }

    #[tokio::test]
    async fn test_expired_sessions_do_not_resolve() {
        let store = SessionStore::new(0);
        let session = store.issue(driver()).await;
        assert_eq!(store.resolve(&session.token).await, None);
        assert_eq!(store.cleanup_expired().await, 1);
        assert_eq!(store.active_count().await, 0);
    }
}
