//! Authentication
//!
//! Login against the cached user directory, geofence audit of every attempt,
//! session resolution and password changes.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::geofence::Geofence;
use super::password::PasswordHasher;
use super::projection_service::ProjectionService;
use super::session_store::SessionStore;
use crate::cache::CacheKey;
use crate::models::{Identity, LoginAuditEntry, Session};
use crate::repositories::Repositories;
use crate::utils::errors::{bad_request_error, AppError, AppResult};

#[derive(Debug, Clone, Default)]
pub struct LoginAttempt {
    pub username: String,
    pub password: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Clone)]
pub struct AuthService {
    repos: Repositories,
    projections: ProjectionService,
    sessions: SessionStore,
    hasher: Arc<dyn PasswordHasher>,
    geofence: Geofence,
}

impl AuthService {
    pub fn new(
        repos: Repositories,
        projections: ProjectionService,
        sessions: SessionStore,
        hasher: Arc<dyn PasswordHasher>,
        geofence: Geofence,
    ) -> Self {
        Self {
            repos,
            projections,
            sessions,
            hasher,
            geofence,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// `None` for any credential mismatch; the caller never learns which
    /// half was wrong.
    pub async fn login(&self, attempt: LoginAttempt) -> AppResult<Option<Session>> {
        let directory = self.projections.user_directory().await?;
        let user = directory.find(&attempt.username);

        let matched = match user {
            Some(user) => self.hasher.verify(&attempt.password, &user.password_hash)?,
            None => false,
        };

        let at_warehouse = match (attempt.latitude, attempt.longitude) {
            (Some(lat), Some(lon)) => self.geofence.contains(lat, lon),
            _ => false,
        };
        let entry = LoginAuditEntry {
            timestamp: Utc::now(),
            username: attempt.username.clone(),
            latitude: attempt.latitude,
            longitude: attempt.longitude,
            at_warehouse,
        };
        if let Err(e) = self.repos.audit.record_login(entry).await {
            error!("❌ Could not record login attempt for {}: {}", attempt.username, e);
        }

        match user {
            Some(user) if matched => {
                let session = self
                    .sessions
                    .issue(Identity {
                        username: user.username.clone(),
                        role: user.role,
                    })
                    .await;
                info!("✅ Login for {} ({}), at warehouse: {}", user.username, user.role, at_warehouse);
                Ok(Some(session))
            }
            _ => {
                warn!("❌ Failed login for '{}'", attempt.username);
                Ok(None)
            }
        }
    }

    pub async fn resolve(&self, token: &str) -> AppResult<Identity> {
        self.sessions
            .resolve(token)
            .await
            .ok_or(AppError::InvalidSession)
    }

    pub async fn logout(&self, token: &str) {
        self.sessions.logout(token).await;
    }

    pub async fn change_password(
        &self,
        identity: &Identity,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<String> {
        if new_password.is_empty() {
            return Err(bad_request_error("A new password is required."));
        }
        let directory = self.projections.user_directory().await?;
        let user = directory
            .find(&identity.username)
            .ok_or_else(|| AppError::Rejected("Could not find user profile.".to_string()))?;

        if !self.hasher.verify(current_password, &user.password_hash)? {
            return Err(AppError::Rejected("Incorrect current password.".to_string()));
        }

        let new_hash = self.hasher.hash(new_password)?;
        self.repos
            .users
            .set_password_hash(&user.username, &new_hash)
            .await?;
        self.projections
            .cache()
            .invalidate(&[CacheKey::UserDirectory])
            .await;

        info!("🔐 {} changed their password", user.username);
        Ok("Password updated successfully!".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, ProjectionCache};
    use crate::models::{Role, User};
    use crate::repositories::MemoryStore;
    use crate::services::password::BcryptHasher;

    async fn service() -> (AuthService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let repos = Repositories::from_store(store.clone());
        let hasher = Arc::new(BcryptHasher::new(4));
        repos
            .users
            .insert_users(vec![User {
                username: "Alice".to_string(),
                password_hash: hasher.hash("secret").unwrap(),
                role: Role::Driver,
                carrier: "ACME".to_string(),
            }])
            .await
            .unwrap();
        let projections =
            ProjectionService::new(repos.clone(), ProjectionCache::in_memory(CacheConfig::default()));
        let auth = AuthService::new(
            repos,
            projections,
            SessionStore::default(),
            hasher,
            Geofence::default(),
        );
        (auth, store)
    }

    fn attempt(username: &str, password: &str) -> LoginAttempt {
        LoginAttempt {
            username: username.to_string(),
            password: password.to_string(),
            ..LoginAttempt::default()
        }
    }

    #[tokio::test]
    async fn test_login_is_case_insensitive() {
        let (auth, _) = service().await;
        let session = auth.login(attempt("alice", "secret")).await.unwrap().unwrap();
        let identity = auth.resolve(&session.token).await.unwrap();
        assert_eq!(identity.username, "Alice");
        assert_eq!(identity.role, Role::Driver);
    }

    #[tokio::test]
    async fn test_bad_credentials_look_the_same() {
        let (auth, store) = service().await;
        assert!(auth.login(attempt("alice", "wrong")).await.unwrap().is_none());
        assert!(auth.login(attempt("nobody", "secret")).await.unwrap().is_none());
        assert_eq!(store.login_audit().await.len(), 2);
    }

    #[tokio::test]
    async fn test_login_audit_records_geofence() {
        let (auth, store) = service().await;
        let at_dock = LoginAttempt {
            latitude: Some(39.5839),
            longitude: Some(-76.0261),
            ..attempt("alice", "secret")
        };
        auth.login(at_dock).await.unwrap();
        auth.login(attempt("alice", "secret")).await.unwrap();

        let audit = store.login_audit().await;
        assert!(audit[0].at_warehouse);
        assert!(!audit[1].at_warehouse);
        assert_eq!(audit[1].latitude, None);
    }

    #[tokio::test]
    async fn test_logout_invalidates_token() {
        let (auth, _) = service().await;
        let session = auth.login(attempt("alice", "secret")).await.unwrap().unwrap();
        auth.logout(&session.token).await;
        assert!(matches!(
            auth.resolve(&session.token).await.unwrap_err(),
            AppError::InvalidSession
        ));
    }

    #[tokio::test]
    async fn test_change_password() {
        let (auth, _) = service().await;
        let me = Identity {
            username: "Alice".to_string(),
            role: Role::Driver,
        };
        assert!(matches!(
            auth.change_password(&me, "wrong", "new").await.unwrap_err(),
            AppError::Rejected(msg) if msg == "Incorrect current password."
        ));
        auth.change_password(&me, "secret", "new").await.unwrap();
        assert!(auth.login(attempt("alice", "secret")).await.unwrap().is_none());
        assert!(auth.login(attempt("alice", "new")).await.unwrap().is_some());
    }
}
