//! Shared application state
//!
//! Built once at startup and handed to every handler through axum's `State`.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::ProjectionCache;
use crate::config::EnvironmentConfig;
use crate::repositories::Repositories;
use crate::services::{
    AuthService, BcryptHasher, CheckoutCoordinator, PasswordHasher, ProjectionService,
    SessionStore, UserService,
};

/// How often expired sessions are swept.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EnvironmentConfig>,
    pub repos: Repositories,
    pub projections: ProjectionService,
    pub coordinator: CheckoutCoordinator,
    pub auth: AuthService,
    pub users: UserService,
}

impl AppState {
    pub fn new(config: EnvironmentConfig, repos: Repositories, cache: ProjectionCache) -> Self {
        let hasher = Arc::new(BcryptHasher::new(config.bcrypt_cost));
        Self::with_hasher(config, repos, cache, hasher)
    }

    pub fn with_hasher(
        config: EnvironmentConfig,
        repos: Repositories,
        cache: ProjectionCache,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        let projections = ProjectionService::new(repos.clone(), cache);
        let coordinator =
            CheckoutCoordinator::new(repos.clone(), projections.clone(), config.lock_timeout);
        let sessions = SessionStore::new(config.session_ttl_hours);
        let auth = AuthService::new(
            repos.clone(),
            projections.clone(),
            sessions,
            hasher.clone(),
            config.geofence,
        );
        let users = UserService::new(repos.clone(), projections.clone(), hasher);

        Self {
            config: Arc::new(config),
            repos,
            projections,
            coordinator,
            auth,
            users,
        }
    }

    /// In-memory stores and cache, for tests and single-process runs.
    pub fn in_memory(config: EnvironmentConfig) -> Self {
        let cache = ProjectionCache::in_memory(config.cache_config());
        Self::new(config, Repositories::in_memory(), cache)
    }

    /// Periodically drop expired sessions.
    pub fn spawn_session_cleanup(&self) -> JoinHandle<()> {
        let sessions = self.auth.sessions().clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let removed = sessions.cleanup_expired().await;
                debug!(
                    "🧹 Session sweep removed {}, {} still active",
                    removed,
                    sessions.active_count().await
                );
            }
        })
    }
}
