use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use epj_tracker::cache::{CacheOperations, MemoryCache, ProjectionCache, RedisClient};
use epj_tracker::config::{DatabaseConfig, EnvironmentConfig};
use epj_tracker::repositories::{postgres_store::PgStore, Repositories};
use epj_tracker::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let config = EnvironmentConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    info!("🛠️ EPJ Tracker ({})", config.environment);
    info!("================================================");

    let repos = match &config.database_url {
        Some(url) => {
            let pool = DatabaseConfig::new(url.clone()).create_pool().await.map_err(|e| {
                error!("❌ Could not connect to the database: {}", e);
                anyhow::anyhow!("Database error: {}", e)
            })?;
            PgStore::migrate(&pool).await?;
            info!("✅ PostgreSQL connected, migrations applied");
            Repositories::postgres(pool)
        }
        None => {
            warn!("⚠️ DATABASE_URL not set, using in-memory storage. Data is lost on restart.");
            Repositories::in_memory()
        }
    };

    let cache_config = config.cache_config();
    let backend: Arc<dyn CacheOperations> = match &cache_config.redis_url {
        Some(url) => match RedisClient::connect(url).await {
            Ok(client) => {
                info!("✅ Redis connected");
                Arc::new(client)
            }
            Err(e) => {
                error!("❌ Could not connect to Redis: {}", e);
                return Err(anyhow::anyhow!("Redis error: {}", e));
            }
        },
        None => {
            info!("💾 REDIS_URL not set, using the in-process cache");
            Arc::new(MemoryCache::new())
        }
    };
    let cache = ProjectionCache::new(backend, cache_config);

    let addr: SocketAddr = config.server_url().parse()?;
    let state = AppState::new(config, repos, cache);
    let sweeper = state.spawn_session_cleanup();
    let app = create_router(state);

    info!("🌐 Listening on http://{}", addr);
    info!("🔍 Endpoints:");
    info!("   GET  /health");
    info!("   /api/auth      login, logout, password, active-drivers");
    info!("   /api/trips     checkout, checkin, swap, mine");
    info!("   /api/equipment statuses, overview, zones, location");
    info!("   /api/admin     trips, maintenance, overrides, equipment, zones, users, dashboard");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Server error: {}", e);
    }

    sweeper.abort();
    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ Could not install the Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ Could not install the SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Ctrl+C received, shutting down...");
        },
        _ = terminate => {
            info!("🛑 SIGTERM received, shutting down...");
        },
    }
}
