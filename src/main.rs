use std::sync::Arc;

use reel_order::{
    config::{Config, StorageBackend},
    db::{self, Cache},
    routes::create_router,
    state::AppState,
    store::{MemoryStore, OrderStore, PgStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reel_order=debug,tower_http=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn OrderStore> = match config.storage_backend {
        StorageBackend::Postgres => {
            let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
            db::run_migrations(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        StorageBackend::Memory => {
            let store = MemoryStore::new();
            for subject in config.dev_user_subjects() {
                let user = store.insert_user(subject, None).await;
                tracing::info!(user_id = %user.id, subject, "Registered development user");
            }
            Arc::new(store)
        }
    };

    let (cache, cache_writer) = match config.redis_url.as_deref() {
        Some(redis_url) => {
            let client = db::create_redis_client(redis_url)?;
            let (cache, handle) = Cache::new(client).await;
            (Some(cache), Some(handle))
        }
        None => {
            tracing::info!("REDIS_URL not set, listing cache disabled");
            (None, None)
        }
    };

    let state = Arc::new(AppState::new(
        store.clone(),
        cache,
        config.bulk_reorder_mode,
    ));
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        address = %address,
        store = store.name(),
        bulk_reorder_mode = ?config.bulk_reorder_mode,
        "Server running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
