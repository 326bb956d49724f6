use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use series_api::{
    config::{CatalogBackend, Config},
    db::{self, Cache},
    routes::{create_router, AppState},
    services::{
        catalog::{MemoryCatalogStore, PgCatalogStore},
        CatalogStore,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("series_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn CatalogStore> = match config.catalog_backend {
        CatalogBackend::Postgres => {
            let pool = db::create_pool(&config.database_url).await?;
            Arc::new(PgCatalogStore::new(pool))
        }
        CatalogBackend::Memory => match &config.catalog_seed_path {
            Some(path) => Arc::new(MemoryCatalogStore::load_seed_file(path).await?),
            None => {
                tracing::warn!("Memory catalog without CATALOG_SEED_PATH starts empty");
                Arc::new(MemoryCatalogStore::new())
            }
        },
    };

    tracing::info!(store = store.name(), "Catalog store ready");

    let mut state = AppState::new(store).with_similarity(config.similarity_policy());

    let cache_writer = match &config.redis_url {
        Some(redis_url) => {
            let (cache, writer) = Cache::connect(redis_url, config.cache_ttl_secs).await?;
            state = state.with_cache(cache);
            Some(writer)
        }
        None => None,
    };

    let app = create_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(address = %listener.local_addr()?, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
