use anyhow::Result;
use storefront::config::{AppConfig, StorageBackend};
use storefront::server::ServerBuilder;
use storefront::storage::Repositories;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the environment may already be populated
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    config.validate()?;

    let repositories = connect(&config).await?;
    tracing::info!(backend = ?config.storage.backend, "storage ready");

    ServerBuilder::new()
        .with_config(config)
        .with_repositories(repositories)
        .serve()
        .await
}

async fn connect(config: &AppConfig) -> Result<Repositories> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage; data is lost on shutdown");
            Ok(Repositories::in_memory())
        }
        #[cfg(feature = "mongodb_backend")]
        StorageBackend::Mongodb => {
            use anyhow::Context;
            use storefront::storage::MongoStore;

            let uri = config
                .storage
                .mongodb_uri
                .as_deref()
                .context("MONGODB_URI is required for the mongodb backend")?;
            let store = MongoStore::connect(uri, &config.storage.mongodb_database).await?;
            store.ensure_indexes().await?;
            Ok(Repositories::from_backend(store))
        }
        #[cfg(not(feature = "mongodb_backend"))]
        StorageBackend::Mongodb => {
            anyhow::bail!("this build has no MongoDB support; rebuild with --features mongodb_backend")
        }
    }
}
