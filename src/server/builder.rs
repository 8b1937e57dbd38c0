//! ServerBuilder for fluent API to build the storefront server

use super::middleware::JwtAuthProvider;
use super::router::{build_router, cors_layer};
use super::state::AppState;
use crate::config::AppConfig;
use crate::core::auth::AuthProvider;
use crate::core::credentials::TokenService;
use crate::services::accounts;
use crate::storage::Repositories;
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder for the storefront HTTP server
///
/// # Example
///
/// ```ignore
/// let config = AppConfig::from_env()?;
/// ServerBuilder::new()
///     .with_config(config)
///     .with_repositories(Repositories::in_memory())
///     .serve()
///     .await?;
/// ```
pub struct ServerBuilder {
    config: Option<AppConfig>,
    repositories: Option<Repositories>,
    custom_routes: Vec<Router<AppState>>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            repositories: None,
            custom_routes: Vec::new(),
        }
    }

    /// Set the configuration (required)
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the storage backend; defaults to empty in-memory storage
    pub fn with_repositories(mut self, repositories: Repositories) -> Self {
        self.repositories = Some(repositories);
        self
    }

    /// Add routes next to the API
    ///
    /// They are served behind the same authentication middleware, so
    /// handlers may use [`CurrentPrincipal`](crate::core::extractors::CurrentPrincipal).
    pub fn with_custom_routes(mut self, routes: Router<AppState>) -> Self {
        self.custom_routes.push(routes);
        self
    }

    fn config(&self) -> Result<&AppConfig> {
        self.config
            .as_ref()
            .context("AppConfig is required. Call .with_config()")
    }

    /// Validate the configuration and assemble the shared handler state
    pub fn build_state(&self) -> Result<AppState> {
        let config = self.config()?;
        config.validate()?;

        let repos = self
            .repositories
            .clone()
            .unwrap_or_else(Repositories::in_memory);
        let tokens = TokenService::new(&config.auth.jwt_secret, config.auth.token_ttl_hours);

        Ok(AppState::new(repos, tokens, config.pricing))
    }

    /// Build the final router
    pub fn build(self) -> Result<Router> {
        let state = self.build_state()?;
        let config = self.config()?;

        let provider: Arc<dyn AuthProvider> = Arc::new(JwtAuthProvider::new(
            state.tokens.clone(),
            state.repos.clone(),
        ));
        let cors = cors_layer(&config.server.cors_origins);

        Ok(build_router(state, provider, cors, self.custom_routes))
    }

    /// Create the configured super admin if no admin exists yet
    pub async fn bootstrap(&self) -> Result<()> {
        let config = self.config()?;
        let Some(bootstrap) = &config.bootstrap_admin else {
            return Ok(());
        };
        let repos = self
            .repositories
            .as_ref()
            .context("Bootstrapping needs repositories. Call .with_repositories()")?;

        if let Some(admin) = accounts::bootstrap_super_admin(repos, bootstrap).await? {
            tracing::info!(admin_id = %admin.id, email = %admin.email, "created initial super admin");
        }
        Ok(())
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bootstrap the first super admin when configured
    /// - Bind to the configured address
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(mut self) -> Result<()> {
        if self.repositories.is_none() {
            self.repositories = Some(Repositories::in_memory());
        }
        self.bootstrap().await?;

        let addr = self.config()?.listen_addr();
        let app = self.build()?;
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BootstrapAdmin;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "0123456789abcdef0123456789abcdef".to_string();
        config
    }

    #[test]
    fn test_build_requires_config() {
        let err = ServerBuilder::new().build().unwrap_err();
        assert!(err.to_string().contains("AppConfig is required"));
    }

    #[test]
    fn test_build_rejects_missing_secret() {
        let err = ServerBuilder::new()
            .with_config(AppConfig::default())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_build_with_defaults() {
        assert!(ServerBuilder::new().with_config(config()).build().is_ok());
    }

    #[tokio::test]
    async fn test_bootstrap_creates_super_admin_once() {
        let repos = Repositories::in_memory();
        let mut config = config();
        config.bootstrap_admin = Some(BootstrapAdmin {
            name: "Root".into(),
            email: "root@example.com".into(),
            password: "rootpassword".into(),
        });

        let builder = ServerBuilder::new()
            .with_config(config)
            .with_repositories(repos.clone());
        builder.bootstrap().await.unwrap();
        builder.bootstrap().await.unwrap();

        assert_eq!(repos.admins.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_without_admin_config_is_noop() {
        let repos = Repositories::in_memory();
        ServerBuilder::new()
            .with_config(config())
            .with_repositories(repos.clone())
            .bootstrap()
            .await
            .unwrap();
        assert!(repos.admins.list().await.unwrap().is_empty());
    }
}
