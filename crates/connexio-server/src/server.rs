use std::sync::Arc;

use connexio_store::SyncStore;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::SharedStore;
use crate::router::build_router;

/// Connexio sync server.
pub struct ConnexioServer {
    config: ServerConfig,
    store: SharedStore,
}

impl ConnexioServer {
    /// Open the store under `config.data_dir`.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let store = Arc::new(SyncStore::open(&config.data_dir)?);
        Ok(Self { config, store })
    }

    /// Serve an already opened store.
    pub fn with_store(config: ServerConfig, store: SharedStore) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(Arc::clone(&self.store), &self.config)
    }

    /// Start serving requests until Ctrl-C.
    ///
    /// Failing to bind the listening address is returned immediately.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let addr = self.config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        tracing::info!("Connexio server listening on {}", listener.local_addr()?);
        tracing::info!("Data directory: {}", self.config.data_dir.display());
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
