//! Gateway assembly: construct the configured backend, wire the engine,
//! serve.

use crate::domain::config::{BackendKind, GatewayConfig};
use crate::domain::error::GatewayError;
use crate::router::{self, AppState};
use axum::Router;
use clinic_core::{ClinicStore, DocumentStore, InMemoryKVStore, MemoryStore, SqliteStore};
use std::sync::Arc;
use tracing::info;

pub struct Gateway {
    config: GatewayConfig,
    state: AppState,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let store: Arc<dyn ClinicStore> = match &config.backend {
            BackendKind::Memory => Arc::new(MemoryStore::new()),
            BackendKind::Sqlite(path) => Arc::new(SqliteStore::open(path)?),
            BackendKind::Document => Arc::new(DocumentStore::new(InMemoryKVStore::new())),
        };
        info!(backend = ?config.backend, "persistence backend ready");

        let state = AppState::new(store, config.auth_secret.clone(), config.room_capacity);
        Ok(Self { config, state })
    }

    /// The assembled route tree, for embedding and for tests.
    pub fn router(&self) -> Router {
        router::router(self.state.clone())
    }

    /// Bind and serve until the process is stopped.
    pub async fn serve(self) -> Result<(), GatewayError> {
        let listener = tokio::net::TcpListener::bind(self.config.bind).await?;
        info!(bind = %self.config.bind, "clinic gateway listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}
