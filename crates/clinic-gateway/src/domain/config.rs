//! Gateway configuration, loaded from the environment.

use crate::domain::error::GatewayError;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Which persistence backend to construct at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    /// Ephemeral in-memory store. Contents reset with the process.
    Memory,
    /// SQLite database at the given path.
    Sqlite(PathBuf),
    /// Document store over the in-process key-value engine.
    Document,
}

impl BackendKind {
    /// Parse the `CLINIC_BACKEND` value: `memory`, `sqlite:<path>` or
    /// `document`.
    pub fn parse(s: &str) -> Result<Self, GatewayError> {
        match s {
            "memory" => Ok(BackendKind::Memory),
            "document" => Ok(BackendKind::Document),
            other => match other.strip_prefix("sqlite:") {
                Some(path) if !path.is_empty() => Ok(BackendKind::Sqlite(PathBuf::from(path))),
                _ => Err(GatewayError::Config(format!(
                    "unknown backend {:?}; expected memory, sqlite:<path> or document",
                    other
                ))),
            },
        }
    }
}

/// Runtime configuration for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind.
    pub bind: SocketAddr,
    /// Secret used to verify bearer tokens. Required; never defaulted to a
    /// literal.
    pub auth_secret: String,
    /// Persistence backend.
    pub backend: BackendKind,
    /// Broadcast buffer per consultation room.
    pub room_capacity: usize,
}

impl GatewayConfig {
    pub const DEFAULT_BIND: &'static str = "127.0.0.1:3000";

    /// Load configuration from `CLINIC_BIND`, `CLINIC_AUTH_SECRET`,
    /// `CLINIC_BACKEND` and `CLINIC_ROOM_CAPACITY`.
    pub fn from_env() -> Result<Self, GatewayError> {
        let bind = std::env::var("CLINIC_BIND")
            .unwrap_or_else(|_| Self::DEFAULT_BIND.to_string())
            .parse()
            .map_err(|e| GatewayError::Config(format!("invalid CLINIC_BIND: {}", e)))?;

        let auth_secret = std::env::var("CLINIC_AUTH_SECRET")
            .map_err(|_| GatewayError::Config("CLINIC_AUTH_SECRET is required".into()))?;
        if auth_secret.is_empty() {
            return Err(GatewayError::Config(
                "CLINIC_AUTH_SECRET must not be empty".into(),
            ));
        }

        let backend = match std::env::var("CLINIC_BACKEND") {
            Ok(value) => BackendKind::parse(&value)?,
            Err(_) => BackendKind::Memory,
        };

        let room_capacity = match std::env::var("CLINIC_ROOM_CAPACITY") {
            Ok(value) => {
                let capacity: usize = value.parse().map_err(|e| {
                    GatewayError::Config(format!("invalid CLINIC_ROOM_CAPACITY: {}", e))
                })?;
                // A broadcast channel cannot have capacity zero.
                if capacity == 0 {
                    return Err(GatewayError::Config(
                        "CLINIC_ROOM_CAPACITY must be at least 1".into(),
                    ));
                }
                capacity
            }
            Err(_) => clinic_core::rooms::broker::DEFAULT_ROOM_CAPACITY,
        };

        Ok(Self {
            bind,
            auth_secret,
            backend,
            room_capacity,
        })
    }
}
