//! Error taxonomy for the engine.
//!
//! Two layers: [`StoreError`] is everything a persistence adapter can
//! produce; [`CoreError`] adds the gate and state-machine failures. Errors
//! are returned as typed results and translated to status codes at the
//! transport edge; the core never logs and swallows them.

use thiserror::Error;

/// Errors originating in a persistence adapter. No other kinds do.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Referenced id is absent from the store.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness constraint (email) was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Adapter-level failure: connectivity, serialization, I/O.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend(message.into())
    }
}

/// Engine-level errors surfaced to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Role or ownership check failed.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Referenced user or appointment is absent.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Uniqueness constraint violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed input: empty message, illegal status transition.
    #[error("validation error: {0}")]
    Validation(String),

    /// Adapter failure, surfaced unchanged. Never retried by the core:
    /// retrying a non-idempotent transition or append could duplicate
    /// effects.
    #[error("backend error: {0}")]
    Backend(String),
}

impl CoreError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        CoreError::Forbidden(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => CoreError::NotFound { entity, id },
            StoreError::Conflict(message) => CoreError::Conflict(message),
            StoreError::Backend(message) => CoreError::Backend(message),
        }
    }
}

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;
