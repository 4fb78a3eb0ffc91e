//! # Clinic Gateway
//!
//! HTTP/WebSocket transport for the appointment engine. The gateway owns
//! everything that is not a rule of the system: bearer-token verification,
//! routing, error-to-status translation, and configuration. All decisions
//! about who may do what live in `clinic-core`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     CLINIC GATEWAY                       │
//! ├──────────────────────────────────────────────────────────┤
//! │   ┌────────────┐   ┌─────────────┐   ┌──────────────┐    │
//! │   │  HTTP API  │   │  WebSocket  │   │    Admin     │    │
//! │   └─────┬──────┘   └──────┬──────┘   └──────┬───────┘    │
//! │         │                 │                 │            │
//! │   ┌─────┴─────────────────┴─────────────────┴──────┐     │
//! │   │     Identity middleware (HMAC bearer token)    │     │
//! │   └───────────────────────┬────────────────────────┘     │
//! │                           │                              │
//! │            AppointmentService + RoomBroker               │
//! │                     (clinic-core)                        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use clinic_gateway::{Gateway, GatewayConfig};
//!
//! let config = GatewayConfig::from_env()?;
//! Gateway::new(config)?.serve().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod middleware;
pub mod router;
pub mod service;
pub mod ws;

pub use domain::config::{BackendKind, GatewayConfig};
pub use domain::error::{ApiError, GatewayError};
pub use middleware::identity::{mint_token, verify_token};
pub use router::AppState;
pub use service::Gateway;
