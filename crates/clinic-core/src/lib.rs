//! # Clinic Core
//!
//! The appointment lifecycle and consultation messaging engine. This crate
//! owns the rules of the system: who may act on which appointment, which
//! status transitions are legal, and how chat messages are recorded and
//! fanned out to connected participants.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      CLINIC CORE                          │
//! ├───────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌────────────────┐   ┌────────────┐   │
//! │  │ Authorization│   │  Appointment   │   │   Room     │   │
//! │  │     Gate     │   │ State Machine  │   │   Broker   │   │
//! │  └──────┬───────┘   └───────┬────────┘   └─────┬──────┘   │
//! │         │                   │                  │          │
//! │  ┌──────┴───────────────────┴──────────────────┴──────┐   │
//! │  │            ClinicStore (persistence port)          │   │
//! │  └──────┬──────────────────┬───────────────────┬──────┘   │
//! │         │                  │                   │          │
//! │    MemoryStore        SqliteStore        DocumentStore    │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Pure domain logic (entities, access rules, lifecycle)
//! - `ports/` - Port traits (persistence adapter, key-value store)
//! - `adapters/` - Backend implementations (memory, sqlite, document)
//! - `rooms/` - Consultation room broker (durable append + fan-out)
//! - `service` - Application service implementing the operations
//!
//! ## Usage
//!
//! ```ignore
//! use clinic_core::{AppointmentService, MemoryStore, RoomBroker};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let service = AppointmentService::new(store.clone());
//! let broker = RoomBroker::new(store);
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod rooms;
pub mod service;

// Re-export key types for convenience
pub use adapters::document::DocumentStore;
pub use adapters::memory::MemoryStore;
pub use adapters::sqlite::SqliteStore;
pub use domain::access::{AdminAction, Principal};
pub use domain::entities::{
    Appointment, AppointmentStatus, AppointmentView, ChatMessage, ChatMessageView, NewAppointment,
    NewUser, Role, User, UserView,
};
pub use domain::errors::{CoreError, CoreResult, StoreError};
pub use domain::ids::EntityId;
pub use ports::outbound::{
    AppointmentFilter, ClinicStore, InMemoryKVStore, KeyValueStore, UserFilter,
};
pub use rooms::broker::{RoomBroker, RoomSubscription};
pub use service::{AppointmentService, BookingRequest, TransitionRequest};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
