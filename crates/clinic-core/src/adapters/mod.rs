//! Persistence adapter implementations.
//!
//! Three interchangeable backends behind [`crate::ports::outbound::ClinicStore`]:
//! an ephemeral in-memory arena, a relational store (SQLite), and a
//! document store over a key-value port.

pub mod document;
pub mod memory;
pub mod sqlite;
