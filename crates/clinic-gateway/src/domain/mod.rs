//! Gateway-local domain: configuration and error translation.

pub mod config;
pub mod error;
