//! Cross-crate integration tests.

pub mod backends;
pub mod flows;
pub mod gateway;
