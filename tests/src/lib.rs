//! # Clinic Test Suite
//!
//! Unified test crate for cross-crate scenarios.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── integration/
//! │   ├── backends.rs   # Store contract properties, run on every backend
//! │   ├── flows.rs      # End-to-end lifecycle and messaging scenarios
//! │   └── gateway.rs    # HTTP surface against a real router
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p clinic-tests
//! cargo test -p clinic-tests integration::backends::
//! ```

#![allow(dead_code)]

pub mod integration;
