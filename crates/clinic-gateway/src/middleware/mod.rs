//! Request middleware.

pub mod identity;
