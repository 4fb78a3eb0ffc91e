//! Pure domain logic: entities, identifiers, access rules, and the
//! appointment lifecycle. Nothing in this module touches a backend.

pub mod access;
pub mod entities;
pub mod errors;
pub mod ids;
pub mod lifecycle;
