//! Port traits separating the engine from its backends.

pub mod outbound;
