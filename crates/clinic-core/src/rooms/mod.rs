//! Consultation rooms: per-appointment chat fan-out.

pub mod broker;
