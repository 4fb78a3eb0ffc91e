//! Appointment state machine.
//!
//! Legal paths:
//!
//! ```text
//! pending ──→ confirmed ──→ completed
//!    │             │
//!    └──→ cancelled ←──┘
//! ```
//!
//! `completed` and `cancelled` are terminal. No timeouts or expirations
//! exist; a pending appointment stays pending until a doctor acts.

use crate::domain::entities::AppointmentStatus;
use crate::domain::errors::{CoreError, CoreResult};

/// True for statuses that admit no further transitions.
pub fn is_terminal(status: AppointmentStatus) -> bool {
    matches!(
        status,
        AppointmentStatus::Completed | AppointmentStatus::Cancelled
    )
}

/// True when `from → to` is a legal transition.
pub fn can_transition(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    use AppointmentStatus::*;
    matches!(
        (from, to),
        (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
    )
}

/// Check a requested transition, reporting an illegal one as a validation
/// failure.
pub fn check_transition(from: AppointmentStatus, to: AppointmentStatus) -> CoreResult<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(CoreError::validation(format!(
            "illegal status transition: {} -> {}",
            from, to
        )))
    }
}
