//! Authorization gate.
//!
//! A stateless decision function over (principal, action, resource). It
//! consults nothing but its inputs: no network, no store, no bootstrap
//! state. Resource-level checks (participant of an appointment) are
//! evaluated after the role check.

use crate::domain::entities::{Appointment, Role};
use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::ids::EntityId;
use serde::{Deserialize, Serialize};

/// Verified identity attached to every call, as issued by the identity
/// provider. The core trusts it completely and never re-validates
/// credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: EntityId,
    pub role: Role,
}

/// Actions reserved to administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    ListUsers,
    ListAppointments,
    DeleteUser,
}

/// How "my appointments" scopes for a given role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MineScope {
    /// Filter on `patient_id == caller`.
    AsPatient,
    /// Filter on `doctor_id == caller`.
    AsDoctor,
    /// Neither role: an empty result, not an error.
    Empty,
}

/// Rule 1: admin-only actions require the admin role.
pub fn require_admin(principal: &Principal, action: AdminAction) -> CoreResult<()> {
    if principal.role == Role::Admin {
        Ok(())
    } else {
        Err(CoreError::forbidden(format!(
            "admin access required for {:?}",
            action
        )))
    }
}

/// Rule 2: booking requires the patient role. The new appointment's
/// `patient_id` is forced to the caller's id by the service, never taken
/// from the request body.
pub fn require_patient_booking(principal: &Principal) -> CoreResult<()> {
    if principal.role == Role::Patient {
        Ok(())
    } else {
        Err(CoreError::forbidden("only patients can book appointments"))
    }
}

/// Rule 3: role-based scoping for "my appointments".
pub fn mine_scope(role: Role) -> MineScope {
    match role {
        Role::Patient => MineScope::AsPatient,
        Role::Doctor => MineScope::AsDoctor,
        Role::Admin => MineScope::Empty,
    }
}

/// Rule 4a: status transitions require the caller to be the appointment's
/// doctor. Patients may not change status.
pub fn require_appointment_doctor(
    principal: &Principal,
    appointment: &Appointment,
) -> CoreResult<()> {
    if principal.role == Role::Doctor && principal.id == appointment.doctor_id {
        Ok(())
    } else {
        Err(CoreError::forbidden(
            "only the appointment's doctor can change its status",
        ))
    }
}

/// Rule 4b: room access requires the caller to be the appointment's patient
/// or doctor.
pub fn require_participant(principal: &Principal, appointment: &Appointment) -> CoreResult<()> {
    if principal.id == appointment.patient_id || principal.id == appointment.doctor_id {
        Ok(())
    } else {
        Err(CoreError::forbidden(
            "caller is not a participant of this appointment",
        ))
    }
}
