//! Application service: the operations of the engine.
//!
//! Each operation runs the gate first, then the state machine where one
//! applies, then the store. The service holds no state of its own beyond
//! the store handle; chat goes through [`crate::rooms::broker::RoomBroker`]
//! instead.

use crate::domain::access::{
    mine_scope, require_admin, require_appointment_doctor, require_patient_booking, AdminAction,
    MineScope, Principal,
};
use crate::domain::entities::{
    AppointmentStatus, AppointmentView, NewAppointment, Role, User, UserView,
};
use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::ids::EntityId;
use crate::domain::lifecycle::check_transition;
use crate::ports::outbound::{AppointmentFilter, ClinicStore, UserFilter};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// A patient's booking request. `patient_id` is never part of it; the
/// caller's identity decides.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub doctor_id: EntityId,
    pub date: NaiveDate,
    pub time: String,
    pub symptoms: String,
}

/// A doctor's status transition, optionally carrying clinical notes.
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionRequest {
    pub status: AppointmentStatus,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub prescription: Option<String>,
}

/// Drop empty or whitespace-only values; the store treats `None` as
/// "preserve what is there".
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct AppointmentService {
    store: Arc<dyn ClinicStore>,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    /// The public doctor directory.
    pub async fn list_doctors(&self) -> CoreResult<Vec<UserView>> {
        let doctors = self.store.list_users(UserFilter::by_role(Role::Doctor)).await?;
        Ok(doctors.iter().map(UserView::from).collect())
    }

    /// Book an appointment. Patient callers only; the appointment's
    /// `patient_id` is the caller's id, whatever the request said.
    pub async fn book(
        &self,
        principal: &Principal,
        request: BookingRequest,
    ) -> CoreResult<AppointmentView> {
        require_patient_booking(principal)?;

        let doctor = self.store.user(request.doctor_id).await.map_err(|e| match e {
            crate::domain::errors::StoreError::NotFound { .. } => {
                CoreError::not_found("doctor", request.doctor_id)
            }
            other => other.into(),
        })?;
        if doctor.role != Role::Doctor {
            return Err(CoreError::not_found("doctor", request.doctor_id));
        }

        let view = self
            .store
            .create_appointment(NewAppointment {
                patient_id: principal.id,
                doctor_id: doctor.id,
                date: request.date,
                time: request.time,
                symptoms: request.symptoms,
            })
            .await?;
        info!(
            appointment = %view.appointment.id,
            patient = %principal.id,
            doctor = %doctor.id,
            "appointment booked"
        );
        Ok(view)
    }

    /// The caller's appointments, scoped by role.
    pub async fn my_appointments(
        &self,
        principal: &Principal,
    ) -> CoreResult<Vec<AppointmentView>> {
        let filter = match mine_scope(principal.role) {
            MineScope::AsPatient => AppointmentFilter::by_patient(principal.id),
            MineScope::AsDoctor => AppointmentFilter::by_doctor(principal.id),
            MineScope::Empty => return Ok(Vec::new()),
        };
        Ok(self.store.list_appointments(filter).await?)
    }

    /// Move an appointment along the lifecycle, optionally updating
    /// clinical fields. Doctor of the appointment only; last write wins.
    pub async fn transition(
        &self,
        principal: &Principal,
        appointment_id: EntityId,
        request: TransitionRequest,
    ) -> CoreResult<AppointmentView> {
        let appointment = self.store.appointment(appointment_id).await?;
        require_appointment_doctor(principal, &appointment)?;
        check_transition(appointment.status, request.status)?;

        let view = self
            .store
            .update_appointment_status(
                appointment_id,
                request.status,
                non_empty(request.diagnosis),
                non_empty(request.prescription),
            )
            .await?;
        info!(
            appointment = %appointment_id,
            from = %appointment.status,
            to = %request.status,
            "appointment status updated"
        );
        Ok(view)
    }

    /// Admin: every user, without password hashes.
    pub async fn admin_list_users(&self, principal: &Principal) -> CoreResult<Vec<UserView>> {
        require_admin(principal, AdminAction::ListUsers)?;
        let users = self.store.list_users(UserFilter::default()).await?;
        Ok(users.iter().map(UserView::from).collect())
    }

    /// Admin: every appointment, denormalized.
    pub async fn admin_list_appointments(
        &self,
        principal: &Principal,
    ) -> CoreResult<Vec<AppointmentView>> {
        require_admin(principal, AdminAction::ListAppointments)?;
        Ok(self
            .store
            .list_appointments(AppointmentFilter::default())
            .await?)
    }

    /// Admin: delete a user. Appointments and messages referencing the user
    /// are left in place; their embedded views go dangling.
    pub async fn admin_delete_user(
        &self,
        principal: &Principal,
        user_id: EntityId,
    ) -> CoreResult<()> {
        require_admin(principal, AdminAction::DeleteUser)?;
        self.store.delete_user(user_id).await?;
        info!(user = %user_id, admin = %principal.id, "user deleted");
        Ok(())
    }

    /// Look up a user by id. Used by the identity collaborator.
    pub async fn user(&self, id: EntityId) -> CoreResult<User> {
        Ok(self.store.user(id).await?)
    }
}
