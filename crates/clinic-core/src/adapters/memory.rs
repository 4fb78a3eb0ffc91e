//! In-memory persistence adapter.
//!
//! Id-indexed maps behind a single `RwLock`; the write lock is the
//! serialization point for message ordering. Dependency-injected at
//! construction, never a module-level singleton, so isolated instances can
//! run side by side in tests.

use crate::domain::entities::{
    Appointment, AppointmentStatus, AppointmentView, ChatMessage, ChatMessageView, NewAppointment,
    NewUser, User, UserView,
};
use crate::domain::errors::StoreError;
use crate::domain::ids::EntityId;
use crate::ports::outbound::{AppointmentFilter, ClinicStore, UserFilter};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
struct Tables {
    users: HashMap<EntityId, User>,
    /// Insertion order doubles as creation order for listings.
    appointments: Vec<Appointment>,
    /// Per-room append-only logs.
    messages: HashMap<EntityId, Vec<ChatMessage>>,
}

impl Tables {
    fn user_view(&self, id: EntityId) -> Option<UserView> {
        self.users.get(&id).map(UserView::from)
    }

    fn appointment_view(&self, appointment: &Appointment) -> AppointmentView {
        AppointmentView {
            appointment: appointment.clone(),
            patient: self.user_view(appointment.patient_id),
            doctor: self.user_view(appointment.doctor_id),
        }
    }

    fn message_view(&self, message: &ChatMessage) -> ChatMessageView {
        ChatMessageView {
            message: message.clone(),
            sender: self.user_view(message.sender_id),
        }
    }

    fn appointment_mut(&mut self, id: EntityId) -> Result<&mut Appointment, StoreError> {
        self.appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::not_found("appointment", id))
    }
}

/// Ephemeral store backed by process memory. Contents reset with the
/// process.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClinicStore for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write();
        if tables.users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::Conflict(format!(
                "email already registered: {}",
                new_user.email
            )));
        }
        let user = User {
            id: EntityId::generate(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            phone: new_user.phone,
            specialization: new_user.specialization,
            experience: new_user.experience,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user(&self, id: EntityId) -> Result<User, StoreError> {
        self.tables
            .read()
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read();
        let mut users: Vec<_> = tables
            .users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn delete_user(&self, id: EntityId) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        tables
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn create_appointment(
        &self,
        new_appointment: NewAppointment,
    ) -> Result<AppointmentView, StoreError> {
        let mut tables = self.tables.write();
        for (entity, id) in [
            ("patient", new_appointment.patient_id),
            ("doctor", new_appointment.doctor_id),
        ] {
            if !tables.users.contains_key(&id) {
                return Err(StoreError::not_found(entity, id));
            }
        }
        let appointment = Appointment {
            id: EntityId::generate(),
            patient_id: new_appointment.patient_id,
            doctor_id: new_appointment.doctor_id,
            date: new_appointment.date,
            time: new_appointment.time,
            symptoms: new_appointment.symptoms,
            diagnosis: None,
            prescription: None,
            status: AppointmentStatus::Pending,
            created_at: Utc::now(),
        };
        let view = tables.appointment_view(&appointment);
        tables.appointments.push(appointment);
        Ok(view)
    }

    async fn appointment(&self, id: EntityId) -> Result<Appointment, StoreError> {
        self.tables
            .read()
            .appointments
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("appointment", id))
    }

    async fn list_appointments(
        &self,
        filter: AppointmentFilter,
    ) -> Result<Vec<AppointmentView>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .appointments
            .iter()
            .filter(|a| filter.matches(a))
            .map(|a| tables.appointment_view(a))
            .collect())
    }

    async fn update_appointment_status(
        &self,
        id: EntityId,
        status: AppointmentStatus,
        diagnosis: Option<String>,
        prescription: Option<String>,
    ) -> Result<AppointmentView, StoreError> {
        let mut tables = self.tables.write();
        let appointment = tables.appointment_mut(id)?;
        appointment.status = status;
        if let Some(diagnosis) = diagnosis {
            appointment.diagnosis = Some(diagnosis);
        }
        if let Some(prescription) = prescription {
            appointment.prescription = Some(prescription);
        }
        let updated = appointment.clone();
        Ok(tables.appointment_view(&updated))
    }

    async fn append_message(
        &self,
        appointment_id: EntityId,
        sender_id: EntityId,
        text: &str,
    ) -> Result<ChatMessageView, StoreError> {
        let mut tables = self.tables.write();
        if !tables.appointments.iter().any(|a| a.id == appointment_id) {
            return Err(StoreError::not_found("appointment", appointment_id));
        }
        let room = tables.messages.entry(appointment_id).or_default();
        // Timestamps within a room are strictly increasing, even if the
        // clock stalls or steps backwards.
        let timestamp = match room.last() {
            Some(last) => Utc::now().max(last.timestamp + Duration::microseconds(1)),
            None => Utc::now(),
        };
        let message = ChatMessage {
            id: EntityId::generate(),
            appointment_id,
            sender_id,
            message: text.to_string(),
            timestamp,
        };
        room.push(message.clone());
        Ok(tables.message_view(&message))
    }

    async fn list_messages(
        &self,
        appointment_id: EntityId,
    ) -> Result<Vec<ChatMessageView>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .messages
            .get(&appointment_id)
            .map(|room| room.iter().map(|m| tables.message_view(m)).collect())
            .unwrap_or_default())
    }
}
