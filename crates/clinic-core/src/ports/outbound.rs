//! # Outbound Ports (Driven Ports)
//!
//! Dependencies required by the engine: the persistence adapter contract
//! and the key-value interface the document backend builds on.

use crate::domain::entities::{
    Appointment, AppointmentStatus, AppointmentView, ChatMessageView, NewAppointment, NewUser,
    Role, User,
};
use crate::domain::errors::StoreError;
use crate::domain::ids::EntityId;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Filter for user listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
}

impl UserFilter {
    pub fn by_role(role: Role) -> Self {
        Self { role: Some(role) }
    }

    pub fn matches(&self, user: &User) -> bool {
        self.role.map_or(true, |role| user.role == role)
    }
}

/// Filter for appointment listings. Empty filter matches everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentFilter {
    pub patient_id: Option<EntityId>,
    pub doctor_id: Option<EntityId>,
}

impl AppointmentFilter {
    pub fn by_patient(id: EntityId) -> Self {
        Self {
            patient_id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_doctor(id: EntityId) -> Self {
        Self {
            doctor_id: Some(id),
            ..Self::default()
        }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && self.doctor_id.map_or(true, |id| appointment.doctor_id == id)
    }
}

/// Uniform interface over users, appointments, and messages.
///
/// Implementable atop any storage technology; joined reads come back
/// denormalized so no caller ever branches on backend or performs N+1
/// lookups. The adapter performs no authorization.
///
/// Implementations are the serialization point for message ordering:
/// `append_message` must assign distinct, non-decreasing timestamps within
/// a room even under concurrent senders.
///
/// ## Errors
///
/// - `NotFound` when an id is absent
/// - `Conflict` when the email uniqueness constraint is violated
/// - `Backend` for adapter-level failures
#[async_trait]
pub trait ClinicStore: Send + Sync {
    /// Insert a user. Rejects a duplicate email with `Conflict`.
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;

    async fn user(&self, id: EntityId) -> Result<User, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>, StoreError>;

    /// Delete a user. Appointments and messages referencing it survive;
    /// their embedded views become `None` on subsequent reads.
    async fn delete_user(&self, id: EntityId) -> Result<(), StoreError>;

    /// Create an appointment in `pending`. Both referenced users must
    /// exist.
    async fn create_appointment(
        &self,
        new_appointment: NewAppointment,
    ) -> Result<AppointmentView, StoreError>;

    async fn appointment(&self, id: EntityId) -> Result<Appointment, StoreError>;

    /// Denormalized listing, ordered by creation time.
    async fn list_appointments(
        &self,
        filter: AppointmentFilter,
    ) -> Result<Vec<AppointmentView>, StoreError>;

    /// Overwrite status and, where supplied, clinical fields. `None`
    /// preserves the stored value; the store never clears a field on
    /// omission. Last write wins.
    async fn update_appointment_status(
        &self,
        id: EntityId,
        status: AppointmentStatus,
        diagnosis: Option<String>,
        prescription: Option<String>,
    ) -> Result<AppointmentView, StoreError>;

    /// Append a message to a room, assigning id and timestamp.
    async fn append_message(
        &self,
        appointment_id: EntityId,
        sender_id: EntityId,
        text: &str,
    ) -> Result<ChatMessageView, StoreError>;

    /// Messages of a room in non-decreasing timestamp order matching
    /// append order.
    async fn list_messages(
        &self,
        appointment_id: EntityId,
    ) -> Result<Vec<ChatMessageView>, StoreError>;
}

/// Abstract interface for key-value operations, used by the document
/// backend.
///
/// Testing and embedded use: [`InMemoryKVStore`] (below). A networked
/// document database slots in behind the same trait.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// All pairs whose key starts with `prefix`. Order is unspecified;
    /// callers sort by key where order matters.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
}

/// In-memory key-value store.
#[derive(Default)]
pub struct InMemoryKVStore {
    data: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.data.write().remove(key);
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let results: Vec<_> = self
            .data
            .read()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(results)
    }
}
