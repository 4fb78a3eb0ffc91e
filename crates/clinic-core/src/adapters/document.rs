//! Document persistence adapter.
//!
//! Entities live as JSON documents in a [`KeyValueStore`], one document per
//! key under a per-collection prefix:
//!
//! ```text
//! user/<id>               User
//! user_email/<email>      id (uniqueness index)
//! chat/<appt_id>/<seq>    ChatMessage, seq zero-padded so keys sort
//! chat_meta/<appt_id>     RoomMeta
//! appt/<id>               Appointment
//! ```
//!
//! The KV port has no transactions, so a store-wide `Mutex` serializes
//! read-modify-write sequences (index maintenance, sequence allocation).

use crate::domain::entities::{
    Appointment, AppointmentStatus, AppointmentView, ChatMessage, ChatMessageView, NewAppointment,
    NewUser, User, UserView,
};
use crate::domain::errors::StoreError;
use crate::domain::ids::EntityId;
use crate::ports::outbound::{AppointmentFilter, ClinicStore, KeyValueStore, UserFilter};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

const USER_PREFIX: &str = "user/";
const EMAIL_PREFIX: &str = "user_email/";
const APPOINTMENT_PREFIX: &str = "appt/";
const CHAT_PREFIX: &str = "chat/";
const CHAT_META_PREFIX: &str = "chat_meta/";

/// Per-room bookkeeping for sequence allocation and timestamp monotonicity.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RoomMeta {
    next_seq: u64,
    last_timestamp: Option<DateTime<Utc>>,
}

/// Document store over any [`KeyValueStore`].
pub struct DocumentStore<K> {
    kv: K,
    /// Serializes multi-key writes; the KV port is not transactional.
    write_lock: Mutex<()>,
}

impl<K: KeyValueStore> DocumentStore<K> {
    pub fn new(kv: K) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    fn load<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.kv.get(key.as_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::backend(format!("corrupt document {}: {}", key, e))),
            None => Ok(None),
        }
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| StoreError::backend(format!("encode document {}: {}", key, e)))?;
        self.kv.put(key.as_bytes(), &bytes)
    }

    fn scan<T: for<'de> Deserialize<'de>>(&self, prefix: &str) -> Result<Vec<T>, StoreError> {
        let mut pairs = self.kv.prefix_scan(prefix.as_bytes())?;
        pairs.sort_by(|(a, _), (b, _)| a.cmp(b));
        pairs
            .into_iter()
            .map(|(key, bytes)| {
                serde_json::from_slice(&bytes).map_err(|e| {
                    StoreError::backend(format!(
                        "corrupt document {}: {}",
                        String::from_utf8_lossy(&key),
                        e
                    ))
                })
            })
            .collect()
    }

    fn load_user(&self, id: EntityId) -> Result<Option<User>, StoreError> {
        self.load(&format!("{USER_PREFIX}{id}"))
    }

    fn user_view(&self, id: EntityId) -> Result<Option<UserView>, StoreError> {
        Ok(self.load_user(id)?.as_ref().map(UserView::from))
    }

    fn load_appointment(&self, id: EntityId) -> Result<Appointment, StoreError> {
        self.load(&format!("{APPOINTMENT_PREFIX}{id}"))?
            .ok_or_else(|| StoreError::not_found("appointment", id))
    }

    fn appointment_view(&self, appointment: Appointment) -> Result<AppointmentView, StoreError> {
        let patient = self.user_view(appointment.patient_id)?;
        let doctor = self.user_view(appointment.doctor_id)?;
        Ok(AppointmentView {
            appointment,
            patient,
            doctor,
        })
    }

    fn message_view(&self, message: ChatMessage) -> Result<ChatMessageView, StoreError> {
        let sender = self.user_view(message.sender_id)?;
        Ok(ChatMessageView { message, sender })
    }
}

#[async_trait]
impl<K: KeyValueStore> ClinicStore for DocumentStore<K> {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let _guard = self.write_lock.lock();
        let email_key = format!("{EMAIL_PREFIX}{}", new_user.email);
        if self.kv.get(email_key.as_bytes())?.is_some() {
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
        self.save(&format!("{USER_PREFIX}{}", user.id), &user)?;
        self.save(&email_key, &user.id)?;
        Ok(user)
    }

    async fn user(&self, id: EntityId) -> Result<User, StoreError> {
        self.load_user(id)?
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let id: Option<EntityId> = self.load(&format!("{EMAIL_PREFIX}{email}"))?;
        match id {
            Some(id) => self.load_user(id),
            None => Ok(None),
        }
    }

    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.scan(USER_PREFIX)?;
        users.retain(|u| filter.matches(u));
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn delete_user(&self, id: EntityId) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let user = self
            .load_user(id)?
            .ok_or_else(|| StoreError::not_found("user", id))?;
        self.kv.delete(format!("{USER_PREFIX}{id}").as_bytes())?;
        self.kv
            .delete(format!("{EMAIL_PREFIX}{}", user.email).as_bytes())?;
        Ok(())
    }

    async fn create_appointment(
        &self,
        new_appointment: NewAppointment,
    ) -> Result<AppointmentView, StoreError> {
        let _guard = self.write_lock.lock();
        for (entity, id) in [
            ("patient", new_appointment.patient_id),
            ("doctor", new_appointment.doctor_id),
        ] {
            if self.load_user(id)?.is_none() {
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
        self.save(&format!("{APPOINTMENT_PREFIX}{}", appointment.id), &appointment)?;
        self.appointment_view(appointment)
    }

    async fn appointment(&self, id: EntityId) -> Result<Appointment, StoreError> {
        self.load_appointment(id)
    }

    async fn list_appointments(
        &self,
        filter: AppointmentFilter,
    ) -> Result<Vec<AppointmentView>, StoreError> {
        let mut appointments: Vec<Appointment> = self.scan(APPOINTMENT_PREFIX)?;
        appointments.retain(|a| filter.matches(a));
        appointments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        appointments
            .into_iter()
            .map(|a| self.appointment_view(a))
            .collect()
    }

    async fn update_appointment_status(
        &self,
        id: EntityId,
        status: AppointmentStatus,
        diagnosis: Option<String>,
        prescription: Option<String>,
    ) -> Result<AppointmentView, StoreError> {
        let _guard = self.write_lock.lock();
        let mut appointment = self.load_appointment(id)?;
        appointment.status = status;
        if let Some(diagnosis) = diagnosis {
            appointment.diagnosis = Some(diagnosis);
        }
        if let Some(prescription) = prescription {
            appointment.prescription = Some(prescription);
        }
        self.save(&format!("{APPOINTMENT_PREFIX}{id}"), &appointment)?;
        self.appointment_view(appointment)
    }

    async fn append_message(
        &self,
        appointment_id: EntityId,
        sender_id: EntityId,
        text: &str,
    ) -> Result<ChatMessageView, StoreError> {
        let _guard = self.write_lock.lock();
        self.load_appointment(appointment_id)?;

        let meta_key = format!("{CHAT_META_PREFIX}{appointment_id}");
        let mut meta: RoomMeta = self.load(&meta_key)?.unwrap_or_default();

        // Timestamps within a room are strictly increasing, even if the
        // clock stalls or steps backwards.
        let timestamp = match meta.last_timestamp {
            Some(last) => Utc::now().max(last + Duration::microseconds(1)),
            None => Utc::now(),
        };
        let message = ChatMessage {
            id: EntityId::generate(),
            appointment_id,
            sender_id,
            message: text.to_string(),
            timestamp,
        };
        // Zero-padded so lexicographic key order is append order.
        let key = format!("{CHAT_PREFIX}{appointment_id}/{:020}", meta.next_seq);
        self.save(&key, &message)?;

        meta.next_seq += 1;
        meta.last_timestamp = Some(timestamp);
        self.save(&meta_key, &meta)?;

        self.message_view(message)
    }

    async fn list_messages(
        &self,
        appointment_id: EntityId,
    ) -> Result<Vec<ChatMessageView>, StoreError> {
        let messages: Vec<ChatMessage> = self.scan(&format!("{CHAT_PREFIX}{appointment_id}/"))?;
        messages
            .into_iter()
            .map(|m| self.message_view(m))
            .collect()
    }
}
