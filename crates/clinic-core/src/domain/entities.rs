//! Domain entities and their denormalized read views.

use crate::domain::ids::EntityId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role attached to every authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "patient" => Some(Role::Patient),
            "doctor" => Some(Role::Doctor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered user. Created once at registration; the core never mutates
/// it except for deletion by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub name: String,
    /// Unique across the store; uniqueness is enforced by the adapter.
    pub email: String,
    /// Opaque to the core. Hashing and verification live in the identity
    /// collaborator.
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    /// Doctor-only.
    pub specialization: Option<String>,
    /// Doctor-only, years of practice.
    pub experience: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied at registration. The adapter assigns id and created_at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub experience: Option<u32>,
}

/// User as embedded in denormalized reads. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub experience: Option<u32>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            phone: user.phone.clone(),
            specialization: user.specialization.clone(),
            experience: user.experience,
        }
    }
}

/// An appointment between one patient and one doctor.
///
/// Mutated only through state-machine transitions; never hard-deleted by
/// the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: EntityId,
    pub patient_id: EntityId,
    pub doctor_id: EntityId,
    pub date: NaiveDate,
    /// Free-form slot label ("10:00"); no overlap validation.
    pub time: String,
    /// Patient-supplied, immutable after creation.
    pub symptoms: String,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied at booking. Status starts at `pending`; the adapter
/// assigns id and created_at.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub patient_id: EntityId,
    pub doctor_id: EntityId,
    pub date: NaiveDate,
    pub time: String,
    pub symptoms: String,
}

/// Appointment with its participants embedded, so callers never perform
/// follow-up user lookups.
///
/// A participant view is `None` only when the referenced user has been
/// deleted by an admin; the appointment record itself survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient: Option<UserView>,
    pub doctor: Option<UserView>,
}

/// One message in a consultation room. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: EntityId,
    pub appointment_id: EntityId,
    pub sender_id: EntityId,
    pub message: String,
    /// Assigned at write time; non-decreasing within a room.
    pub timestamp: DateTime<Utc>,
}

/// Chat message with its sender embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageView {
    #[serde(flatten)]
    pub message: ChatMessage,
    pub sender: Option<UserView>,
}
