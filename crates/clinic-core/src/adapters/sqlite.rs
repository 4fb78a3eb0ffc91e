//! Relational persistence adapter over SQLite.
//!
//! The schema mirrors the users / appointments / chats tables of the
//! relational deployment. A single `Mutex<Connection>` is both the
//! connection pool and the serialization point for message ordering; calls
//! are short and never hold the lock across an await.

use crate::domain::entities::{
    Appointment, AppointmentStatus, AppointmentView, ChatMessage, ChatMessageView, NewAppointment,
    NewUser, Role, User, UserView,
};
use crate::domain::errors::StoreError;
use crate::domain::ids::EntityId;
use crate::ports::outbound::{AppointmentFilter, ClinicStore, UserFilter};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL,
    phone         TEXT,
    specialization TEXT,
    experience    INTEGER,
    created_at    INTEGER NOT NULL
);
-- No foreign keys: a participant may be deleted while the appointment
-- survives with a dangling reference.
CREATE TABLE IF NOT EXISTS appointments (
    id           TEXT PRIMARY KEY,
    patient_id   TEXT NOT NULL,
    doctor_id    TEXT NOT NULL,
    date         TEXT NOT NULL,
    time         TEXT NOT NULL,
    symptoms     TEXT NOT NULL,
    diagnosis    TEXT,
    prescription TEXT,
    status       TEXT NOT NULL,
    created_at   INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS chats (
    id             TEXT PRIMARY KEY,
    appointment_id TEXT NOT NULL,
    sender_id      TEXT NOT NULL,
    message        TEXT NOT NULL,
    timestamp      INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chats_room ON chats(appointment_id, timestamp);
";

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, phone, specialization, experience, created_at";

const APPOINTMENT_VIEW_COLUMNS: &str = "
    a.id, a.patient_id, a.doctor_id, a.date, a.time, a.symptoms,
    a.diagnosis, a.prescription, a.status, a.created_at,
    p.id, p.name, p.email, p.role, p.phone, p.specialization, p.experience,
    d.id, d.name, d.email, d.role, d.phone, d.specialization, d.experience";

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (and initialize) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path).map_err(map_err)?)
    }

    /// Open a private in-memory database, for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory().map_err(map_err)?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(map_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn appointment_view(
        conn: &Connection,
        id: EntityId,
    ) -> Result<AppointmentView, StoreError> {
        let sql = format!(
            "SELECT {APPOINTMENT_VIEW_COLUMNS}
             FROM appointments a
             LEFT JOIN users p ON a.patient_id = p.id
             LEFT JOIN users d ON a.doctor_id = d.id
             WHERE a.id = ?1"
        );
        conn.query_row(&sql, params![id.to_string()], appointment_view_from_row)
            .optional()
            .map_err(map_err)?
            .ok_or_else(|| StoreError::not_found("appointment", id))
    }

    fn user_exists(conn: &Connection, entity: &'static str, id: EntityId) -> Result<(), StoreError> {
        let found: Option<String> = conn
            .query_row(
                "SELECT id FROM users WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_err)?;
        if found.is_some() {
            Ok(())
        } else {
            Err(StoreError::not_found(entity, id))
        }
    }
}

#[async_trait]
impl ClinicStore for SqliteStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let conn = self.conn.lock();
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
        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, role, phone, specialization, experience, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                user.id.to_string(),
                user.name,
                user.email,
                user.password_hash,
                user.role.as_str(),
                user.phone,
                user.specialization,
                user.experience.map(|e| e as i64),
                user.created_at.timestamp_micros(),
            ],
        )
        .map_err(map_err)?;
        Ok(user)
    }

    async fn user(&self, id: EntityId) -> Result<User, StoreError> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        conn.query_row(&sql, params![id.to_string()], user_from_row)
            .optional()
            .map_err(map_err)?
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
        conn.query_row(&sql, params![email], user_from_row)
            .optional()
            .map_err(map_err)
    }

    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE (?1 IS NULL OR role = ?1)
             ORDER BY created_at, id"
        );
        let mut stmt = conn.prepare(&sql).map_err(map_err)?;
        let rows = stmt
            .query_map(params![filter.role.map(|r| r.as_str())], user_from_row)
            .map_err(map_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(map_err)
    }

    async fn delete_user(&self, id: EntityId) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let affected = conn
            .execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])
            .map_err(map_err)?;
        if affected == 0 {
            Err(StoreError::not_found("user", id))
        } else {
            Ok(())
        }
    }

    async fn create_appointment(
        &self,
        new_appointment: NewAppointment,
    ) -> Result<AppointmentView, StoreError> {
        let conn = self.conn.lock();
        Self::user_exists(&conn, "patient", new_appointment.patient_id)?;
        Self::user_exists(&conn, "doctor", new_appointment.doctor_id)?;

        let id = EntityId::generate();
        conn.execute(
            "INSERT INTO appointments (id, patient_id, doctor_id, date, time, symptoms, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.to_string(),
                new_appointment.patient_id.to_string(),
                new_appointment.doctor_id.to_string(),
                new_appointment.date.to_string(),
                new_appointment.time,
                new_appointment.symptoms,
                AppointmentStatus::Pending.as_str(),
                Utc::now().timestamp_micros(),
            ],
        )
        .map_err(map_err)?;
        Self::appointment_view(&conn, id)
    }

    async fn appointment(&self, id: EntityId) -> Result<Appointment, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, patient_id, doctor_id, date, time, symptoms, diagnosis, prescription, status, created_at
             FROM appointments WHERE id = ?1",
            params![id.to_string()],
            |row| appointment_from_row(row, 0),
        )
        .optional()
        .map_err(map_err)?
        .ok_or_else(|| StoreError::not_found("appointment", id))
    }

    async fn list_appointments(
        &self,
        filter: AppointmentFilter,
    ) -> Result<Vec<AppointmentView>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {APPOINTMENT_VIEW_COLUMNS}
             FROM appointments a
             LEFT JOIN users p ON a.patient_id = p.id
             LEFT JOIN users d ON a.doctor_id = d.id
             WHERE (?1 IS NULL OR a.patient_id = ?1)
               AND (?2 IS NULL OR a.doctor_id = ?2)
             ORDER BY a.created_at, a.id"
        );
        let mut stmt = conn.prepare(&sql).map_err(map_err)?;
        let rows = stmt
            .query_map(
                params![
                    filter.patient_id.map(|id| id.to_string()),
                    filter.doctor_id.map(|id| id.to_string()),
                ],
                appointment_view_from_row,
            )
            .map_err(map_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(map_err)
    }

    async fn update_appointment_status(
        &self,
        id: EntityId,
        status: AppointmentStatus,
        diagnosis: Option<String>,
        prescription: Option<String>,
    ) -> Result<AppointmentView, StoreError> {
        let conn = self.conn.lock();
        let affected = conn
            .execute(
                "UPDATE appointments
                 SET status = ?2,
                     diagnosis = COALESCE(?3, diagnosis),
                     prescription = COALESCE(?4, prescription)
                 WHERE id = ?1",
                params![id.to_string(), status.as_str(), diagnosis, prescription],
            )
            .map_err(map_err)?;
        if affected == 0 {
            return Err(StoreError::not_found("appointment", id));
        }
        Self::appointment_view(&conn, id)
    }

    async fn append_message(
        &self,
        appointment_id: EntityId,
        sender_id: EntityId,
        text: &str,
    ) -> Result<ChatMessageView, StoreError> {
        let conn = self.conn.lock();
        let exists: Option<String> = conn
            .query_row(
                "SELECT id FROM appointments WHERE id = ?1",
                params![appointment_id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_err)?;
        if exists.is_none() {
            return Err(StoreError::not_found("appointment", appointment_id));
        }

        let last: Option<i64> = conn
            .query_row(
                "SELECT MAX(timestamp) FROM chats WHERE appointment_id = ?1",
                params![appointment_id.to_string()],
                |row| row.get(0),
            )
            .map_err(map_err)?;
        // Strictly after the room's last message, even if the clock stalls.
        let timestamp_micros = Utc::now()
            .timestamp_micros()
            .max(last.map_or(i64::MIN, |l| l + 1));
        let timestamp = micros_to_datetime(timestamp_micros)?;

        let message = ChatMessage {
            id: EntityId::generate(),
            appointment_id,
            sender_id,
            message: text.to_string(),
            timestamp,
        };
        conn.execute(
            "INSERT INTO chats (id, appointment_id, sender_id, message, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id.to_string(),
                appointment_id.to_string(),
                sender_id.to_string(),
                message.message,
                timestamp_micros,
            ],
        )
        .map_err(map_err)?;

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let sender = conn
            .query_row(&sql, params![sender_id.to_string()], user_from_row)
            .optional()
            .map_err(map_err)?;
        Ok(ChatMessageView {
            message,
            sender: sender.as_ref().map(UserView::from),
        })
    }

    async fn list_messages(
        &self,
        appointment_id: EntityId,
    ) -> Result<Vec<ChatMessageView>, StoreError> {
        let conn = self.conn.lock();
        let sql = "SELECT c.id, c.appointment_id, c.sender_id, c.message, c.timestamp,
                          s.id, s.name, s.email, s.role, s.phone, s.specialization, s.experience
                   FROM chats c
                   LEFT JOIN users s ON c.sender_id = s.id
                   WHERE c.appointment_id = ?1
                   ORDER BY c.timestamp, c.rowid";
        let mut stmt = conn.prepare(sql).map_err(map_err)?;
        let rows = stmt
            .query_map(params![appointment_id.to_string()], message_view_from_row)
            .map_err(map_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(map_err)
    }
}

fn map_err(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(e.to_string())
        }
        _ => StoreError::backend(e.to_string()),
    }
}

fn micros_to_datetime(micros: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| StoreError::backend(format!("timestamp out of range: {}", micros)))
}

fn invalid_column(index: usize, what: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        format!("invalid {}", what).into(),
    )
}

fn id_from_column(row: &Row<'_>, index: usize) -> rusqlite::Result<EntityId> {
    let raw: String = row.get(index)?;
    EntityId::parse(&raw).map_err(|_| invalid_column(index, "entity id"))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role_raw: String = row.get(4)?;
    let created_at: i64 = row.get(8)?;
    Ok(User {
        id: id_from_column(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: Role::parse(&role_raw).ok_or_else(|| invalid_column(4, "role"))?,
        phone: row.get(5)?,
        specialization: row.get(6)?,
        experience: row.get::<_, Option<i64>>(7)?.map(|e| e as u32),
        created_at: DateTime::from_timestamp_micros(created_at)
            .ok_or_else(|| invalid_column(8, "timestamp"))?,
    })
}

/// Read an embedded (possibly NULL from a LEFT JOIN) user view starting at
/// `offset`.
fn user_view_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Option<UserView>> {
    let id: Option<String> = row.get(offset)?;
    let Some(id) = id else {
        return Ok(None);
    };
    let role_raw: String = row.get(offset + 3)?;
    Ok(Some(UserView {
        id: EntityId::parse(&id).map_err(|_| invalid_column(offset, "entity id"))?,
        name: row.get(offset + 1)?,
        email: row.get(offset + 2)?,
        role: Role::parse(&role_raw).ok_or_else(|| invalid_column(offset + 3, "role"))?,
        phone: row.get(offset + 4)?,
        specialization: row.get(offset + 5)?,
        experience: row.get::<_, Option<i64>>(offset + 6)?.map(|e| e as u32),
    }))
}

fn appointment_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Appointment> {
    let date_raw: String = row.get(offset + 3)?;
    let status_raw: String = row.get(offset + 8)?;
    let created_at: i64 = row.get(offset + 9)?;
    Ok(Appointment {
        id: id_from_column(row, offset)?,
        patient_id: id_from_column(row, offset + 1)?,
        doctor_id: id_from_column(row, offset + 2)?,
        date: date_raw
            .parse::<NaiveDate>()
            .map_err(|_| invalid_column(offset + 3, "date"))?,
        time: row.get(offset + 4)?,
        symptoms: row.get(offset + 5)?,
        diagnosis: row.get(offset + 6)?,
        prescription: row.get(offset + 7)?,
        status: AppointmentStatus::parse(&status_raw)
            .ok_or_else(|| invalid_column(offset + 8, "status"))?,
        created_at: DateTime::from_timestamp_micros(created_at)
            .ok_or_else(|| invalid_column(offset + 9, "timestamp"))?,
    })
}

fn appointment_view_from_row(row: &Row<'_>) -> rusqlite::Result<AppointmentView> {
    Ok(AppointmentView {
        appointment: appointment_from_row(row, 0)?,
        patient: user_view_from_row(row, 10)?,
        doctor: user_view_from_row(row, 17)?,
    })
}

fn message_view_from_row(row: &Row<'_>) -> rusqlite::Result<ChatMessageView> {
    let timestamp: i64 = row.get(4)?;
    Ok(ChatMessageView {
        message: ChatMessage {
            id: id_from_column(row, 0)?,
            appointment_id: id_from_column(row, 1)?,
            sender_id: id_from_column(row, 2)?,
            message: row.get(3)?,
            timestamp: DateTime::from_timestamp_micros(timestamp)
                .ok_or_else(|| invalid_column(4, "timestamp"))?,
        },
        sender: user_view_from_row(row, 5)?,
    })
}
