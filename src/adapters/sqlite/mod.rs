//! SQLite adapter: Implementation of PatientStore.
//!
//! Provides persistence for patient records.
//!
//! # Sessions
//!
//! Every call to [`SqliteStorage::open_session`] opens a fresh connection.
//! The connection lives inside the returned [`SqliteSession`] and is closed
//! when the session is dropped. No connection is shared between requests.
//!
//! # Uniqueness
//!
//! `phone` and `email` carry UNIQUE constraints. The application checks them
//! before writing, but two concurrent writers can both pass those checks; the
//! constraint then rejects the second insert and the violation is reported as
//! [`StorageError::DuplicatePhone`] or [`StorageError::DuplicateEmail`].
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use crate::domain::{PatientPayload, PatientRecord};
use crate::ports::{PatientSession, PatientStore};

/// Distinguishes in-memory databases created by the same process.
static MEMORY_DB_SEQ: AtomicU64 = AtomicU64::new(0);

const RECORD_COLUMNS: &str = "id, name, phone, diagnosis, blood_type, age, email";

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Phone already registered")]
    DuplicatePhone,

    #[error("Email already registered")]
    DuplicateEmail,
}

impl StorageError {
    /// Translate UNIQUE constraint failures into duplicate errors.
    fn from_write(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, Some(ref message)) = err {
            if failure.code == ErrorCode::ConstraintViolation {
                if message.contains("patients.phone") {
                    return Self::DuplicatePhone;
                }
                if message.contains("patients.email") {
                    return Self::DuplicateEmail;
                }
            }
        }
        Self::Database(err)
    }
}

/// SQLite storage adapter.
pub struct SqliteStorage {
    target: PathBuf,
    // Shared-cache memory databases vanish once their last connection
    // closes; this one keeps the in-memory store alive between sessions.
    _anchor: Option<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Create a new SQLite storage with the given database path.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let storage = Self {
            target: path.as_ref().to_path_buf(),
            _anchor: None,
        };
        let conn = storage.connect()?;
        Self::init_schema(&conn)?;
        Ok(storage)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// Sessions opened from the same storage see the same data.
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let seq = MEMORY_DB_SEQ.fetch_add(1, Ordering::Relaxed);
        let target = PathBuf::from(format!(
            "file:patient-records-{}-{seq}?mode=memory&cache=shared",
            std::process::id()
        ));
        let anchor = Connection::open(&target)?;
        Self::init_schema(&anchor)?;
        Ok(Self {
            target,
            _anchor: Some(Mutex::new(anchor)),
        })
    }

    fn connect(&self) -> Result<Connection, StorageError> {
        Ok(Connection::open(&self.target)?)
    }

    /// Initialize the database schema.
    ///
    /// AUTOINCREMENT keeps ids of deleted rows from being handed out again.
    fn init_schema(conn: &Connection) -> Result<(), StorageError> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS patients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                phone TEXT NOT NULL UNIQUE,
                diagnosis TEXT NOT NULL,
                blood_type TEXT NOT NULL,
                age INTEGER,
                email TEXT UNIQUE
            );
            ",
        )?;

        Ok(())
    }
}

impl PatientStore for SqliteStorage {
    type Error = StorageError;
    type Session = SqliteSession;

    fn open_session(&self) -> Result<Self::Session, Self::Error> {
        Ok(SqliteSession {
            conn: self.connect()?,
        })
    }
}

/// One request's connection.
pub struct SqliteSession {
    conn: Connection,
}

impl SqliteSession {
    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<PatientRecord> {
        Ok(PatientRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            phone: row.get(2)?,
            diagnosis: row.get(3)?,
            blood_type: row.get(4)?,
            age: row.get(5)?,
            email: row.get(6)?,
        })
    }
}

impl PatientSession for SqliteSession {
    type Error = StorageError;

    fn list(&self) -> Result<Vec<PatientRecord>, Self::Error> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {RECORD_COLUMNS} FROM patients ORDER BY id"))?;

        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn find_by_phone(&self, phone: &str) -> Result<Vec<PatientRecord>, Self::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM patients WHERE phone = ?1 ORDER BY id"
        ))?;

        let records = stmt
            .query_map(params![phone], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<PatientRecord>, Self::Error> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM patients WHERE id = ?1"),
                params![id],
                Self::row_to_record,
            )
            .optional()?;

        Ok(record)
    }

    fn phone_taken(&self, phone: &str, exclude: Option<i64>) -> Result<bool, Self::Error> {
        let taken: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM patients WHERE phone = ?1 AND (?2 IS NULL OR id != ?2))",
            params![phone, exclude],
            |row| row.get(0),
        )?;

        Ok(taken)
    }

    fn email_taken(&self, email: &str, exclude: Option<i64>) -> Result<bool, Self::Error> {
        let taken: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM patients WHERE email = ?1 AND (?2 IS NULL OR id != ?2))",
            params![email, exclude],
            |row| row.get(0),
        )?;

        Ok(taken)
    }

    fn insert(&self, payload: &PatientPayload) -> Result<PatientRecord, Self::Error> {
        self.conn
            .execute(
                r"
                INSERT INTO patients (name, phone, diagnosis, blood_type, age, email)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
                params![
                    payload.name,
                    payload.phone,
                    payload.diagnosis,
                    payload.blood_type,
                    payload.age,
                    payload.email,
                ],
            )
            .map_err(StorageError::from_write)?;

        let id = self.conn.last_insert_rowid();
        tracing::debug!("Inserted patient {} into storage", id);
        Ok(payload.clone().into_record(id))
    }

    fn update(&self, id: i64, payload: &PatientPayload) -> Result<Option<PatientRecord>, Self::Error> {
        let changed = self
            .conn
            .execute(
                r"
                UPDATE patients
                SET name = ?1, phone = ?2, diagnosis = ?3, blood_type = ?4, age = ?5, email = ?6
                WHERE id = ?7
                ",
                params![
                    payload.name,
                    payload.phone,
                    payload.diagnosis,
                    payload.blood_type,
                    payload.age,
                    payload.email,
                    id,
                ],
            )
            .map_err(StorageError::from_write)?;

        if changed == 0 {
            return Ok(None);
        }

        tracing::debug!("Updated patient {} in storage", id);
        self.find_by_id(id)
    }

    fn delete(&self, id: i64) -> Result<bool, Self::Error> {
        let removed = self
            .conn
            .execute("DELETE FROM patients WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(phone: &str, email: Option<&str>) -> PatientPayload {
        PatientPayload {
            name: "Test Patient".to_string(),
            phone: phone.to_string(),
            diagnosis: "Diabetes".to_string(),
            blood_type: "O+".to_string(),
            age: Some(40),
            email: email.map(str::to_string),
        }
    }

    #[test]
    fn test_patient_crud() {
        let storage = SqliteStorage::in_memory().expect("Should create db");
        let session = storage.open_session().expect("Should open session");

        // Empty initially
        assert!(session.list().expect("Should list").is_empty());

        // Insert
        let created = session
            .insert(&payload("1112223333", Some("a@example.com")))
            .expect("Should insert");
        assert!(created.id > 0);

        // Load
        let loaded = session
            .find_by_id(created.id)
            .expect("Should load")
            .expect("Should exist");
        assert_eq!(loaded, created);
        assert_eq!(session.find_by_phone("1112223333").expect("Should search").len(), 1);

        // Update
        let mut replacement = payload("4445556666", None);
        replacement.diagnosis = "Flu".to_string();
        let updated = session
            .update(created.id, &replacement)
            .expect("Should update")
            .expect("Should exist");
        assert_eq!(updated.phone, "4445556666");
        assert_eq!(updated.email, None);
        assert_eq!(updated.diagnosis, "Flu");

        // Delete
        assert!(session.delete(created.id).expect("Should delete"));
        assert!(!session.delete(created.id).expect("Should report missing"));
        assert!(session.find_by_id(created.id).expect("Should load").is_none());
    }

    #[test]
    fn test_update_missing_returns_none() {
        let storage = SqliteStorage::in_memory().expect("Should create db");
        let session = storage.open_session().expect("Should open session");

        let result = session.update(99, &payload("1112223333", None)).expect("Should run");
        assert!(result.is_none());
    }

    #[test]
    fn test_sessions_share_data() {
        let storage = SqliteStorage::in_memory().expect("Should create db");

        let created = {
            let writer = storage.open_session().expect("Should open session");
            writer.insert(&payload("1112223333", None)).expect("Should insert")
        };

        let reader = storage.open_session().expect("Should open session");
        assert_eq!(reader.list().expect("Should list"), vec![created]);
    }

    #[test]
    fn test_separate_memory_stores_are_isolated() {
        let first = SqliteStorage::in_memory().expect("Should create db");
        let second = SqliteStorage::in_memory().expect("Should create db");

        first
            .open_session()
            .expect("Should open session")
            .insert(&payload("1112223333", None))
            .expect("Should insert");

        let other = second.open_session().expect("Should open session");
        assert!(other.list().expect("Should list").is_empty());
    }

    #[test]
    fn test_unique_constraints_translate_to_duplicates() {
        let storage = SqliteStorage::in_memory().expect("Should create db");
        let session = storage.open_session().expect("Should open session");

        session
            .insert(&payload("1112223333", Some("a@example.com")))
            .expect("Should insert");

        let phone_clash = session.insert(&payload("1112223333", None));
        assert!(matches!(phone_clash, Err(StorageError::DuplicatePhone)));

        let email_clash = session.insert(&payload("9998887777", Some("a@example.com")));
        assert!(matches!(email_clash, Err(StorageError::DuplicateEmail)));
    }

    #[test]
    fn test_missing_emails_do_not_collide() {
        let storage = SqliteStorage::in_memory().expect("Should create db");
        let session = storage.open_session().expect("Should open session");

        session.insert(&payload("1112223333", None)).expect("Should insert");
        session.insert(&payload("4445556666", None)).expect("Should insert");

        assert_eq!(session.list().expect("Should list").len(), 2);
    }

    #[test]
    fn test_taken_checks_respect_exclusion() {
        let storage = SqliteStorage::in_memory().expect("Should create db");
        let session = storage.open_session().expect("Should open session");

        let created = session
            .insert(&payload("1112223333", Some("a@example.com")))
            .expect("Should insert");

        assert!(session.phone_taken("1112223333", None).expect("Should check"));
        assert!(!session.phone_taken("1112223333", Some(created.id)).expect("Should check"));
        assert!(session.email_taken("a@example.com", None).expect("Should check"));
        assert!(!session.email_taken("a@example.com", Some(created.id)).expect("Should check"));
        assert!(!session.email_taken("b@example.com", None).expect("Should check"));
    }

    #[test]
    fn test_ids_are_not_reused_after_delete() {
        let storage = SqliteStorage::in_memory().expect("Should create db");
        let session = storage.open_session().expect("Should open session");

        let first = session.insert(&payload("1112223333", None)).expect("Should insert");
        assert!(session.delete(first.id).expect("Should delete"));

        let second = session.insert(&payload("1112223333", None)).expect("Should insert");
        assert!(second.id > first.id);
    }
}
