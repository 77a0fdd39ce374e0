//! Storage port: Traits for persistent patient storage.
//!
//! The store hands out one session per request. A session owns its
//! connection and releases it when dropped, whether the request succeeded
//! or not.

use crate::domain::{PatientPayload, PatientRecord};

/// Factory for request-scoped storage sessions.
pub trait PatientStore: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Session type handed to a single request.
    type Session: PatientSession<Error = Self::Error>;

    /// Open a new session.
    ///
    /// # Errors
    /// Returns error if a connection cannot be established.
    fn open_session(&self) -> Result<Self::Session, Self::Error>;
}

/// Queries and mutations available to one request.
///
/// Every mutation is a single auto-committed statement.
pub trait PatientSession {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load every record, ordered by id.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn list(&self) -> Result<Vec<PatientRecord>, Self::Error>;

    /// Load every record whose phone matches exactly.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn find_by_phone(&self, phone: &str) -> Result<Vec<PatientRecord>, Self::Error>;

    /// Load a record by id.
    ///
    /// # Returns
    /// `None` if no record has this id.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn find_by_id(&self, id: i64) -> Result<Option<PatientRecord>, Self::Error>;

    /// Whether a record other than `exclude` already uses this phone.
    fn phone_taken(&self, phone: &str, exclude: Option<i64>) -> Result<bool, Self::Error>;

    /// Whether a record other than `exclude` already uses this email.
    fn email_taken(&self, email: &str, exclude: Option<i64>) -> Result<bool, Self::Error>;

    /// Insert a new record and return it with its assigned id.
    ///
    /// # Errors
    /// Returns error if storage operation fails, including uniqueness
    /// violations that slipped past the pre-checks.
    fn insert(&self, payload: &PatientPayload) -> Result<PatientRecord, Self::Error>;

    /// Replace every field of an existing record.
    ///
    /// # Returns
    /// `None` if no record has this id.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn update(&self, id: i64, payload: &PatientPayload) -> Result<Option<PatientRecord>, Self::Error>;

    /// Permanently delete a record.
    ///
    /// # Returns
    /// `false` if no record had this id.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn delete(&self, id: i64) -> Result<bool, Self::Error>;
}
