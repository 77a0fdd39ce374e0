//! # Patient Records
//!
//! HTTP service for creating, reading, updating, deleting and searching
//! patient records, backed by SQLite.
//!
//! Writes are validated before anything is stored. Every record leaving the
//! service has its diagnosis masked down to the first three characters.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (PatientRecord, PatientPayload, PatientView) and rules
//! - `ports`: Trait definitions for storage sessions
//! - `adapters`: Concrete implementations (SQLite, log sanitization)
//! - `application`: Use cases orchestrating domain and ports
//! - `api`: HTTP routing and error mapping
//! - `config`: Environment-driven settings

pub mod adapters;
pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{PatientPayload, PatientRecord, PatientView};

use adapters::StorageError;

/// Result type for patient record operations
pub type Result<T> = std::result::Result<T, RecordsError>;

/// Main error type for patient record operations
#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    #[error("{0}")]
    NotFound(String),

    #[error("Phone number must be exactly 10 digits")]
    InvalidPhoneFormat,

    #[error("Phone already registered")]
    DuplicatePhone,

    #[error("Invalid email address")]
    InvalidEmailFormat,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Age must be positive")]
    InvalidAge,

    #[error("Storage operation failed: {0}")]
    Storage(StorageError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<StorageError> for RecordsError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicatePhone => Self::DuplicatePhone,
            StorageError::DuplicateEmail => Self::DuplicateEmail,
            other => Self::Storage(other),
        }
    }
}
