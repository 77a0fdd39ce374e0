//! Adapters layer: Concrete implementations of ports.
//!
//! - `sqlite`: SQLite storage for patient records
//! - `sanitize`: PII filtering for logs

pub mod sanitize;
pub mod sqlite;

// Re-export storage error for lib.rs
pub use sqlite::StorageError;
