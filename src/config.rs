//! Runtime configuration from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::RecordsError;

const DATABASE_ENV: &str = "PATIENT_RECORDS_DATABASE";
const BIND_ENV: &str = "PATIENT_RECORDS_BIND";
const LOG_MODE_ENV: &str = "PATIENT_RECORDS_LOG_MODE";
const LOG_FILE_ENV: &str = "PATIENT_RECORDS_LOG_FILE";

const DEFAULT_DATABASE: &str = "patients.db";
const DEFAULT_BIND: &str = "127.0.0.1:8000";
const DEFAULT_LOG_FILE: &str = "patient-records.log";

/// Where formatted logs are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    File(PathBuf),
}

/// Service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite database file
    pub database: PathBuf,
    /// Listen address for the HTTP server
    pub bind: SocketAddr,
    pub log: LogTarget,
}

impl Config {
    /// Read settings from the process environment.
    ///
    /// # Errors
    /// Returns error if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, RecordsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup (tests use a map).
    ///
    /// # Errors
    /// Returns error if the bind address or log mode is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RecordsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = lookup(DATABASE_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let bind_raw = lookup(BIND_ENV).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| RecordsError::Config(format!("{BIND_ENV}={bind_raw}: {e}")))?;

        let log = match lookup(LOG_MODE_ENV).as_deref().map(str::trim) {
            None | Some("") | Some("stdout") => LogTarget::Stdout,
            Some("file") => LogTarget::File(PathBuf::from(
                lookup(LOG_FILE_ENV).unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()),
            )),
            Some(other) => {
                return Err(RecordsError::Config(format!(
                    "{LOG_MODE_ENV}={other}: expected \"stdout\" or \"file\""
                )))
            }
        };

        Ok(Self {
            database: PathBuf::from(database.trim()),
            bind,
            log,
        })
    }
}
