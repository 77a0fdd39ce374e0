//! Application layer: Use cases and services.
//!
//! This module orchestrates domain rules with the storage port to
//! implement the record operations.

mod patients;

pub use patients::PatientService;
