//! Domain layer: Core record types and rules.
//!
//! This module contains pure Rust types with no I/O. Format rules and the
//! diagnosis mask live here so every adapter applies them identically.

mod masking;
mod patient;

pub use masking::{mask_diagnosis, PatientView, VISIBLE_DIAGNOSIS_CHARS};
pub use patient::{is_valid_age, is_valid_email, is_valid_phone, PatientPayload, PatientRecord, PHONE_DIGITS};
