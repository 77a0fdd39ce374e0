//! Diagnosis masking for outgoing records.
//!
//! Masking is presentational: it is applied to a copy on its way out and
//! never written back, so every read masks from the stored value.

use serde::{Deserialize, Serialize};

use super::PatientRecord;

/// Number of leading diagnosis characters left legible.
pub const VISIBLE_DIAGNOSIS_CHARS: usize = 3;

/// Keep the first three characters and replace each remaining one with `*`.
///
/// The masked value has the same character count as the input. Diagnoses of
/// three characters or fewer come back unchanged.
#[must_use]
pub fn mask_diagnosis(diagnosis: &str) -> String {
    let total = diagnosis.chars().count();
    let mut masked: String = diagnosis.chars().take(VISIBLE_DIAGNOSIS_CHARS).collect();
    masked.extend(std::iter::repeat('*').take(total.saturating_sub(VISIBLE_DIAGNOSIS_CHARS)));
    masked
}

/// Response shape for a single patient, with the diagnosis masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientView {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub diagnosis: String,
    #[serde(rename = "bloodType")]
    pub blood_type: String,
    pub age: Option<i64>,
    pub email: Option<String>,
}

impl PatientView {
    /// Build the outgoing view of a stored record.
    #[must_use]
    pub fn masked(record: &PatientRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            phone: record.phone.clone(),
            diagnosis: mask_diagnosis(&record.diagnosis),
            blood_type: record.blood_type.clone(),
            age: record.age,
            email: record.email.clone(),
        }
    }
}
