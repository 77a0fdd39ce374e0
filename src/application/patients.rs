//! Patient service: Validated CRUD over the record store.
//!
//! Each operation opens its own storage session and drops it before
//! returning. Writes are validated in a fixed order before anything is
//! written:
//! phone format, phone duplicate, email format, email duplicate, age.

use std::sync::Arc;

use crate::adapters::StorageError;
use crate::domain::{
    is_valid_age, is_valid_email, is_valid_phone, PatientPayload, PatientRecord, PatientView,
};
use crate::ports::{PatientSession, PatientStore};
use crate::RecordsError;

const PATIENT_NOT_FOUND: &str = "Patient not found";
const NO_PHONE_MATCH: &str = "No patients found with this phone number";

/// Service for patient record operations.
pub struct PatientService<S>
where
    S: PatientStore,
{
    storage: Arc<S>,
}

impl<S: PatientStore> Clone for PatientService<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S> PatientService<S>
where
    S: PatientStore,
    S::Error: Into<StorageError>,
{
    /// Create a new patient service.
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    fn session(&self) -> Result<S::Session, RecordsError> {
        self.storage.open_session().map_err(Self::storage_error)
    }

    fn storage_error(err: S::Error) -> RecordsError {
        let err: StorageError = err.into();
        RecordsError::from(err)
    }

    /// List every patient, masked.
    ///
    /// # Errors
    /// Returns error if storage fails.
    pub fn list_patients(&self) -> Result<Vec<PatientView>, RecordsError> {
        let records = self.session()?.list().map_err(Self::storage_error)?;
        tracing::debug!("Listed {} patients", records.len());
        Ok(records.iter().map(PatientView::masked).collect())
    }

    /// Find patients by exact phone match.
    ///
    /// # Errors
    /// Returns `NotFound` if nothing matches.
    pub fn search_by_phone(&self, phone: &str) -> Result<Vec<PatientView>, RecordsError> {
        let records = self
            .session()?
            .find_by_phone(phone)
            .map_err(Self::storage_error)?;

        if records.is_empty() {
            return Err(RecordsError::NotFound(NO_PHONE_MATCH.to_string()));
        }
        Ok(records.iter().map(PatientView::masked).collect())
    }

    /// Fetch one patient by id.
    ///
    /// # Errors
    /// Returns `NotFound` if no record has this id.
    pub fn get_patient(&self, id: i64) -> Result<PatientView, RecordsError> {
        self.session()?
            .find_by_id(id)
            .map_err(Self::storage_error)?
            .map(|record| PatientView::masked(&record))
            .ok_or_else(|| RecordsError::NotFound(PATIENT_NOT_FOUND.to_string()))
    }

    /// Validate and store a new patient.
    ///
    /// # Errors
    /// Returns the first validation failure, or a duplicate error if the
    /// store rejects a concurrent clash.
    pub fn create_patient(&self, payload: PatientPayload) -> Result<PatientView, RecordsError> {
        let session = self.session()?;

        if let Err(err) = Self::validate(&session, &payload, None) {
            tracing::warn!("Rejected patient create: {}", err);
            return Err(err);
        }

        let record = session.insert(&payload).map_err(Self::storage_error)?;
        tracing::info!("Created patient {}", record.id);
        Ok(PatientView::masked(&record))
    }

    /// Replace every field of an existing patient.
    ///
    /// # Errors
    /// Returns `NotFound` before any validation if the id is unknown.
    pub fn update_patient(&self, id: i64, payload: PatientPayload) -> Result<PatientView, RecordsError> {
        let session = self.session()?;

        let current = session
            .find_by_id(id)
            .map_err(Self::storage_error)?
            .ok_or_else(|| RecordsError::NotFound(PATIENT_NOT_FOUND.to_string()))?;

        if let Err(err) = Self::validate(&session, &payload, Some(&current)) {
            tracing::warn!("Rejected patient {} update: {}", id, err);
            return Err(err);
        }

        let record = session
            .update(id, &payload)
            .map_err(Self::storage_error)?
            // Deleted between the lookup and the write.
            .ok_or_else(|| RecordsError::NotFound(PATIENT_NOT_FOUND.to_string()))?;

        tracing::info!("Updated patient {}", id);
        Ok(PatientView::masked(&record))
    }

    /// Permanently delete a patient.
    ///
    /// # Errors
    /// Returns `NotFound` if no record has this id, including a second
    /// delete of the same id.
    pub fn delete_patient(&self, id: i64) -> Result<(), RecordsError> {
        let removed = self.session()?.delete(id).map_err(Self::storage_error)?;
        if !removed {
            return Err(RecordsError::NotFound(PATIENT_NOT_FOUND.to_string()));
        }

        tracing::info!("Deleted patient {}", id);
        Ok(())
    }

    /// Run the write checks in precedence order.
    ///
    /// `current` is the record being replaced on update; it is excluded from
    /// the duplicate checks and an unchanged email is not re-checked.
    fn validate(
        session: &S::Session,
        payload: &PatientPayload,
        current: Option<&PatientRecord>,
    ) -> Result<(), RecordsError> {
        let exclude = current.map(|r| r.id);

        if !is_valid_phone(&payload.phone) {
            return Err(RecordsError::InvalidPhoneFormat);
        }
        if session
            .phone_taken(&payload.phone, exclude)
            .map_err(Self::storage_error)?
        {
            return Err(RecordsError::DuplicatePhone);
        }

        if let Some(email) = payload.email.as_deref() {
            if !is_valid_email(email) {
                return Err(RecordsError::InvalidEmailFormat);
            }

            let unchanged = current.is_some_and(|r| r.email.as_deref() == Some(email));
            if !unchanged && session.email_taken(email, exclude).map_err(Self::storage_error)? {
                return Err(RecordsError::DuplicateEmail);
            }
        }

        if !is_valid_age(payload.age) {
            return Err(RecordsError::InvalidAge);
        }

        Ok(())
    }
}
