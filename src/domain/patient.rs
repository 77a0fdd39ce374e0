//! Patient record types and field format rules.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Required length of a phone number, in digits.
pub const PHONE_DIGITS: usize = 10;

/// A stored patient row.
///
/// `diagnosis` holds the true value; it is only masked on the way out
/// (see [`PatientView`](super::PatientView)).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Storage-assigned identifier, never reused
    pub id: i64,

    pub name: String,

    /// Exactly ten decimal digits, unique across records
    pub phone: String,

    /// Free-form clinical diagnosis
    pub diagnosis: String,

    /// Free-form, no enumeration enforced
    pub blood_type: String,

    /// Non-negative when present
    pub age: Option<i64>,

    /// Unique among records that have one
    pub email: Option<String>,
}

/// Body of a create or full-replace update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientPayload {
    pub name: String,
    pub phone: String,
    pub diagnosis: String,

    #[serde(rename = "bloodType", alias = "blood_type")]
    pub blood_type: String,

    #[serde(default)]
    pub age: Option<i64>,

    #[serde(default)]
    pub email: Option<String>,
}

impl PatientPayload {
    /// Build the stored form of this payload under the given id.
    #[must_use]
    pub fn into_record(self, id: i64) -> PatientRecord {
        PatientRecord {
            id,
            name: self.name,
            phone: self.phone,
            diagnosis: self.diagnosis,
            blood_type: self.blood_type,
            age: self.age,
            email: self.email,
        }
    }
}

/// Phone numbers are exactly [`PHONE_DIGITS`] ASCII digits, no separators.
#[must_use]
pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == PHONE_DIGITS && phone.bytes().all(|b| b.is_ascii_digit())
}

/// Ages are optional, but never negative.
#[must_use]
pub fn is_valid_age(age: Option<i64>) -> bool {
    age.map_or(true, |a| a >= 0)
}

static EMAIL_PATTERN: OnceLock<Regex> = OnceLock::new();

fn email_pattern() -> &'static Regex {
    EMAIL_PATTERN.get_or_init(|| {
        // Dot-atom local part, at least two DNS labels, alphabetic TLD.
        Regex::new(
            r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$",
        )
        .expect("Valid regex")
    })
}

/// Syntactic email check.
///
/// Local parts are limited to 64 bytes and whole addresses to 254.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 {
        return false;
    }
    match email.split_once('@') {
        Some((local, _)) if local.len() <= 64 => email_pattern().is_match(email),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_format() {
        assert!(is_valid_phone("1234567890"));
        assert!(!is_valid_phone("12345"));
        assert!(!is_valid_phone("123abc7890"));
        assert!(!is_valid_phone("12345678901"));
        assert!(!is_valid_phone("123-456-78"));
        assert!(!is_valid_phone(""));
    }

    #[test]
    fn test_age_boundary() {
        assert!(is_valid_age(None));
        assert!(is_valid_age(Some(0)));
        assert!(is_valid_age(Some(42)));
        assert!(!is_valid_age(Some(-1)));
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("patient@hospital.com"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));

        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("two@@signs.com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email(".leading@dot.com"));
        assert!(!is_valid_email("double..dot@mail.com"));
        assert!(!is_valid_email("user@-bad.com"));
        assert!(!is_valid_email(&format!("{}@mail.com", "a".repeat(65))));
    }

    #[test]
    fn test_payload_accepts_both_blood_type_spellings() {
        let camel: PatientPayload = serde_json::from_str(
            r#"{"name":"A","phone":"1112223333","diagnosis":"Flu","bloodType":"O+"}"#,
        )
        .expect("Should parse");
        let snake: PatientPayload = serde_json::from_str(
            r#"{"name":"A","phone":"1112223333","diagnosis":"Flu","blood_type":"O+"}"#,
        )
        .expect("Should parse");

        assert_eq!(camel, snake);
        assert_eq!(camel.age, None);
        assert_eq!(camel.email, None);
    }

    #[test]
    fn test_payload_requires_mandatory_fields() {
        let missing_phone = serde_json::from_str::<PatientPayload>(
            r#"{"name":"A","diagnosis":"Flu","bloodType":"O+"}"#,
        );
        assert!(missing_phone.is_err());
    }

    #[test]
    fn test_into_record_keeps_fields() {
        let payload = PatientPayload {
            name: "Ada".to_string(),
            phone: "1112223333".to_string(),
            diagnosis: "Diabetes".to_string(),
            blood_type: "AB-".to_string(),
            age: Some(36),
            email: Some("ada@example.com".to_string()),
        };
        let record = payload.clone().into_record(7);

        assert_eq!(record.id, 7);
        assert_eq!(record.phone, payload.phone);
        assert_eq!(record.diagnosis, "Diabetes");
        assert_eq!(record.email.as_deref(), Some("ada@example.com"));
    }
}
