/// Error types for the booking core.
///
/// `BookingError` is what every core operation returns. Persistence failures
/// are wrapped from `StoreError` so callers only match on one enum.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Entity already exists: {entity} with id {id}")]
    Duplicate { entity: &'static str, id: String },

    #[error("Store lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Doctor not found: {0}")]
    DoctorNotFound(String),

    #[error("Doctor not available: {0}")]
    DoctorUnavailable(String),

    #[error("Slot {date} {time} is already booked")]
    SlotUnavailable { date: String, time: String },

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Appointment not found: {0}")]
    AppointmentNotFound(String),

    #[error("Appointment {appointment_id} does not belong to doctor {doctor_id}")]
    Forbidden {
        appointment_id: String,
        doctor_id: String,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    /// True for outcomes an adapter should report as a plain refusal,
    /// without revealing whether the appointment exists.
    pub fn is_not_permitted(&self) -> bool {
        matches!(
            self,
            BookingError::Forbidden { .. } | BookingError::AppointmentNotFound(_)
        )
    }
}

/// Reject blank identifiers and slot fields.
pub(crate) fn require(field: &str, value: &str) -> Result<(), BookingError> {
    if value.trim().is_empty() {
        return Err(BookingError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_blank_values() {
        assert!(require("docId", "d1").is_ok());
        let err = require("docId", "   ").unwrap_err();
        assert!(matches!(err, BookingError::Validation(ref m) if m == "docId is required"));
    }

    #[test]
    fn forbidden_and_missing_fold_into_not_permitted() {
        let forbidden = BookingError::Forbidden {
            appointment_id: "a1".into(),
            doctor_id: "d2".into(),
        };
        assert!(forbidden.is_not_permitted());
        assert!(BookingError::AppointmentNotFound("a1".into()).is_not_permitted());
        assert!(!BookingError::DoctorUnavailable("d1".into()).is_not_permitted());
    }

    #[test]
    fn store_errors_convert() {
        let err: BookingError = StoreError::Poisoned.into();
        assert!(matches!(err, BookingError::Store(StoreError::Poisoned)));
        assert_eq!(err.to_string(), "Store lock poisoned");
    }
}
