/// Data models for the booking core.
///
/// This module defines the records the core reads and writes:
/// - Doctor: directory entry with fee, availability and slot index
/// - Patient: the patient record snapshotted into each booking
/// - Appointment: a reserved slot and its lifecycle flags
/// - DoctorSnapshot / PatientSnapshot: public data frozen at booking time

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::SlotIndex;
use crate::error::{require, BookingError};

/// Lifecycle state of an appointment, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    Booked,
    Completed,
    Cancelled,
}

impl LifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Booked => "booked",
            LifecycleState::Completed => "completed",
            LifecycleState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, LifecycleState::Booked)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    pub line2: String,
}

impl Address {
    pub fn new(line1: impl Into<String>, line2: impl Into<String>) -> Self {
        Address {
            line1: line1.into(),
            line2: line2.into(),
        }
    }
}

/// A doctor in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub speciality: String,
    pub degree: String,
    pub experience: String,
    pub about: String,
    pub available: bool,
    pub fees: u64,
    pub address: Address,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "slots_booked", default)]
    pub slots_booked: SlotIndex,
}

impl Doctor {
    /// Create a new, available doctor with no bookings.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        speciality: impl Into<String>,
        fees: u64,
    ) -> Result<Self, BookingError> {
        let name = name.into();
        let email = email.into();
        let speciality = speciality.into();
        require("doctor name", &name)?;
        require("doctor email", &email)?;
        require("speciality", &speciality)?;

        Ok(Doctor {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            image: None,
            speciality,
            degree: String::new(),
            experience: String::new(),
            about: String::new(),
            available: true,
            fees,
            address: Address::default(),
            created_at: Utc::now(),
            slots_booked: SlotIndex::new(),
        })
    }

    pub fn with_profile(
        mut self,
        degree: impl Into<String>,
        experience: impl Into<String>,
        about: impl Into<String>,
    ) -> Self {
        self.degree = degree.into();
        self.experience = experience.into();
        self.about = about.into();
        self
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    /// Public fields, as copied into an appointment.
    pub fn snapshot(&self) -> DoctorSnapshot {
        DoctorSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
            speciality: self.speciality.clone(),
            degree: self.degree.clone(),
            experience: self.experience.clone(),
            about: self.about.clone(),
            fees: self.fees,
            address: self.address.clone(),
        }
    }

    /// Directory listing entry (no email, no slot index).
    pub fn summary(&self) -> DoctorSummary {
        DoctorSummary {
            profile: self.snapshot(),
            available: self.available,
        }
    }
}

/// Doctor public data frozen into an appointment at booking time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSnapshot {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub speciality: String,
    pub degree: String,
    pub experience: String,
    pub about: String,
    pub fees: u64,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorSummary {
    #[serde(flatten)]
    pub profile: DoctorSnapshot,
    pub available: bool,
}

/// Represents a patient. Registration happens outside the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub gender: String,
    pub dob: Option<NaiveDate>,
}

impl Patient {
    /// Create a new patient with validation.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Result<Self, BookingError> {
        let name = name.into();
        let email = email.into();
        require("patient name", &name)?;
        require("patient email", &email)?;

        Ok(Patient {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            phone: String::new(),
            address: Address::default(),
            gender: String::new(),
            dob: None,
        })
    }

    pub fn snapshot(&self) -> PatientSnapshot {
        PatientSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            gender: self.gender.clone(),
            dob: self.dob,
        }
    }
}

/// Patient data frozen into an appointment at booking time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub gender: String,
    pub dob: Option<NaiveDate>,
}

/// A reserved slot.
///
/// Identity, parties, slot and amount never change after creation. Only the
/// lifecycle flags (and the externally recorded `payment`) are updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub patient: PatientSnapshot,
    pub doctor: DoctorSnapshot,
    pub amount: u64,
    pub slot_date: String,
    pub slot_time: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub payment: bool,
}

impl Appointment {
    /// Book `doctor` for `patient`, copying the current fee and public data.
    pub fn new(
        patient: &Patient,
        doctor: &Doctor,
        slot_date: impl Into<String>,
        slot_time: impl Into<String>,
    ) -> Self {
        Appointment {
            id: Uuid::new_v4().to_string(),
            patient_id: patient.id.clone(),
            doctor_id: doctor.id.clone(),
            patient: patient.snapshot(),
            doctor: doctor.snapshot(),
            amount: doctor.fees,
            slot_date: slot_date.into(),
            slot_time: slot_time.into(),
            created_at: Utc::now(),
            is_completed: false,
            cancelled: false,
            payment: false,
        }
    }

    /// Records written before transitions were exclusive may carry both
    /// flags; cancellation wins.
    pub fn state(&self) -> LifecycleState {
        if self.cancelled {
            LifecycleState::Cancelled
        } else if self.is_completed {
            LifecycleState::Completed
        } else {
            LifecycleState::Booked
        }
    }

    /// Whether the appointment's amount counts toward doctor earnings.
    pub fn is_billable(&self) -> bool {
        self.is_completed || self.payment
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn doctor(fees: u64) -> Doctor {
        Doctor::new("Dr. Smith", "smith@clinic.test", "General physician", fees)
            .unwrap()
            .with_profile("MBBS", "4 Years", "Primary care")
            .with_address(Address::new("17th Cross", "Richmond"))
    }

    pub fn patient(name: &str) -> Patient {
        Patient::new(name, format!("{}@mail.test", name.to_lowercase())).unwrap()
    }

    /// Appointment with explicit ids and flags, for aggregation tests.
    pub fn appointment(
        doctor: &Doctor,
        patient_id: &str,
        amount: u64,
        is_completed: bool,
        payment: bool,
    ) -> Appointment {
        let mut patient = patient("Patient");
        patient.id = patient_id.to_string();
        let mut appointment = Appointment::new(&patient, doctor, "3_7_2025", "10:00 AM");
        appointment.amount = amount;
        appointment.is_completed = is_completed;
        appointment.payment = payment;
        appointment
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{doctor, patient};
    use super::*;

    #[test]
    fn doctor_requires_name() {
        let err = Doctor::new("", "a@b.c", "Dermatologist", 10).unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
    }

    #[test]
    fn new_doctor_is_available_without_bookings() {
        let doc = doctor(50);
        assert!(doc.available);
        assert!(doc.slots_booked.is_empty());
    }

    #[test]
    fn appointment_copies_fee_and_snapshots() {
        let doc = doctor(75);
        let pat = patient("Ann");
        let apt = Appointment::new(&pat, &doc, "3_7_2025", "10:00 AM");

        assert_eq!(apt.amount, 75);
        assert_eq!(apt.doctor_id, doc.id);
        assert_eq!(apt.patient_id, pat.id);
        assert_eq!(apt.doctor, doc.snapshot());
        assert_eq!(apt.patient.name, "Ann");
        assert_eq!(apt.state(), LifecycleState::Booked);
        assert!(!apt.payment);
    }

    #[test]
    fn state_follows_flags() {
        let doc = doctor(10);
        let mut apt = Appointment::new(&patient("Ann"), &doc, "3_7_2025", "10:00 AM");
        apt.is_completed = true;
        assert_eq!(apt.state(), LifecycleState::Completed);
        assert!(apt.state().is_terminal());
        apt.cancelled = true;
        assert_eq!(apt.state(), LifecycleState::Cancelled);
    }

    #[test]
    fn summary_hides_email() {
        let doc = doctor(10);
        let json = serde_json::to_value(doc.summary()).unwrap();
        assert!(json.get("email").is_none());
        assert!(json.get("slots_booked").is_none());
        assert_eq!(json["available"], true);
        assert_eq!(json["name"], "Dr. Smith");
    }

    #[test]
    fn doctor_serializes_slot_index_as_map() {
        let mut doc = doctor(10);
        doc.slots_booked.book("3_7_2025", "10:00 AM");
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["slots_booked"]["3_7_2025"][0], "10:00 AM");
        assert!(json["createdAt"].is_string());
    }
}
