/// Doctor directory operations.
///
/// Availability and profile edits are read-modify-write on the doctor
/// record and take the same per-doctor lock as slot reservation.

use std::sync::Arc;

use tracing::info;

use crate::error::{require, BookingError};
use crate::locks::KeyedLocks;
use crate::models::{Address, Appointment, Doctor, DoctorSummary};
use crate::store::{AppointmentStore, DoctorStore, DoctorUpdate};

/// Fields a doctor may edit on their own profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub fees: Option<u64>,
    pub address: Option<Address>,
    pub available: Option<bool>,
}

pub struct Directory<S> {
    store: Arc<S>,
    doctor_locks: Arc<KeyedLocks>,
}

impl<S: DoctorStore + AppointmentStore> Directory<S> {
    pub fn new(store: Arc<S>, doctor_locks: Arc<KeyedLocks>) -> Self {
        Directory {
            store,
            doctor_locks,
        }
    }

    /// Flip a doctor's availability and return the new value.
    ///
    /// Existing bookings are not touched.
    pub fn toggle_availability(&self, doctor_id: &str) -> Result<bool, BookingError> {
        require("docId", doctor_id)?;
        self.doctor_locks.with_lock(doctor_id, || {
            let doctor = self.doctor(doctor_id)?;
            let updated = self.store.update_doctor(
                doctor_id,
                DoctorUpdate {
                    available: Some(!doctor.available),
                    ..Default::default()
                },
            )?;
            info!(doctor_id, available = updated.available, "Availability changed");
            Ok(updated.available)
        })
    }

    /// Public listing of every doctor.
    pub fn list_doctors(&self) -> Result<Vec<DoctorSummary>, BookingError> {
        Ok(self
            .store
            .list_doctors()?
            .iter()
            .map(Doctor::summary)
            .collect())
    }

    /// Full record of a doctor, for the doctor themself.
    pub fn profile(&self, doctor_id: &str) -> Result<Doctor, BookingError> {
        require("docId", doctor_id)?;
        self.doctor(doctor_id)
    }

    /// Apply a doctor's profile edits. Booked appointments keep the fee and
    /// profile they were booked with.
    pub fn update_profile(
        &self,
        doctor_id: &str,
        update: ProfileUpdate,
    ) -> Result<Doctor, BookingError> {
        require("docId", doctor_id)?;
        self.doctor_locks.with_lock(doctor_id, || {
            self.doctor(doctor_id)?;
            let updated = self.store.update_doctor(
                doctor_id,
                DoctorUpdate {
                    fees: update.fees,
                    address: update.address,
                    available: update.available,
                    slots_booked: None,
                },
            )?;
            info!(doctor_id, fees = updated.fees, "Profile updated");
            Ok(updated)
        })
    }

    /// Every appointment booked with a doctor, oldest first.
    pub fn appointments_for_doctor(&self, doctor_id: &str) -> Result<Vec<Appointment>, BookingError> {
        require("docId", doctor_id)?;
        Ok(self.store.find_by_doctor(doctor_id)?)
    }

    /// Every appointment a patient has booked, oldest first.
    pub fn appointments_for_patient(
        &self,
        patient_id: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        require("userId", patient_id)?;
        Ok(self.store.find_by_patient(patient_id)?)
    }

    fn doctor(&self, doctor_id: &str) -> Result<Doctor, BookingError> {
        self.store
            .get_doctor(doctor_id)?
            .ok_or_else(|| BookingError::DoctorNotFound(doctor_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{doctor, patient};
    use crate::store::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, Directory<MemoryStore>, Doctor) {
        let store = Arc::new(MemoryStore::in_memory());
        let doc = doctor(45);
        store.insert_doctor(doc.clone()).unwrap();
        let directory = Directory::new(Arc::clone(&store), Arc::new(KeyedLocks::new()));
        (store, directory, doc)
    }

    #[test]
    fn toggle_flips_and_persists() {
        let (store, directory, doc) = setup();
        assert!(!directory.toggle_availability(&doc.id).unwrap());
        assert!(!store.get_doctor(&doc.id).unwrap().unwrap().available);
        assert!(directory.toggle_availability(&doc.id).unwrap());
    }

    #[test]
    fn toggle_unknown_doctor_fails() {
        let (_store, directory, _doc) = setup();
        let err = directory.toggle_availability("missing").unwrap_err();
        assert!(matches!(err, BookingError::DoctorNotFound(_)));
    }

    #[test]
    fn toggle_keeps_existing_bookings() {
        let (store, directory, doc) = setup();
        let apt = Appointment::new(&patient("Ann"), &doc, "3_7_2025", "10:00 AM");
        store.create_appointment(apt.clone()).unwrap();

        directory.toggle_availability(&doc.id).unwrap();
        let stored = store.get_appointment(&apt.id).unwrap().unwrap();
        assert!(!stored.cancelled);
        assert_eq!(directory.appointments_for_doctor(&doc.id).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_toggles_do_not_lose_updates() {
        let (store, directory, doc) = setup();
        std::thread::scope(|s| {
            for _ in 0..10 {
                s.spawn(|| directory.toggle_availability(&doc.id).unwrap());
            }
        });
        // An even number of flips lands back where it started.
        assert!(store.get_doctor(&doc.id).unwrap().unwrap().available);
    }

    #[test]
    fn update_profile_changes_only_given_fields() {
        let (_store, directory, doc) = setup();
        let updated = directory
            .update_profile(&doc.id, ProfileUpdate { fees: Some(90), ..Default::default() })
            .unwrap();
        assert_eq!(updated.fees, 90);
        assert!(updated.available);
        assert_eq!(updated.address, doc.address);
    }

    #[test]
    fn list_doctors_returns_public_summaries() {
        let (store, directory, doc) = setup();
        store.insert_doctor(doctor(10)).unwrap();
        let listing = directory.list_doctors().unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].profile.id, doc.id);
        assert_eq!(listing[0].profile.fees, 45);
    }
}
