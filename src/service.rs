/// Booking service: one entry point for every core operation.
///
/// Owns the store and the per-doctor lock registry and wires the directory,
/// slot allocator, lifecycle manager and dashboard over them. The service is
/// `Send + Sync`; share it behind an `Arc` across request handlers.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::dashboard::{Dashboard, DashboardSummary};
use crate::directory::{Directory, ProfileUpdate};
use crate::error::{require, BookingError, StoreError};
use crate::lifecycle::LifecycleManager;
use crate::locks::KeyedLocks;
use crate::models::{Appointment, Doctor, DoctorSummary, Patient};
use crate::scheduler::SlotAllocator;
use crate::store::{AppointmentStore, DoctorStore, MemoryStore, PatientStore, PatientUpdate};

pub struct BookingService<S> {
    store: Arc<S>,
    directory: Directory<S>,
    allocator: SlotAllocator<S>,
    lifecycle: LifecycleManager<S>,
    dashboard: Dashboard<S>,
}

impl<S> BookingService<S>
where
    S: DoctorStore + AppointmentStore + PatientStore,
{
    pub fn new(store: S) -> Self {
        Self::with_store(Arc::new(store))
    }

    pub fn with_store(store: Arc<S>) -> Self {
        let doctor_locks = Arc::new(KeyedLocks::new());
        BookingService {
            directory: Directory::new(Arc::clone(&store), Arc::clone(&doctor_locks)),
            allocator: SlotAllocator::new(Arc::clone(&store), doctor_locks),
            lifecycle: LifecycleManager::new(Arc::clone(&store)),
            dashboard: Dashboard::new(Arc::clone(&store)),
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register a doctor. Directory management proper lives outside the core.
    pub fn add_doctor(&self, doctor: Doctor) -> Result<(), BookingError> {
        info!(doctor_id = %doctor.id, name = %doctor.name, "Doctor added");
        Ok(self.store.insert_doctor(doctor)?)
    }

    /// Register a patient. Registration proper lives outside the core.
    pub fn add_patient(&self, patient: Patient) -> Result<(), BookingError> {
        Ok(self.store.insert_patient(patient)?)
    }

    pub fn list_patients(&self) -> Result<Vec<Patient>, BookingError> {
        Ok(self.store.list_patients()?)
    }

    pub fn patient(&self, patient_id: &str) -> Result<Patient, BookingError> {
        require("userId", patient_id)?;
        self.store
            .get_patient(patient_id)?
            .ok_or_else(|| BookingError::PatientNotFound(patient_id.to_string()))
    }

    /// Apply a patient's own profile edits. Existing appointments keep the
    /// patient data they were booked with.
    pub fn update_patient(
        &self,
        patient_id: &str,
        update: PatientUpdate,
    ) -> Result<Patient, BookingError> {
        require("userId", patient_id)?;
        if let Some(name) = &update.name {
            require("patient name", name)?;
        }
        self.patient(patient_id)?;
        let updated = self.store.update_patient(patient_id, update)?;
        info!(patient_id, "Patient profile updated");
        Ok(updated)
    }

    pub fn reserve(
        &self,
        doctor_id: &str,
        patient_id: &str,
        slot_date: &str,
        slot_time: &str,
    ) -> Result<Appointment, BookingError> {
        self.allocator
            .reserve(doctor_id, patient_id, slot_date, slot_time)
    }

    pub fn available_times(
        &self,
        doctor_id: &str,
        slot_date: &str,
        day_times: &[String],
    ) -> Result<Vec<String>, BookingError> {
        self.allocator.available_times(doctor_id, slot_date, day_times)
    }

    pub fn complete(
        &self,
        appointment_id: &str,
        doctor_id: &str,
    ) -> Result<Appointment, BookingError> {
        self.lifecycle.complete(appointment_id, doctor_id)
    }

    pub fn cancel(&self, appointment_id: &str, doctor_id: &str) -> Result<Appointment, BookingError> {
        self.lifecycle.cancel(appointment_id, doctor_id)
    }

    pub fn summarize(&self, doctor_id: &str) -> Result<DashboardSummary, BookingError> {
        self.dashboard.summarize(doctor_id)
    }

    pub fn toggle_availability(&self, doctor_id: &str) -> Result<bool, BookingError> {
        self.directory.toggle_availability(doctor_id)
    }

    pub fn list_doctors(&self) -> Result<Vec<DoctorSummary>, BookingError> {
        self.directory.list_doctors()
    }

    pub fn doctor_profile(&self, doctor_id: &str) -> Result<Doctor, BookingError> {
        self.directory.profile(doctor_id)
    }

    pub fn update_profile(
        &self,
        doctor_id: &str,
        update: ProfileUpdate,
    ) -> Result<Doctor, BookingError> {
        self.directory.update_profile(doctor_id, update)
    }

    pub fn appointments_for_doctor(&self, doctor_id: &str) -> Result<Vec<Appointment>, BookingError> {
        self.directory.appointments_for_doctor(doctor_id)
    }

    pub fn appointments_for_patient(
        &self,
        patient_id: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        self.directory.appointments_for_patient(patient_id)
    }
}

impl BookingService<MemoryStore> {
    /// Open the service over the snapshot at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(MemoryStore::open(path)?))
    }

    /// Persist state and shut the service down.
    pub fn close(self) -> Result<(), StoreError> {
        let BookingService {
            store,
            directory,
            allocator,
            lifecycle,
            dashboard,
        } = self;
        drop((directory, allocator, lifecycle, dashboard));
        match Arc::try_unwrap(store) {
            Ok(store) => store.close(),
            Err(shared) => shared.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{doctor, patient};
    use crate::models::{Address, LifecycleState};

    fn seeded() -> (BookingService<MemoryStore>, Doctor, Patient) {
        let service = BookingService::new(MemoryStore::in_memory());
        let doc = doctor(120);
        let pat = patient("Ann");
        service.add_doctor(doc.clone()).unwrap();
        service.add_patient(pat.clone()).unwrap();
        (service, doc, pat)
    }

    #[test]
    fn booking_flow_end_to_end() {
        let (service, doc, pat) = seeded();
        let first = service.reserve(&doc.id, &pat.id, "3_7_2025", "10:00 AM").unwrap();
        let second = service.reserve(&doc.id, &pat.id, "3_7_2025", "10:30 AM").unwrap();

        service.complete(&first.id, &doc.id).unwrap();
        service.cancel(&second.id, &doc.id).unwrap();

        let summary = service.summarize(&doc.id).unwrap();
        assert_eq!(summary.earnings, 120);
        assert_eq!(summary.appointments, 2);
        assert_eq!(summary.patients, 1);
        assert_eq!(summary.latest_appointments[0].id, second.id);
        assert_eq!(summary.latest_appointments[0].state(), LifecycleState::Cancelled);

        let mine = service.appointments_for_patient(&pat.id).unwrap();
        assert_eq!(mine.len(), 2);
    }

    #[test]
    fn snapshot_is_frozen_at_booking_time() {
        let (service, doc, pat) = seeded();
        let apt = service.reserve(&doc.id, &pat.id, "3_7_2025", "10:00 AM").unwrap();

        service
            .update_profile(
                &doc.id,
                ProfileUpdate {
                    fees: Some(500),
                    address: Some(Address::new("New Street", "Uptown")),
                    available: None,
                },
            )
            .unwrap();

        let stored = service.appointments_for_doctor(&doc.id).unwrap().remove(0);
        assert_eq!(stored.id, apt.id);
        assert_eq!(stored.amount, 120);
        assert_eq!(stored.doctor.fees, 120);
        assert_eq!(stored.doctor.address.line1, "17th Cross");

        let next = service.reserve(&doc.id, &pat.id, "3_7_2025", "11:00 AM").unwrap();
        assert_eq!(next.amount, 500);
    }

    #[test]
    fn patient_edit_leaves_booked_snapshot_alone() {
        let (service, doc, pat) = seeded();
        let apt = service.reserve(&doc.id, &pat.id, "3_7_2025", "10:00 AM").unwrap();

        let updated = service
            .update_patient(
                &pat.id,
                PatientUpdate {
                    name: Some("Ann Lee".into()),
                    phone: Some("555-0199".into()),
                    address: Some(Address::new("2 Park Lane", "Midtown")),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Ann Lee");
        assert_eq!(service.patient(&pat.id).unwrap(), updated);

        let stored = service.appointments_for_patient(&pat.id).unwrap().remove(0);
        assert_eq!(stored.id, apt.id);
        assert_eq!(stored.patient, pat.snapshot());
        assert_eq!(stored.patient.name, "Ann");

        let next = service.reserve(&doc.id, &pat.id, "3_7_2025", "11:00 AM").unwrap();
        assert_eq!(next.patient.name, "Ann Lee");
    }

    #[test]
    fn patient_edit_rejects_unknown_or_blank() {
        let (service, _, pat) = seeded();
        let err = service
            .update_patient("missing", PatientUpdate::default())
            .unwrap_err();
        assert!(matches!(err, BookingError::PatientNotFound(_)));

        let blank = PatientUpdate {
            name: Some("  ".into()),
            ..Default::default()
        };
        let err = service.update_patient(&pat.id, blank).unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
        assert_eq!(service.patient(&pat.id).unwrap(), pat);
    }

    #[test]
    fn toggle_gates_new_bookings_only() {
        let (service, doc, pat) = seeded();
        let apt = service.reserve(&doc.id, &pat.id, "3_7_2025", "10:00 AM").unwrap();
        assert!(!service.toggle_availability(&doc.id).unwrap());

        let err = service.reserve(&doc.id, &pat.id, "3_7_2025", "11:00 AM").unwrap_err();
        assert!(matches!(err, BookingError::DoctorUnavailable(_)));
        // Booked appointment can still be completed.
        assert!(service.complete(&apt.id, &doc.id).unwrap().is_completed);
    }

    #[test]
    fn shared_service_prevents_double_booking() {
        let (service, doc, _) = seeded();
        let service = Arc::new(service);
        let patients: Vec<Patient> = (0..16).map(|i| patient(&format!("P{i}"))).collect();
        for p in &patients {
            service.add_patient(p.clone()).unwrap();
        }

        let handles: Vec<_> = patients
            .into_iter()
            .map(|p| {
                let service = Arc::clone(&service);
                let doctor_id = doc.id.clone();
                std::thread::spawn(move || service.reserve(&doctor_id, &p.id, "9_7_2025", "09:00 AM"))
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Result::is_ok)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(service.summarize(&doc.id).unwrap().appointments, 1);
    }

    #[test]
    fn open_and_close_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("desk.json");

        let service = BookingService::open(&path).unwrap();
        let doc = doctor(70);
        let pat = patient("Ann");
        service.add_doctor(doc.clone()).unwrap();
        service.add_patient(pat.clone()).unwrap();
        let apt = service.reserve(&doc.id, &pat.id, "3_7_2025", "10:00 AM").unwrap();
        service.close().unwrap();

        let service = BookingService::open(&path).unwrap();
        let err = service.reserve(&doc.id, &pat.id, "3_7_2025", "10:00 AM").unwrap_err();
        assert!(matches!(err, BookingError::SlotUnavailable { .. }));
        assert_eq!(service.appointments_for_doctor(&doc.id).unwrap(), vec![apt]);
        assert_eq!(service.patient(&pat.id).unwrap(), pat);
    }

    #[test]
    fn doctor_listing_and_profile() {
        let (service, doc, _) = seeded();
        let listing = service.list_doctors().unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(service.doctor_profile(&doc.id).unwrap().email, doc.email);
        assert!(matches!(
            service.doctor_profile("missing"),
            Err(BookingError::DoctorNotFound(_))
        ));
    }
}
