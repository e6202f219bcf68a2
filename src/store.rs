/// Persistence seams for doctors, patients and appointments.
///
/// The core only talks to the `DoctorStore`, `AppointmentStore` and
/// `PatientStore` traits. `MemoryStore` implements all three over in-process
/// tables and can be opened from / closed to a JSON snapshot file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::calendar::SlotIndex;
use crate::error::StoreError;
use crate::models::{Address, Appointment, Doctor, Patient};

/// Partial update of a doctor record. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct DoctorUpdate {
    pub fees: Option<u64>,
    pub address: Option<Address>,
    pub available: Option<bool>,
    pub slots_booked: Option<SlotIndex>,
}

/// Partial update of the mutable appointment flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentUpdate {
    pub is_completed: Option<bool>,
    pub cancelled: Option<bool>,
    pub payment: Option<bool>,
}

/// Partial update of a patient's own profile. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
}

pub trait DoctorStore: Send + Sync {
    fn insert_doctor(&self, doctor: Doctor) -> Result<(), StoreError>;
    fn get_doctor(&self, id: &str) -> Result<Option<Doctor>, StoreError>;
    fn update_doctor(&self, id: &str, update: DoctorUpdate) -> Result<Doctor, StoreError>;
    fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError>;
}

pub trait AppointmentStore: Send + Sync {
    fn create_appointment(&self, appointment: Appointment) -> Result<(), StoreError>;
    fn get_appointment(&self, id: &str) -> Result<Option<Appointment>, StoreError>;
    fn update_appointment(
        &self,
        id: &str,
        update: AppointmentUpdate,
    ) -> Result<Appointment, StoreError>;
    /// All appointments for a doctor, in creation order.
    fn find_by_doctor(&self, doctor_id: &str) -> Result<Vec<Appointment>, StoreError>;
    /// All appointments for a patient, in creation order.
    fn find_by_patient(&self, patient_id: &str) -> Result<Vec<Appointment>, StoreError>;
}

pub trait PatientStore: Send + Sync {
    fn insert_patient(&self, patient: Patient) -> Result<(), StoreError>;
    fn get_patient(&self, id: &str) -> Result<Option<Patient>, StoreError>;
    fn update_patient(&self, id: &str, update: PatientUpdate) -> Result<Patient, StoreError>;
    fn list_patients(&self) -> Result<Vec<Patient>, StoreError>;
}

trait Keyed {
    const ENTITY: &'static str;
    fn key(&self) -> &str;
}

impl Keyed for Doctor {
    const ENTITY: &'static str = "doctor";
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Patient {
    const ENTITY: &'static str = "patient";
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Appointment {
    const ENTITY: &'static str = "appointment";
    fn key(&self) -> &str {
        &self.id
    }
}

/// Insertion-ordered records with an id index.
struct Table<T> {
    records: Vec<T>,
    by_id: HashMap<String, usize>,
}

impl<T: Keyed + Clone> Table<T> {
    fn new() -> Self {
        Table {
            records: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    fn from_records(records: Vec<T>) -> Result<Self, StoreError> {
        let mut table = Table {
            records: Vec::with_capacity(records.len()),
            by_id: HashMap::with_capacity(records.len()),
        };
        for record in records {
            table.insert(record)?;
        }
        Ok(table)
    }

    fn insert(&mut self, record: T) -> Result<(), StoreError> {
        if self.by_id.contains_key(record.key()) {
            return Err(StoreError::Duplicate {
                entity: T::ENTITY,
                id: record.key().to_string(),
            });
        }
        self.by_id.insert(record.key().to_string(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    fn get(&self, id: &str) -> Option<&T> {
        self.by_id.get(id).map(|&idx| &self.records[idx])
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut T, StoreError> {
        match self.by_id.get(id) {
            Some(&idx) => Ok(&mut self.records[idx]),
            None => Err(StoreError::NotFound {
                entity: T::ENTITY,
                id: id.to_string(),
            }),
        }
    }

    fn filter<P: Fn(&T) -> bool>(&self, predicate: P) -> Vec<T> {
        self.records.iter().filter(|r| predicate(r)).cloned().collect()
    }
}

#[derive(Default, Serialize, Deserialize)]
struct Snapshot {
    doctors: Vec<Doctor>,
    patients: Vec<Patient>,
    appointments: Vec<Appointment>,
}

/// In-process store with an optional JSON snapshot file.
pub struct MemoryStore {
    path: Option<PathBuf>,
    doctors: RwLock<Table<Doctor>>,
    patients: RwLock<Table<Patient>>,
    appointments: RwLock<Table<Appointment>>,
}

impl MemoryStore {
    /// Empty store with no backing file (for testing)
    pub fn in_memory() -> Self {
        MemoryStore {
            path: None,
            doctors: RwLock::new(Table::new()),
            patients: RwLock::new(Table::new()),
            appointments: RwLock::new(Table::new()),
        }
    }

    /// Load the snapshot at `path`, or start empty if it does not exist yet.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let snapshot = if path.exists() {
            let raw = fs::read_to_string(path)?;
            serde_json::from_str(&raw)?
        } else {
            debug!(path = %path.display(), "No snapshot found, starting empty");
            Snapshot::default()
        };

        let (doctors, appointments) = (snapshot.doctors.len(), snapshot.appointments.len());
        let store = Self::from_snapshot(Some(path.to_path_buf()), snapshot)?;
        info!(path = %path.display(), doctors, appointments, "Store opened");
        Ok(store)
    }

    fn from_snapshot(path: Option<PathBuf>, snapshot: Snapshot) -> Result<Self, StoreError> {
        Ok(MemoryStore {
            path,
            doctors: RwLock::new(Table::from_records(snapshot.doctors)?),
            patients: RwLock::new(Table::from_records(snapshot.patients)?),
            appointments: RwLock::new(Table::from_records(snapshot.appointments)?),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the current state to the snapshot file, if there is one.
    ///
    /// The file is replaced atomically via a sibling temp file.
    pub fn flush(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        // Hold every table guard at once so the snapshot reads one instant.
        let doctors = self.read(&self.doctors)?;
        let patients = self.read(&self.patients)?;
        let appointments = self.read(&self.appointments)?;
        let snapshot = Snapshot {
            doctors: doctors.records.clone(),
            patients: patients.records.clone(),
            appointments: appointments.records.clone(),
        };
        drop((doctors, patients, appointments));
        let encoded = serde_json::to_string_pretty(&snapshot)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, path)?;

        debug!(path = %path.display(), "Snapshot written");
        Ok(())
    }

    /// Flush and release the store at shutdown.
    pub fn close(self) -> Result<(), StoreError> {
        self.flush()?;
        info!("Store closed");
        Ok(())
    }

    fn read<'a, T>(&self, lock: &'a RwLock<T>) -> Result<RwLockReadGuard<'a, T>, StoreError> {
        lock.read().map_err(|_| StoreError::Poisoned)
    }

    fn write<'a, T>(&self, lock: &'a RwLock<T>) -> Result<RwLockWriteGuard<'a, T>, StoreError> {
        lock.write().map_err(|_| StoreError::Poisoned)
    }
}

impl DoctorStore for MemoryStore {
    fn insert_doctor(&self, doctor: Doctor) -> Result<(), StoreError> {
        self.write(&self.doctors)?.insert(doctor)
    }

    fn get_doctor(&self, id: &str) -> Result<Option<Doctor>, StoreError> {
        Ok(self.read(&self.doctors)?.get(id).cloned())
    }

    fn update_doctor(&self, id: &str, update: DoctorUpdate) -> Result<Doctor, StoreError> {
        let mut doctors = self.write(&self.doctors)?;
        let doctor = doctors.get_mut(id)?;
        if let Some(fees) = update.fees {
            doctor.fees = fees;
        }
        if let Some(address) = update.address {
            doctor.address = address;
        }
        if let Some(available) = update.available {
            doctor.available = available;
        }
        if let Some(slots) = update.slots_booked {
            doctor.slots_booked = slots;
        }
        Ok(doctor.clone())
    }

    fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError> {
        Ok(self.read(&self.doctors)?.records.clone())
    }
}

impl AppointmentStore for MemoryStore {
    fn create_appointment(&self, appointment: Appointment) -> Result<(), StoreError> {
        self.write(&self.appointments)?.insert(appointment)
    }

    fn get_appointment(&self, id: &str) -> Result<Option<Appointment>, StoreError> {
        Ok(self.read(&self.appointments)?.get(id).cloned())
    }

    fn update_appointment(
        &self,
        id: &str,
        update: AppointmentUpdate,
    ) -> Result<Appointment, StoreError> {
        let mut appointments = self.write(&self.appointments)?;
        let appointment = appointments.get_mut(id)?;
        if let Some(done) = update.is_completed {
            appointment.is_completed = done;
        }
        if let Some(cancelled) = update.cancelled {
            appointment.cancelled = cancelled;
        }
        if let Some(paid) = update.payment {
            appointment.payment = paid;
        }
        Ok(appointment.clone())
    }

    fn find_by_doctor(&self, doctor_id: &str) -> Result<Vec<Appointment>, StoreError> {
        Ok(self
            .read(&self.appointments)?
            .filter(|a| a.doctor_id == doctor_id))
    }

    fn find_by_patient(&self, patient_id: &str) -> Result<Vec<Appointment>, StoreError> {
        Ok(self
            .read(&self.appointments)?
            .filter(|a| a.patient_id == patient_id))
    }
}

impl PatientStore for MemoryStore {
    fn insert_patient(&self, patient: Patient) -> Result<(), StoreError> {
        self.write(&self.patients)?.insert(patient)
    }

    fn get_patient(&self, id: &str) -> Result<Option<Patient>, StoreError> {
        Ok(self.read(&self.patients)?.get(id).cloned())
    }

    fn update_patient(&self, id: &str, update: PatientUpdate) -> Result<Patient, StoreError> {
        let mut patients = self.write(&self.patients)?;
        let patient = patients.get_mut(id)?;
        if let Some(name) = update.name {
            patient.name = name;
        }
        if let Some(phone) = update.phone {
            patient.phone = phone;
        }
        if let Some(address) = update.address {
            patient.address = address;
        }
        if let Some(gender) = update.gender {
            patient.gender = gender;
        }
        if let Some(dob) = update.dob {
            patient.dob = Some(dob);
        }
        Ok(patient.clone())
    }

    fn list_patients(&self) -> Result<Vec<Patient>, StoreError> {
        Ok(self.read(&self.patients)?.records.clone())
    }
}
