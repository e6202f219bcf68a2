/// Slot reservation.
///
/// This module provides the SlotAllocator which decides whether a patient
/// may take a doctor's (date, time) slot and records the booking. All
/// reservations for one doctor run under that doctor's lock, so the
/// check-then-append on the slot index cannot interleave.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::{require, BookingError};
use crate::locks::KeyedLocks;
use crate::models::Appointment;
use crate::store::{AppointmentStore, DoctorStore, DoctorUpdate, PatientStore};

pub struct SlotAllocator<S> {
    store: Arc<S>,
    doctor_locks: Arc<KeyedLocks>,
}

impl<S> SlotAllocator<S>
where
    S: DoctorStore + AppointmentStore + PatientStore,
{
    pub fn new(store: Arc<S>, doctor_locks: Arc<KeyedLocks>) -> Self {
        SlotAllocator {
            store,
            doctor_locks,
        }
    }

    /// Reserve `slot_time` on `slot_date` with a doctor for a patient.
    ///
    /// On success the doctor's slot index contains the time and a new
    /// appointment record exists. On failure neither write is visible.
    pub fn reserve(
        &self,
        doctor_id: &str,
        patient_id: &str,
        slot_date: &str,
        slot_time: &str,
    ) -> Result<Appointment, BookingError> {
        require("docId", doctor_id)?;
        require("userId", patient_id)?;
        require("slotDate", slot_date)?;
        require("slotTime", slot_time)?;

        self.doctor_locks.with_lock(doctor_id, || {
            self.reserve_locked(doctor_id, patient_id, slot_date, slot_time)
        })
    }

    fn reserve_locked(
        &self,
        doctor_id: &str,
        patient_id: &str,
        slot_date: &str,
        slot_time: &str,
    ) -> Result<Appointment, BookingError> {
        let doctor = self
            .store
            .get_doctor(doctor_id)?
            .ok_or_else(|| BookingError::DoctorNotFound(doctor_id.to_string()))?;

        if !doctor.available {
            warn!(doctor_id, "Reservation refused: doctor not available");
            return Err(BookingError::DoctorUnavailable(doctor_id.to_string()));
        }

        let mut slots = doctor.slots_booked.clone();
        if !slots.book(slot_date, slot_time) {
            warn!(doctor_id, slot_date, slot_time, "Reservation refused: slot taken");
            return Err(BookingError::SlotUnavailable {
                date: slot_date.to_string(),
                time: slot_time.to_string(),
            });
        }

        let patient = self
            .store
            .get_patient(patient_id)?
            .ok_or_else(|| BookingError::PatientNotFound(patient_id.to_string()))?;

        let appointment = Appointment::new(&patient, &doctor, slot_date, slot_time);

        self.store.update_doctor(
            doctor_id,
            DoctorUpdate {
                slots_booked: Some(slots.clone()),
                ..Default::default()
            },
        )?;

        if let Err(e) = self.store.create_appointment(appointment.clone()) {
            slots.release(slot_date, slot_time);
            let rollback = self.store.update_doctor(
                doctor_id,
                DoctorUpdate {
                    slots_booked: Some(slots),
                    ..Default::default()
                },
            );
            if let Err(rollback_err) = rollback {
                error!(
                    doctor_id,
                    slot_date,
                    slot_time,
                    "Failed to release slot after booking error: {rollback_err}"
                );
            }
            return Err(e.into());
        }

        info!(
            appointment_id = %appointment.id,
            doctor_id,
            patient_id,
            slot_date,
            slot_time,
            amount = appointment.amount,
            "Slot reserved"
        );
        Ok(appointment)
    }

    /// Times from `day_times` still free with a doctor on `slot_date`.
    pub fn available_times(
        &self,
        doctor_id: &str,
        slot_date: &str,
        day_times: &[String],
    ) -> Result<Vec<String>, BookingError> {
        let doctor = self
            .store
            .get_doctor(doctor_id)?
            .ok_or_else(|| BookingError::DoctorNotFound(doctor_id.to_string()))?;
        if !doctor.available {
            return Ok(Vec::new());
        }
        Ok(doctor.slots_booked.free_times(slot_date, day_times))
    }
}
