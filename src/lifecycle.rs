/// Appointment lifecycle: Booked -> Completed | Cancelled.
///
/// Only the owning doctor may move an appointment. Once an appointment is
/// terminal, further complete or cancel calls succeed and return it as is.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{require, BookingError};
use crate::locks::KeyedLocks;
use crate::models::{Appointment, LifecycleState};
use crate::store::{AppointmentStore, AppointmentUpdate};

pub struct LifecycleManager<S> {
    store: Arc<S>,
    appointment_locks: KeyedLocks,
}

impl<S: AppointmentStore> LifecycleManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        LifecycleManager {
            store,
            appointment_locks: KeyedLocks::new(),
        }
    }

    /// Mark an appointment completed on behalf of `doctor_id`.
    pub fn complete(
        &self,
        appointment_id: &str,
        doctor_id: &str,
    ) -> Result<Appointment, BookingError> {
        self.transition(appointment_id, doctor_id, LifecycleState::Completed)
    }

    /// Cancel an appointment on behalf of `doctor_id`.
    pub fn cancel(
        &self,
        appointment_id: &str,
        doctor_id: &str,
    ) -> Result<Appointment, BookingError> {
        self.transition(appointment_id, doctor_id, LifecycleState::Cancelled)
    }

    fn transition(
        &self,
        appointment_id: &str,
        doctor_id: &str,
        target: LifecycleState,
    ) -> Result<Appointment, BookingError> {
        require("appointmentId", appointment_id)?;
        require("docId", doctor_id)?;

        self.appointment_locks.with_lock(appointment_id, || {
            let appointment = self
                .store
                .get_appointment(appointment_id)?
                .ok_or_else(|| BookingError::AppointmentNotFound(appointment_id.to_string()))?;

            if appointment.doctor_id != doctor_id {
                warn!(appointment_id, doctor_id, "Lifecycle change refused: not the owner");
                return Err(BookingError::Forbidden {
                    appointment_id: appointment_id.to_string(),
                    doctor_id: doctor_id.to_string(),
                });
            }

            let current = appointment.state();
            if current.is_terminal() {
                debug!(
                    appointment_id,
                    state = current.name(),
                    requested = target.name(),
                    "Appointment already terminal"
                );
                return Ok(appointment);
            }

            let update = match target {
                LifecycleState::Completed => AppointmentUpdate {
                    is_completed: Some(true),
                    ..Default::default()
                },
                LifecycleState::Cancelled => AppointmentUpdate {
                    cancelled: Some(true),
                    ..Default::default()
                },
                LifecycleState::Booked => AppointmentUpdate::default(),
            };
            let updated = self.store.update_appointment(appointment_id, update)?;

            info!(appointment_id, doctor_id, state = target.name(), "Appointment updated");
            Ok(updated)
        })
    }
}
