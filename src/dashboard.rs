/// Doctor dashboard aggregation.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LATEST_APPOINTMENTS;
use crate::error::{require, BookingError};
use crate::models::Appointment;
use crate::store::{AppointmentStore, DoctorStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub earnings: u64,
    pub appointments: usize,
    pub patients: usize,
    pub latest_appointments: Vec<Appointment>,
}

/// Summarize one doctor's appointments, given in creation order.
///
/// Earnings count every appointment that is completed or paid, including
/// cancelled ones, and saturate at `u64::MAX`. Patients are counted once
/// each, cancelled bookings included.
pub fn summarize(appointments: &[Appointment]) -> DashboardSummary {
    let earnings = appointments
        .iter()
        .filter(|a| a.is_billable())
        .fold(0u64, |total, a| total.saturating_add(a.amount));

    let patients: HashSet<&str> = appointments.iter().map(|a| a.patient_id.as_str()).collect();

    let latest_appointments = appointments
        .iter()
        .rev()
        .take(LATEST_APPOINTMENTS)
        .cloned()
        .collect();

    DashboardSummary {
        earnings,
        appointments: appointments.len(),
        patients: patients.len(),
        latest_appointments,
    }
}

pub struct Dashboard<S> {
    store: Arc<S>,
}

impl<S: DoctorStore + AppointmentStore> Dashboard<S> {
    pub fn new(store: Arc<S>) -> Self {
        Dashboard { store }
    }

    pub fn summarize(&self, doctor_id: &str) -> Result<DashboardSummary, BookingError> {
        require("docId", doctor_id)?;
        if self.store.get_doctor(doctor_id)?.is_none() {
            return Err(BookingError::DoctorNotFound(doctor_id.to_string()));
        }

        let appointments = self.store.find_by_doctor(doctor_id)?;
        let summary = summarize(&appointments);
        debug!(
            doctor_id,
            earnings = summary.earnings,
            appointments = summary.appointments,
            patients = summary.patients,
            "Dashboard computed"
        );
        Ok(summary)
    }
}
