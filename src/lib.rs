pub mod calendar;
pub mod config;
pub mod dashboard;
pub mod directory;
pub mod error;
pub mod lifecycle;
pub mod locks;
pub mod models;
pub mod scheduler;
pub mod service;
pub mod store;

pub use dashboard::DashboardSummary;
pub use directory::ProfileUpdate;
pub use error::{BookingError, StoreError};
pub use models::{Address, Appointment, Doctor, DoctorSummary, LifecycleState, Patient};
pub use service::BookingService;
pub use store::{AppointmentStore, DoctorStore, MemoryStore, PatientStore, PatientUpdate};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter.
pub fn init_tracing(config: &config::Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
