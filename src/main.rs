/// Command-line front end for the booking core.
///
/// An interactive menu for registering doctors and patients, booking slots,
/// completing or cancelling appointments and viewing a doctor's dashboard.
/// This is the only layer that turns core errors into user-facing text.

use std::io::{self, Write};
use std::process::ExitCode;

use appointdesk::calendar::{daily_slot_times, slot_date_key, SLOT_TIME_FORMAT};
use appointdesk::config::{self, Config};
use appointdesk::{Address, Appointment, BookingError, BookingService, Doctor, MemoryStore, Patient};
use chrono::{Duration, Local, NaiveDate, NaiveTime};

/// Working day shown when picking a slot.
const DAY_START_HOUR: u32 = 10;
const DAY_END_HOUR: u32 = 21;
const SLOT_MINUTES: i64 = 30;

/// Which lifecycle action a refusal came from, for the message wording.
enum Action {
    Book,
    Complete,
    Cancel,
    Other,
}

/// Map a core error to the message shown to the user.
fn describe(action: Action, err: &BookingError) -> String {
    match (action, err) {
        (_, BookingError::DoctorUnavailable(_)) => "Doctor not available".to_string(),
        (_, BookingError::SlotUnavailable { .. }) => "Slot not available".to_string(),
        (Action::Complete, e) if e.is_not_permitted() => "Mark Failed".to_string(),
        (Action::Cancel, e) if e.is_not_permitted() => "Cancellation Failed".to_string(),
        (Action::Book, BookingError::PatientNotFound(_)) => "Unauthorized user".to_string(),
        (_, e) => e.to_string(),
    }
}

struct BookingCli {
    service: BookingService<MemoryStore>,
    running: bool,
}

impl BookingCli {
    fn new(service: BookingService<MemoryStore>) -> Self {
        BookingCli {
            service,
            running: true,
        }
    }

    fn print_header(&self) {
        println!("\n{}", "=".repeat(60));
        println!("       APPOINTMENT BOOKING DESK v{}", config::APP_VERSION);
        println!("{}", "=".repeat(60));
    }

    fn print_menu(&self) {
        println!("\n--- Main Menu ---");
        println!("1. Add doctor");
        println!("2. Add patient");
        println!("3. List doctors");
        println!("4. Book appointment");
        println!("5. View doctor appointments");
        println!("6. Complete appointment");
        println!("7. Cancel appointment");
        println!("8. Toggle doctor availability");
        println!("9. Doctor dashboard");
        println!("10. Run demo");
        println!("11. Save and exit");
        println!("{}", "-".repeat(20));
    }

    fn get_input(&self, prompt: &str, default: Option<&str>) -> io::Result<String> {
        if let Some(def) = default {
            print!("{} [{}]: ", prompt, def);
        } else {
            print!("{}: ", prompt);
        }
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        let input = input.trim();

        if input.is_empty() {
            Ok(default.unwrap_or("").to_string())
        } else {
            Ok(input.to_string())
        }
    }

    fn get_int_input(&self, prompt: &str, default: Option<u64>) -> io::Result<u64> {
        loop {
            let default_str = default.map(|d| d.to_string());
            let input = self.get_input(prompt, default_str.as_deref())?;

            if let Ok(value) = input.parse::<u64>() {
                return Ok(value);
            }
            println!("Please enter a valid number");
        }
    }

    /// Pick one entry from a numbered list; `None` means "go back".
    fn choose(&self, prompt: &str, count: usize) -> io::Result<Option<usize>> {
        let choice = self.get_int_input(&format!("{} (0 to go back)", prompt), Some(0))? as usize;
        if choice == 0 || choice > count {
            return Ok(None);
        }
        Ok(Some(choice - 1))
    }

    fn choose_doctor(&self) -> io::Result<Option<String>> {
        let doctors = match self.service.list_doctors() {
            Ok(doctors) => doctors,
            Err(e) => {
                println!("\n{}", e);
                return Ok(None);
            }
        };
        if doctors.is_empty() {
            println!("\nNo doctors yet (option 1)");
            return Ok(None);
        }

        for (i, doc) in doctors.iter().enumerate() {
            println!(
                "  {}. {} ({}) - fee {} - {}",
                i + 1,
                doc.profile.name,
                doc.profile.speciality,
                doc.profile.fees,
                if doc.available { "available" } else { "unavailable" }
            );
        }
        Ok(self
            .choose("Select doctor", doctors.len())?
            .map(|i| doctors[i].profile.id.clone()))
    }

    fn choose_patient(&self) -> io::Result<Option<String>> {
        let patients = match self.service.list_patients() {
            Ok(patients) => patients,
            Err(e) => {
                println!("\n{}", e);
                return Ok(None);
            }
        };
        if patients.is_empty() {
            println!("\nNo patients yet (option 2)");
            return Ok(None);
        }

        for (i, patient) in patients.iter().enumerate() {
            println!("  {}. {} <{}>", i + 1, patient.name, patient.email);
        }
        Ok(self
            .choose("Select patient", patients.len())?
            .map(|i| patients[i].id.clone()))
    }

    fn choose_appointment(&self, doctor_id: &str) -> io::Result<Option<String>> {
        let appointments = match self.service.appointments_for_doctor(doctor_id) {
            Ok(appointments) => appointments,
            Err(e) => {
                println!("\n{}", e);
                return Ok(None);
            }
        };
        if appointments.is_empty() {
            println!("\nNo appointments for this doctor");
            return Ok(None);
        }

        for (i, apt) in appointments.iter().enumerate() {
            print!("  {}. ", i + 1);
            print_appointment(apt);
        }
        Ok(self
            .choose("Select appointment", appointments.len())?
            .map(|i| appointments[i].id.clone()))
    }

    fn add_doctor(&mut self) -> io::Result<()> {
        println!("\n--- Add Doctor ---");
        let name = self.get_input("Doctor name", Some("Dr. Smith"))?;
        let email = self.get_input("Doctor email", Some("smith@clinic.test"))?;
        let speciality = self.get_input("Speciality", Some("General physician"))?;
        let fees = self.get_int_input("Consultation fee", Some(50))?;
        let line1 = self.get_input("Address line 1", Some(""))?;
        let line2 = self.get_input("Address line 2", Some(""))?;

        let doctor = match Doctor::new(name, email, speciality, fees) {
            Ok(doctor) => doctor.with_address(Address::new(line1, line2)),
            Err(e) => {
                println!("\nError creating doctor: {}", e);
                return Ok(());
            }
        };
        let label = doctor.name.clone();
        match self.service.add_doctor(doctor) {
            Ok(()) => println!("\nDoctor {} added", label),
            Err(e) => println!("\nError adding doctor: {}", e),
        }
        Ok(())
    }

    fn add_patient(&mut self) -> io::Result<()> {
        println!("\n--- Add Patient ---");
        let name = self.get_input("Patient name", None)?;
        let email = self.get_input("Patient email", None)?;
        let phone = self.get_input("Phone", Some(""))?;

        match Patient::new(name, email) {
            Ok(mut patient) => {
                patient.phone = phone;
                let label = patient.name.clone();
                match self.service.add_patient(patient) {
                    Ok(()) => println!("\nPatient {} added", label),
                    Err(e) => println!("\nError adding patient: {}", e),
                }
            }
            Err(e) => println!("\nError creating patient: {}", e),
        }
        Ok(())
    }

    fn list_doctors(&self) -> io::Result<()> {
        match self.service.list_doctors() {
            Ok(doctors) if doctors.is_empty() => println!("\nNo doctors yet"),
            Ok(doctors) => {
                println!("\n--- Doctors ({}) ---", doctors.len());
                for doc in doctors {
                    println!(
                        "  {} - {} - fee {} - {}",
                        doc.profile.name,
                        doc.profile.speciality,
                        doc.profile.fees,
                        if doc.available { "available" } else { "unavailable" }
                    );
                }
            }
            Err(e) => println!("\n{}", e),
        }
        Ok(())
    }

    fn book(&mut self) -> io::Result<()> {
        println!("\n--- Book Appointment ---");
        let Some(patient_id) = self.choose_patient()? else {
            return Ok(());
        };
        let Some(doctor_id) = self.choose_doctor()? else {
            return Ok(());
        };

        let tomorrow = (Local::now() + Duration::days(1)).date_naive();
        let default_date = tomorrow.format("%Y-%m-%d").to_string();
        let date_input = self.get_input("Date (YYYY-MM-DD)", Some(&default_date))?;
        let date = match NaiveDate::parse_from_str(&date_input, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                println!("\nInvalid date: {}", date_input);
                return Ok(());
            }
        };
        let slot_date = slot_date_key(date);

        let day = daily_slot_times(DAY_START_HOUR, DAY_END_HOUR, SLOT_MINUTES, None);
        let free = match self.service.available_times(&doctor_id, &slot_date, &day) {
            Ok(free) => free,
            Err(e) => {
                println!("\n{}", describe(Action::Book, &e));
                return Ok(());
            }
        };
        if free.is_empty() {
            println!("\nNo free slots on {}", date.format("%A, %Y-%m-%d"));
            return Ok(());
        }

        println!("\nFree slots on {}:", date.format("%A, %Y-%m-%d"));
        for (i, time) in free.iter().enumerate() {
            println!("  {}. {}", i + 1, time);
        }
        let Some(choice) = self.choose("Select slot", free.len())? else {
            return Ok(());
        };

        match self
            .service
            .reserve(&doctor_id, &patient_id, &slot_date, &free[choice])
        {
            Ok(apt) => {
                println!("\nAppointment booked successfully");
                print_appointment(&apt);
            }
            Err(e) => println!("\n{}", describe(Action::Book, &e)),
        }
        Ok(())
    }

    fn view_appointments(&self) -> io::Result<()> {
        let Some(doctor_id) = self.choose_doctor()? else {
            return Ok(());
        };
        match self.service.appointments_for_doctor(&doctor_id) {
            Ok(appointments) if appointments.is_empty() => println!("\nNo appointments"),
            Ok(appointments) => {
                println!("\n--- Appointments ({}) ---", appointments.len());
                for apt in &appointments {
                    print_appointment(apt);
                }
            }
            Err(e) => println!("\n{}", e),
        }
        Ok(())
    }

    fn change_state(&mut self, action: Action) -> io::Result<()> {
        println!("\n--- Acting as doctor ---");
        let Some(doctor_id) = self.choose_doctor()? else {
            return Ok(());
        };
        let Some(appointment_id) = self.choose_appointment(&doctor_id)? else {
            return Ok(());
        };

        let result = match action {
            Action::Complete => self.service.complete(&appointment_id, &doctor_id),
            _ => self.service.cancel(&appointment_id, &doctor_id),
        };
        match result {
            Ok(_) if matches!(action, Action::Complete) => println!("\nAppointment Completed"),
            Ok(_) => println!("\nAppointment Cancelled"),
            Err(e) => println!("\n{}", describe(action, &e)),
        }
        Ok(())
    }

    fn toggle_availability(&mut self) -> io::Result<()> {
        let Some(doctor_id) = self.choose_doctor()? else {
            return Ok(());
        };
        match self.service.toggle_availability(&doctor_id) {
            Ok(available) => println!(
                "\nAvailability changed: now {}",
                if available { "available" } else { "unavailable" }
            ),
            Err(e) => println!("\n{}", describe(Action::Other, &e)),
        }
        Ok(())
    }

    fn dashboard(&self) -> io::Result<()> {
        let Some(doctor_id) = self.choose_doctor()? else {
            return Ok(());
        };
        match self.service.summarize(&doctor_id) {
            Ok(summary) => {
                println!("\n--- Dashboard ---");
                println!("  Earnings: {}", summary.earnings);
                println!("  Appointments: {}", summary.appointments);
                println!("  Patients: {}", summary.patients);
                if !summary.latest_appointments.is_empty() {
                    println!("\nLatest bookings:");
                    for apt in &summary.latest_appointments {
                        print_appointment(apt);
                    }
                }
            }
            Err(e) => println!("\n{}", e),
        }
        Ok(())
    }

    fn run_demo(&mut self) -> io::Result<()> {
        println!("\n--- Running Demo ---");

        let seeded = Doctor::new("Dr. Demo", "demo@clinic.test", "Dermatologist", 80)
            .map(|d| d.with_profile("MBBS", "3 Years", "Skin and allergy clinic"))
            .and_then(|doctor| {
                let patients = [
                    ("John Smith", "john@email.com"),
                    ("Jane Doe", "jane@email.com"),
                    ("Bob Wilson", "bob@email.com"),
                ]
                .into_iter()
                .map(|(name, email)| Patient::new(name, email))
                .collect::<Result<Vec<_>, _>>()?;
                Ok((doctor, patients))
            });
        let (doctor, patients) = match seeded {
            Ok(seeded) => seeded,
            Err(e) => {
                println!("Demo setup failed: {}", e);
                return Ok(());
            }
        };

        let doctor_id = doctor.id.clone();
        if let Err(e) = self.service.add_doctor(doctor) {
            println!("Demo setup failed: {}", e);
            return Ok(());
        }
        for patient in &patients {
            if let Err(e) = self.service.add_patient(patient.clone()) {
                println!("Demo setup failed: {}", e);
                return Ok(());
            }
        }

        let date = slot_date_key((Local::now() + Duration::days(1)).date_naive());
        let ten = NaiveTime::from_hms_opt(10, 0, 0)
            .map(|t| t.format(SLOT_TIME_FORMAT).to_string())
            .unwrap_or_default();

        println!("\nThree patients try to book {} at {}...", date, ten);
        let mut booked: Vec<Appointment> = Vec::new();
        for patient in &patients {
            match self.service.reserve(&doctor_id, &patient.id, &date, &ten) {
                Ok(apt) => {
                    println!("  {:12} -> booked", patient.name);
                    booked.push(apt);
                }
                Err(e) => println!("  {:12} -> {}", patient.name, describe(Action::Book, &e)),
            }
        }

        if let Some(patient) = patients.get(1) {
            if let Ok(apt) = self.service.reserve(&doctor_id, &patient.id, &date, "10:30 AM") {
                println!("  {:12} -> booked 10:30 AM instead", patient.name);
                booked.push(apt);
            }
        }

        if let Some(first) = booked.first() {
            match self.service.complete(&first.id, &doctor_id) {
                Ok(_) => println!("\nFirst appointment marked completed"),
                Err(e) => println!("\n{}", describe(Action::Complete, &e)),
            }
            if let Err(e) = self.service.cancel(&first.id, "someone-else") {
                println!("Another doctor tried to cancel it: {}", describe(Action::Cancel, &e));
            }
        }

        if let Ok(summary) = self.service.summarize(&doctor_id) {
            println!(
                "\nDashboard: earnings {}, appointments {}, patients {}",
                summary.earnings, summary.appointments, summary.patients
            );
        }
        Ok(())
    }

    fn run(&mut self) -> io::Result<()> {
        self.print_header();

        while self.running {
            self.print_menu();

            let choice = self.get_int_input("Enter choice", Some(10))?;

            match choice {
                1 => self.add_doctor()?,
                2 => self.add_patient()?,
                3 => self.list_doctors()?,
                4 => self.book()?,
                5 => self.view_appointments()?,
                6 => self.change_state(Action::Complete)?,
                7 => self.change_state(Action::Cancel)?,
                8 => self.toggle_availability()?,
                9 => self.dashboard()?,
                10 => self.run_demo()?,
                11 => {
                    self.running = false;
                    println!("\nGoodbye!");
                }
                _ => println!("Invalid choice"),
            }
        }
        Ok(())
    }
}

fn print_appointment(apt: &Appointment) {
    println!(
        "{} {} - {} with {} - {} ({})",
        apt.slot_date.replace('_', "/"),
        apt.slot_time,
        apt.patient.name,
        apt.doctor.name,
        apt.amount,
        apt.state().name()
    );
}

fn main() -> ExitCode {
    let config = Config::from_env();
    appointdesk::init_tracing(&config);
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let service = match BookingService::open(&config.data_file) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Cannot open {}: {}", config.data_file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut cli = BookingCli::new(service);
    let outcome = cli.run();

    if let Err(e) = cli.service.close() {
        eprintln!("Failed to save {}: {}", config.data_file.display(), e);
        return ExitCode::FAILURE;
    }
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Input error: {}", e);
            ExitCode::FAILURE
        }
    }
}
