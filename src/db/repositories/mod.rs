mod appointment_repository;
mod audit_log_repository;
mod doctor_repository;
mod patient_repository;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::error::DatabaseError;
use super::models::{
    Appointment, AppointmentFilter, Doctor, DoctorCalendar, NewAuditLog, NewDoctor, NewPatient,
    Patient,
};

pub use appointment_repository::PgAppointmentRepository;
pub use audit_log_repository::PgAuditLogRepository;
pub use doctor_repository::PgDoctorRepository;
pub use patient_repository::PgPatientRepository;

#[async_trait]
pub trait PatientRepository: Send + Sync {
    async fn insert(&self, new_patient: &NewPatient) -> Result<Patient, DatabaseError>;
    async fn find_by_id(&self, patient_id: Uuid) -> Result<Option<Patient>, DatabaseError>;
    async fn list(&self) -> Result<Vec<Patient>, DatabaseError>;
}

#[async_trait]
pub trait DoctorRepository: Send + Sync {
    async fn insert(&self, new_doctor: &NewDoctor) -> Result<Doctor, DatabaseError>;
    async fn find_by_id(&self, doctor_id: Uuid) -> Result<Option<Doctor>, DatabaseError>;
    async fn list(&self) -> Result<Vec<Doctor>, DatabaseError>;
    async fn save_schedule(
        &self,
        doctor_id: Uuid,
        schedule: &DoctorCalendar,
    ) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Returns `DatabaseError::Duplicate` when the non-cancelled uniqueness
    /// guard over `(doctor_id, appointment day, time_slot)` rejects the row.
    async fn insert(&self, appointment: &Appointment) -> Result<(), DatabaseError>;
    async fn find_by_id(&self, appointment_id: Uuid)
        -> Result<Option<Appointment>, DatabaseError>;
    async fn update(&self, appointment: &Appointment) -> Result<(), DatabaseError>;
    async fn delete(&self, appointment_id: Uuid) -> Result<(), DatabaseError>;
    async fn find(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, DatabaseError>;
}

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn append(&self, entry: &NewAuditLog) -> Result<(), DatabaseError>;
}

/// Bundle of storage handles injected into services and handlers. The
/// Postgres set is the production wiring; tests swap in the in-memory store.
#[derive(Clone)]
pub struct Stores {
    pub patients: Arc<dyn PatientRepository>,
    pub doctors: Arc<dyn DoctorRepository>,
    pub appointments: Arc<dyn AppointmentRepository>,
    pub audit_logs: Arc<dyn AuditLogRepository>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            patients: Arc::new(PgPatientRepository::new(pool.clone())),
            doctors: Arc::new(PgDoctorRepository::new(pool.clone())),
            appointments: Arc::new(PgAppointmentRepository::new(pool.clone())),
            audit_logs: Arc::new(PgAuditLogRepository::new(pool)),
        }
    }
}
