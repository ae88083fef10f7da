//! In-memory implementation of the storage traits. Backs the integration
//! tests and local development without a Postgres instance; enforces the
//! same non-cancelled uniqueness predicate the partial index provides.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::DatabaseError;
use super::models::{
    booking_day, Appointment, AppointmentFilter, AppointmentStatus, AuditLog, Doctor,
    DoctorCalendar, NewAuditLog, NewDoctor, NewPatient, Patient,
};
use super::repositories::{
    AppointmentRepository, AuditLogRepository, DoctorRepository, PatientRepository, Stores,
};

#[derive(Default)]
pub struct MemoryStore {
    patients: RwLock<HashMap<Uuid, Patient>>,
    doctors: RwLock<HashMap<Uuid, Doctor>>,
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    audit_logs: RwLock<Vec<AuditLog>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of the audit trail, newest last.
    pub async fn audit_entries(&self) -> Vec<AuditLog> {
        self.audit_logs.read().await.clone()
    }

    /// Clear a doctor's active flag. No-op if the doctor is unknown.
    pub async fn deactivate_doctor(&self, doctor_id: Uuid) {
        if let Some(doctor) = self.doctors.write().await.get_mut(&doctor_id) {
            doctor.is_active = false;
        }
    }
}

impl Stores {
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            patients: store.clone(),
            doctors: store.clone(),
            appointments: store.clone(),
            audit_logs: store,
        }
    }
}

#[async_trait]
impl PatientRepository for MemoryStore {
    async fn insert(&self, new_patient: &NewPatient) -> Result<Patient, DatabaseError> {
        let mut patients = self.patients.write().await;
        let email = new_patient.email.to_lowercase();
        if patients.values().any(|patient| patient.email == email) {
            return Err(DatabaseError::Duplicate);
        }

        let now = OffsetDateTime::now_utc();
        let patient = Patient {
            id: Uuid::now_v7(),
            first_name: new_patient.first_name.clone(),
            last_name: new_patient.last_name.clone(),
            email,
            phone: new_patient.phone.clone(),
            date_of_birth: new_patient.date_of_birth,
            gender: new_patient.gender.clone(),
            health_card_number: new_patient.health_card_number.clone(),
            created_at: now,
            updated_at: now,
        };
        patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn find_by_id(&self, patient_id: Uuid) -> Result<Option<Patient>, DatabaseError> {
        Ok(self.patients.read().await.get(&patient_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Patient>, DatabaseError> {
        let mut patients: Vec<_> = self.patients.read().await.values().cloned().collect();
        patients.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });
        Ok(patients)
    }
}

#[async_trait]
impl DoctorRepository for MemoryStore {
    async fn insert(&self, new_doctor: &NewDoctor) -> Result<Doctor, DatabaseError> {
        let mut doctors = self.doctors.write().await;
        let email = new_doctor.email.to_lowercase();
        if doctors
            .values()
            .any(|doctor| doctor.email == email || doctor.license_number == new_doctor.license_number)
        {
            return Err(DatabaseError::Duplicate);
        }

        let now = OffsetDateTime::now_utc();
        let doctor = Doctor {
            id: Uuid::now_v7(),
            first_name: new_doctor.first_name.clone(),
            last_name: new_doctor.last_name.clone(),
            email,
            phone: new_doctor.phone.clone(),
            specialty: new_doctor.specialty.clone(),
            license_number: new_doctor.license_number.clone(),
            consultation_fee: new_doctor.consultation_fee,
            hospital_affiliation: new_doctor.hospital_affiliation.clone(),
            schedule: DoctorCalendar::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        doctors.insert(doctor.id, doctor.clone());
        Ok(doctor)
    }

    async fn find_by_id(&self, doctor_id: Uuid) -> Result<Option<Doctor>, DatabaseError> {
        Ok(self.doctors.read().await.get(&doctor_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Doctor>, DatabaseError> {
        let mut doctors: Vec<_> = self.doctors.read().await.values().cloned().collect();
        doctors.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });
        Ok(doctors)
    }

    async fn save_schedule(
        &self,
        doctor_id: Uuid,
        schedule: &DoctorCalendar,
    ) -> Result<(), DatabaseError> {
        let mut doctors = self.doctors.write().await;
        let doctor = doctors.get_mut(&doctor_id).ok_or(DatabaseError::NotFound)?;
        doctor.schedule = schedule.clone();
        doctor.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }
}

#[async_trait]
impl AppointmentRepository for MemoryStore {
    async fn insert(&self, appointment: &Appointment) -> Result<(), DatabaseError> {
        let mut appointments = self.appointments.write().await;

        let day = booking_day(appointment.appointment_date);
        let conflict = appointments.values().any(|existing| {
            existing.doctor_id == appointment.doctor_id
                && booking_day(existing.appointment_date) == day
                && existing.time_slot == appointment.time_slot
                && existing.status != AppointmentStatus::Cancelled
        });
        if conflict && appointment.status != AppointmentStatus::Cancelled {
            return Err(DatabaseError::Duplicate);
        }

        appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<Appointment>, DatabaseError> {
        Ok(self.appointments.read().await.get(&appointment_id).cloned())
    }

    async fn update(&self, appointment: &Appointment) -> Result<(), DatabaseError> {
        let mut appointments = self.appointments.write().await;
        let existing = appointments
            .get_mut(&appointment.id)
            .ok_or(DatabaseError::NotFound)?;
        let mut updated = appointment.clone();
        updated.updated_at = OffsetDateTime::now_utc();
        *existing = updated;
        Ok(())
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<(), DatabaseError> {
        self.appointments
            .write()
            .await
            .remove(&appointment_id)
            .map(|_| ())
            .ok_or(DatabaseError::NotFound)
    }

    async fn find(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, DatabaseError> {
        let appointments = self.appointments.read().await;
        let mut matches: Vec<_> = appointments
            .values()
            .filter(|appointment| {
                filter
                    .patient_id
                    .map_or(true, |id| appointment.patient_id == id)
                    && filter
                        .doctor_id
                        .map_or(true, |id| appointment.doctor_id == id)
                    && filter
                        .statuses
                        .as_ref()
                        .map_or(true, |statuses| statuses.contains(&appointment.status))
                    && filter
                        .from_date
                        .map_or(true, |from| appointment.appointment_date >= from)
                    && filter
                        .to_date
                        .map_or(true, |to| appointment.appointment_date <= to)
            })
            .cloned()
            .collect();

        matches.sort_by_key(|appointment| appointment.appointment_date);
        if !filter.ascending {
            matches.reverse();
        }
        Ok(matches)
    }
}

#[async_trait]
impl AuditLogRepository for MemoryStore {
    async fn append(&self, entry: &NewAuditLog) -> Result<(), DatabaseError> {
        self.audit_logs.write().await.push(AuditLog {
            id: Uuid::now_v7(),
            action: entry.action,
            performed_by_id: entry.performed_by_id,
            performed_by_type: entry.performed_by_type,
            performed_by_name: entry.performed_by_name.clone(),
            entity_type: entry.entity_type.clone(),
            entity_id: entry.entity_id,
            details: entry.details.clone(),
            severity: entry.severity,
            status: entry.status,
            error_message: entry.error_message.clone(),
            timestamp: OffsetDateTime::now_utc(),
        });
        Ok(())
    }
}
