use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use thiserror::Error;
use time::{Date, OffsetDateTime};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "specialty", rename_all = "snake_case")]
pub enum Specialty {
    Cardiology,
    Neurology,
    Pediatrics,
    Orthopedics,
    Dermatology,
    General,
    Oncology,
    Psychiatry,
}

/// One bookable time label on a given date. Identity is `(date, time)`;
/// the label is an opaque string such as "09:00".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub time: String,
    pub is_available: bool,
}

/// The slots configured for one calendar date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySchedule {
    pub date: Date,
    pub slots: Vec<Slot>,
}

/// Per-doctor availability calendar, owned by the doctor row and stored
/// alongside it as a JSONB column. Dates are matched at calendar-day
/// granularity: appointment timestamps may carry an arbitrary client
/// offset, so they are truncated to their UTC civil date before lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorCalendar {
    pub entries: Vec<DaySchedule>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("No schedule found for this date")]
    NoSchedule,

    #[error("Slot not available")]
    SlotUnavailable,

    #[error("Schedule already exists for this date")]
    DuplicateDate,
}

impl DoctorCalendar {
    /// Free slots for a date. An empty vec is the valid "doctor has no
    /// slots configured" state, not an error.
    pub fn available_slots(&self, date: Date) -> Vec<Slot> {
        self.entries
            .iter()
            .find(|entry| entry.date == date)
            .map(|entry| {
                entry
                    .slots
                    .iter()
                    .filter(|slot| slot.is_available)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Marks a slot as occupied. The sole writer of slot -> occupied.
    pub fn book_slot(&mut self, date: Date, time: &str) -> Result<Slot, ScheduleError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.date == date)
            .ok_or(ScheduleError::NoSchedule)?;

        let slot = entry
            .slots
            .iter_mut()
            .find(|slot| slot.time == time)
            .filter(|slot| slot.is_available)
            .ok_or(ScheduleError::SlotUnavailable)?;

        slot.is_available = false;
        Ok(slot.clone())
    }

    /// Inverse of `book_slot`. Idempotent: releasing an already-available
    /// or unknown slot is a no-op.
    pub fn release_slot(&mut self, date: Date, time: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.date == date) {
            if let Some(slot) = entry.slots.iter_mut().find(|slot| slot.time == time) {
                slot.is_available = true;
            }
        }
    }

    /// Appends a day with all slots initially available. A second schedule
    /// for the same date is rejected so `(date, time)` stays unambiguous.
    pub fn add_day_schedule(
        &mut self,
        date: Date,
        times: Vec<String>,
    ) -> Result<(), ScheduleError> {
        if self.entries.iter().any(|entry| entry.date == date) {
            return Err(ScheduleError::DuplicateDate);
        }

        self.entries.push(DaySchedule {
            date,
            slots: times
                .into_iter()
                .map(|time| Slot {
                    time,
                    is_available: true,
                })
                .collect(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub specialty: Specialty,
    pub license_number: String,
    pub consultation_fee: f64,
    pub hospital_affiliation: Option<String>,
    #[sqlx(json)]
    pub schedule: DoctorCalendar,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("Dr. {} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewDoctor {
    pub first_name: String,
    pub last_name: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    pub phone: String,
    pub specialty: Specialty,
    pub license_number: String,
    #[validate(range(min = 0.0, message = "Consultation fee cannot be negative"))]
    pub consultation_fee: f64,
    pub hospital_affiliation: Option<String>,
}

/// Summary fields exposed when an appointment is populated for a caller.
#[derive(Debug, Clone, Serialize)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub name: String,
    pub specialty: Specialty,
    pub consultation_fee: f64,
}

impl From<&Doctor> for DoctorSummary {
    fn from(doctor: &Doctor) -> Self {
        Self {
            id: doctor.id,
            name: doctor.full_name(),
            specialty: doctor.specialty.clone(),
            consultation_fee: doctor.consultation_fee,
        }
    }
}
