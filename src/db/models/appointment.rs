use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::{Date, OffsetDateTime, UtcOffset};
use validator::Validate;

/// Civil day an appointment belongs to, for calendar lookups and the
/// double-booking key. Always the UTC day: clients submit timestamps in
/// arbitrary offsets, and the day must match the unique index, which keys
/// on the UTC date.
pub fn booking_day(timestamp: OffsetDateTime) -> Date {
    timestamp.to_offset(UtcOffset::UTC).date()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "appointment_status", rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Allowed lifecycle transitions:
    ///
    /// Scheduled -> Confirmed -> InProgress -> Completed
    /// Scheduled | Confirmed  -> Cancelled | NoShow
    ///
    /// Completed, Cancelled and NoShow are terminal.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        match self {
            Scheduled => matches!(next, Confirmed | Cancelled | NoShow),
            Confirmed => matches!(next, InProgress | Cancelled | NoShow),
            InProgress => matches!(next, Completed),
            Completed | Cancelled | NoShow => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "appointment_type", rename_all = "snake_case")]
pub enum AppointmentType {
    #[default]
    Consultation,
    FollowUp,
    Emergency,
    Checkup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "cancelled_by", rename_all = "snake_case")]
pub enum CancelledBy {
    Patient,
    Doctor,
    Admin,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: OffsetDateTime,
    pub time_slot: String,
    pub reason: String,
    pub symptoms: Vec<String>,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<OffsetDateTime>,
    pub cancelled_by: Option<CancelledBy>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    pub follow_up_required: bool,
    pub follow_up_date: Option<OffsetDateTime>,
    pub payment_id: Option<Uuid>,
    pub booking_date: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub appointment_date: OffsetDateTime,
    pub time_slot: String,
    #[validate(length(min = 10, message = "Please provide a detailed reason (min 10 characters)"))]
    pub reason: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub appointment_type: AppointmentType,
    /// Administrative backfill may create a record directly as Cancelled,
    /// bypassing the slot-availability check.
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAppointmentPayload {
    pub status: Option<AppointmentStatus>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub notes: Option<String>,
    pub follow_up_required: Option<bool>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub follow_up_date: Option<OffsetDateTime>,
    pub payment_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CancelAppointmentRequest {
    #[validate(length(min = 1, message = "Cancellation reason is required"))]
    pub reason: String,
    pub cancelled_by: CancelledBy,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleAppointmentRequest {
    #[serde(with = "time::serde::rfc3339")]
    pub new_date: OffsetDateTime,
    pub new_time_slot: String,
}

/// Filter for appointment queries. Orchestrator query operations compose
/// these; the store only applies them.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub statuses: Option<Vec<AppointmentStatus>>,
    pub from_date: Option<OffsetDateTime>,
    pub to_date: Option<OffsetDateTime>,
    pub ascending: bool,
}

#[cfg(test)]
mod tests {
    use super::AppointmentStatus::*;

    #[test]
    fn forward_path_is_allowed() {
        assert!(Scheduled.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
    }

    #[test]
    fn cancellation_and_no_show_only_before_start() {
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Scheduled.can_transition_to(NoShow));
        assert!(Confirmed.can_transition_to(NoShow));
        assert!(!InProgress.can_transition_to(Cancelled));
        assert!(!InProgress.can_transition_to(NoShow));
    }

    #[test]
    fn terminal_states_admit_no_transition() {
        for terminal in [Completed, Cancelled, NoShow] {
            assert!(terminal.is_terminal());
            for next in [Scheduled, Confirmed, InProgress, Completed, Cancelled, NoShow] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn no_skipping_ahead() {
        assert!(!Scheduled.can_transition_to(InProgress));
        assert!(!Scheduled.can_transition_to(Completed));
        assert!(!Confirmed.can_transition_to(Completed));
    }
}
