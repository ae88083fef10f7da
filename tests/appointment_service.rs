use std::sync::Arc;

use time::macros::{date, offset};
use time::{Date, Duration, OffsetDateTime};
use uuid::Uuid;

use clinic_scheduler::db::memory::MemoryStore;
use clinic_scheduler::db::{
    AppointmentFilter, AppointmentStatus, AuditSeverity, AuditStatus, CancelledBy, Doctor,
    DoctorRepository, Gender, NewAppointment, NewDoctor, NewPatient, Patient, PatientRepository,
    Specialty, Stores, UpdateAppointmentPayload,
};
use clinic_scheduler::error::AppError;
use clinic_scheduler::services::AppointmentService;

struct Harness {
    store: Arc<MemoryStore>,
    stores: Stores,
    service: AppointmentService,
}

fn harness() -> Harness {
    let store = MemoryStore::new();
    let stores = Stores::in_memory(store.clone());
    let service = AppointmentService::new(stores.clone());
    Harness {
        store,
        stores,
        service,
    }
}

impl Harness {
    async fn patient(&self, email: &str) -> Patient {
        self.stores
            .patients
            .insert(&NewPatient {
                first_name: "John".to_string(),
                last_name: "Doe".to_string(),
                email: email.to_string(),
                phone: "+94771234567".to_string(),
                date_of_birth: date!(1990 - 01 - 01),
                gender: Gender::Male,
                health_card_number: None,
            })
            .await
            .unwrap()
    }

    async fn doctor_with_slots(&self, day: Date, slots: &[&str]) -> Doctor {
        let doctor = self
            .stores
            .doctors
            .insert(&NewDoctor {
                first_name: "Sarah".to_string(),
                last_name: "Smith".to_string(),
                email: "sarah.smith@hospital.com".to_string(),
                phone: "+94771234568".to_string(),
                specialty: Specialty::Cardiology,
                license_number: "LIC001".to_string(),
                consultation_fee: 5000.0,
                hospital_affiliation: None,
            })
            .await
            .unwrap();

        self.service
            .add_doctor_schedule(
                doctor.id,
                day,
                slots.iter().map(|s| s.to_string()).collect(),
            )
            .await
            .unwrap();

        self.stores
            .doctors
            .find_by_id(doctor.id)
            .await
            .unwrap()
            .unwrap()
    }
}

fn in_a_month() -> OffsetDateTime {
    OffsetDateTime::now_utc() + Duration::days(30)
}

fn booking(patient: &Patient, doctor: &Doctor, when: OffsetDateTime, slot: &str) -> NewAppointment {
    NewAppointment {
        patient_id: patient.id,
        doctor_id: doctor.id,
        appointment_date: when,
        time_slot: slot.to_string(),
        reason: "Regular checkup for heart condition".to_string(),
        symptoms: vec![],
        appointment_type: Default::default(),
        status: None,
    }
}

#[tokio::test]
async fn create_appointment_books_the_slot() {
    let h = harness();
    let when = in_a_month();
    let patient = h.patient("john.doe@test.com").await;
    let doctor = h.doctor_with_slots(when.date(), &["09:00", "10:00"]).await;

    let details = h
        .service
        .create_appointment(booking(&patient, &doctor, when, "09:00"))
        .await
        .unwrap();

    assert_eq!(details.appointment.status, AppointmentStatus::Scheduled);
    assert_eq!(details.appointment.time_slot, "09:00");
    assert_eq!(details.patient.as_ref().unwrap().id, patient.id);
    assert_eq!(details.doctor.as_ref().unwrap().id, doctor.id);
    assert_eq!(details.doctor.as_ref().unwrap().name, "Dr. Sarah Smith");

    let schedule = h
        .service
        .get_doctor_schedule(doctor.id, when.date())
        .await
        .unwrap();
    let free: Vec<_> = schedule.available_slots.iter().map(|s| &s.time).collect();
    assert_eq!(free, ["10:00"]);
}

#[tokio::test]
async fn double_booking_is_rejected() {
    let h = harness();
    let when = in_a_month();
    let first = h.patient("john.doe@test.com").await;
    let second = h.patient("jane.doe@test.com").await;
    let doctor = h.doctor_with_slots(when.date(), &["09:00"]).await;

    h.service
        .create_appointment(booking(&first, &doctor, when, "09:00"))
        .await
        .unwrap();

    let err = h
        .service
        .create_appointment(booking(&second, &doctor, when, "09:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SlotUnavailable(_)), "{err:?}");
}

#[tokio::test]
async fn same_instant_in_another_offset_is_still_a_double_booking() {
    let h = harness();
    let when = in_a_month();
    let first = h.patient("john.doe@test.com").await;
    let second = h.patient("jane.doe@test.com").await;
    let doctor = h.doctor_with_slots(when.date(), &["09:00"]).await;

    h.service
        .create_appointment(booking(&first, &doctor, when, "09:00"))
        .await
        .unwrap();

    // The identical instant expressed in +05:30 may fall on a later civil
    // day in that offset; the booking day is the UTC day regardless.
    let shifted = when.to_offset(offset!(+5:30));
    assert_eq!(shifted, when);

    let err = h
        .service
        .create_appointment(booking(&second, &doctor, shifted, "09:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SlotUnavailable(_)), "{err:?}");

    // Even with a stale calendar flag, the store-level guard keys on the
    // same UTC day and still rejects the shifted duplicate.
    let mut drifted = h.stores.doctors.find_by_id(doctor.id).await.unwrap().unwrap();
    drifted.schedule.release_slot(when.date(), "09:00");
    h.stores
        .doctors
        .save_schedule(doctor.id, &drifted.schedule)
        .await
        .unwrap();

    let err = h
        .service
        .create_appointment(booking(&second, &doctor, shifted, "09:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BookingConflict(_)), "{err:?}");
}

#[tokio::test]
async fn uniqueness_guard_catches_calendar_drift() {
    let h = harness();
    let when = in_a_month();
    let first = h.patient("john.doe@test.com").await;
    let second = h.patient("jane.doe@test.com").await;
    let doctor = h.doctor_with_slots(when.date(), &["09:00"]).await;

    h.service
        .create_appointment(booking(&first, &doctor, when, "09:00"))
        .await
        .unwrap();

    // Simulate a stale calendar: the slot flag says available while a
    // non-cancelled appointment exists. The store-level guard must hold.
    let mut drifted = h.stores.doctors.find_by_id(doctor.id).await.unwrap().unwrap();
    drifted.schedule.release_slot(when.date(), "09:00");
    h.stores
        .doctors
        .save_schedule(doctor.id, &drifted.schedule)
        .await
        .unwrap();

    let err = h
        .service
        .create_appointment(booking(&second, &doctor, when, "09:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BookingConflict(_)), "{err:?}");
}

#[tokio::test]
async fn missing_patient_and_doctor_are_reported() {
    let h = harness();
    let when = in_a_month();
    let patient = h.patient("john.doe@test.com").await;
    let doctor = h.doctor_with_slots(when.date(), &["09:00"]).await;

    let mut no_patient = booking(&patient, &doctor, when, "09:00");
    no_patient.patient_id = Uuid::now_v7();
    let err = h.service.create_appointment(no_patient).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref msg) if msg == "Patient not found"));

    let mut no_doctor = booking(&patient, &doctor, when, "09:00");
    no_doctor.doctor_id = Uuid::now_v7();
    let err = h.service.create_appointment(no_doctor).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref msg) if msg == "Doctor not found"));
}

#[tokio::test]
async fn inactive_doctor_cannot_be_booked() {
    let h = harness();
    let when = in_a_month();
    let patient = h.patient("john.doe@test.com").await;
    let doctor = h.doctor_with_slots(when.date(), &["09:00"]).await;
    h.store.deactivate_doctor(doctor.id).await;

    let err = h
        .service
        .create_appointment(booking(&patient, &doctor, when, "09:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InactiveResource(_)), "{err:?}");
}

#[tokio::test]
async fn past_date_fails_before_any_slot_lookup() {
    let h = harness();
    let patient = h.patient("john.doe@test.com").await;
    let doctor = h
        .doctor_with_slots(in_a_month().date(), &["09:00"])
        .await;

    // No schedule exists for yesterday; the date check must fire first.
    let yesterday = OffsetDateTime::now_utc() - Duration::days(1);
    let err = h
        .service
        .create_appointment(booking(&patient, &doctor, yesterday, "09:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{err:?}");
}

#[tokio::test]
async fn short_reason_is_rejected() {
    let h = harness();
    let when = in_a_month();
    let patient = h.patient("john.doe@test.com").await;
    let doctor = h.doctor_with_slots(when.date(), &["09:00"]).await;

    let mut request = booking(&patient, &doctor, when, "09:00");
    request.reason = "checkup".to_string();
    let err = h.service.create_appointment(request).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{err:?}");
}

#[tokio::test]
async fn unknown_slot_is_unavailable() {
    let h = harness();
    let when = in_a_month();
    let patient = h.patient("john.doe@test.com").await;
    let doctor = h.doctor_with_slots(when.date(), &["09:00"]).await;

    let err = h
        .service
        .create_appointment(booking(&patient, &doctor, when, "15:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SlotUnavailable(_)), "{err:?}");
}

#[tokio::test]
async fn cancel_frees_the_slot_for_rebooking() {
    let h = harness();
    let when = in_a_month();
    let first = h.patient("john.doe@test.com").await;
    let second = h.patient("jane.doe@test.com").await;
    let doctor = h.doctor_with_slots(when.date(), &["09:00"]).await;

    let details = h
        .service
        .create_appointment(booking(&first, &doctor, when, "09:00"))
        .await
        .unwrap();

    let cancelled = h
        .service
        .cancel_appointment(
            details.appointment.id,
            "Patient unavailable".to_string(),
            CancelledBy::Patient,
        )
        .await
        .unwrap();
    assert_eq!(cancelled.appointment.status, AppointmentStatus::Cancelled);
    assert_eq!(
        cancelled.appointment.cancellation_reason.as_deref(),
        Some("Patient unavailable")
    );
    assert_eq!(
        cancelled.appointment.cancelled_by,
        Some(CancelledBy::Patient)
    );
    assert!(cancelled.appointment.cancelled_at.is_some());

    let schedule = h
        .service
        .get_doctor_schedule(doctor.id, when.date())
        .await
        .unwrap();
    assert!(schedule.available_slots.iter().any(|s| s.time == "09:00"));

    // The freed slot can be booked again.
    let rebooked = h
        .service
        .create_appointment(booking(&second, &doctor, when, "09:00"))
        .await
        .unwrap();
    assert_eq!(rebooked.appointment.status, AppointmentStatus::Scheduled);
}

#[tokio::test]
async fn cancel_guards_terminal_states() {
    let h = harness();
    let when = in_a_month();
    let patient = h.patient("john.doe@test.com").await;
    let doctor = h.doctor_with_slots(when.date(), &["09:00", "10:00"]).await;

    let details = h
        .service
        .create_appointment(booking(&patient, &doctor, when, "09:00"))
        .await
        .unwrap();
    let id = details.appointment.id;

    h.service
        .cancel_appointment(id, "First cancellation".to_string(), CancelledBy::Patient)
        .await
        .unwrap();
    let err = h
        .service
        .cancel_appointment(id, "Second cancellation".to_string(), CancelledBy::Patient)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyCancelled(_)), "{err:?}");

    // Drive a second appointment to Completed and try to cancel it.
    let details = h
        .service
        .create_appointment(booking(&patient, &doctor, when, "10:00"))
        .await
        .unwrap();
    let id = details.appointment.id;
    for status in [
        AppointmentStatus::Confirmed,
        AppointmentStatus::InProgress,
        AppointmentStatus::Completed,
    ] {
        h.service
            .update_appointment(
                id,
                UpdateAppointmentPayload {
                    status: Some(status),
                    diagnosis: None,
                    prescription: None,
                    notes: None,
                    follow_up_required: None,
                    follow_up_date: None,
                    payment_id: None,
                },
            )
            .await
            .unwrap();
    }

    let schedule_before = h
        .service
        .get_doctor_schedule(doctor.id, when.date())
        .await
        .unwrap();

    let err = h
        .service
        .cancel_appointment(id, "Too late".to_string(), CancelledBy::Admin)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "{err:?}");

    // A rejected cancellation must not mutate the calendar.
    let schedule_after = h
        .service
        .get_doctor_schedule(doctor.id, when.date())
        .await
        .unwrap();
    assert_eq!(
        schedule_before.available_slots, schedule_after.available_slots
    );
}

#[tokio::test]
async fn cancel_missing_appointment_is_not_found() {
    let h = harness();
    let err = h
        .service
        .cancel_appointment(
            Uuid::now_v7(),
            "No such appointment".to_string(),
            CancelledBy::Patient,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "{err:?}");
}

#[tokio::test]
async fn reschedule_cancels_old_and_books_new() {
    let h = harness();
    let when = in_a_month();
    let next_day = when + Duration::days(1);
    let patient = h.patient("john.doe@test.com").await;
    let doctor = h.doctor_with_slots(when.date(), &["09:00"]).await;
    h.service
        .add_doctor_schedule(doctor.id, next_day.date(), vec!["10:00".to_string()])
        .await
        .unwrap();

    let original = h
        .service
        .create_appointment(booking(&patient, &doctor, when, "09:00"))
        .await
        .unwrap();

    let replacement = h
        .service
        .reschedule_appointment(original.appointment.id, next_day, "10:00".to_string())
        .await
        .unwrap();

    assert_ne!(replacement.appointment.id, original.appointment.id);
    assert_eq!(replacement.appointment.status, AppointmentStatus::Scheduled);
    assert_eq!(replacement.appointment.time_slot, "10:00");
    assert_eq!(replacement.appointment.reason, original.appointment.reason);

    let old = h
        .service
        .get_appointment(original.appointment.id)
        .await
        .unwrap();
    assert_eq!(old.appointment.status, AppointmentStatus::Cancelled);
    assert_eq!(
        old.appointment.cancellation_reason.as_deref(),
        Some("Rescheduled")
    );

    // Old slot is free again, new slot is taken.
    let old_day = h
        .service
        .get_doctor_schedule(doctor.id, when.date())
        .await
        .unwrap();
    assert!(old_day.available_slots.iter().any(|s| s.time == "09:00"));
    let new_day = h
        .service
        .get_doctor_schedule(doctor.id, next_day.date())
        .await
        .unwrap();
    assert!(new_day.available_slots.is_empty());
}

#[tokio::test]
async fn update_enforces_the_state_machine() {
    let h = harness();
    let when = in_a_month();
    let patient = h.patient("john.doe@test.com").await;
    let doctor = h.doctor_with_slots(when.date(), &["09:00"]).await;

    let details = h
        .service
        .create_appointment(booking(&patient, &doctor, when, "09:00"))
        .await
        .unwrap();
    let id = details.appointment.id;

    // Scheduled cannot skip straight to Completed.
    let err = h
        .service
        .update_appointment(
            id,
            UpdateAppointmentPayload {
                status: Some(AppointmentStatus::Completed),
                diagnosis: None,
                prescription: None,
                notes: None,
                follow_up_required: None,
                follow_up_date: None,
                payment_id: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "{err:?}");

    // Cancellation goes through its own operation.
    let err = h
        .service
        .update_appointment(
            id,
            UpdateAppointmentPayload {
                status: Some(AppointmentStatus::Cancelled),
                diagnosis: None,
                prescription: None,
                notes: None,
                follow_up_required: None,
                follow_up_date: None,
                payment_id: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "{err:?}");

    let confirmed = h
        .service
        .update_appointment(
            id,
            UpdateAppointmentPayload {
                status: Some(AppointmentStatus::Confirmed),
                diagnosis: None,
                prescription: None,
                notes: Some("Patient arrived on time".to_string()),
                follow_up_required: None,
                follow_up_date: None,
                payment_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(confirmed.appointment.status, AppointmentStatus::Confirmed);
    assert_eq!(
        confirmed.appointment.notes.as_deref(),
        Some("Patient arrived on time")
    );
}

#[tokio::test]
async fn administrative_backfill_skips_slot_booking() {
    let h = harness();
    let when = in_a_month();
    let patient = h.patient("john.doe@test.com").await;
    let doctor = h.doctor_with_slots(when.date(), &["09:00"]).await;

    let mut request = booking(&patient, &doctor, when, "15:00");
    request.status = Some(AppointmentStatus::Cancelled);
    // The slot does not exist, yet a Cancelled backfill record is accepted.
    let details = h.service.create_appointment(request).await.unwrap();
    assert_eq!(details.appointment.status, AppointmentStatus::Cancelled);

    // The calendar is untouched.
    let schedule = h
        .service
        .get_doctor_schedule(doctor.id, when.date())
        .await
        .unwrap();
    assert_eq!(schedule.available_slots.len(), 1);
}

#[tokio::test]
async fn upcoming_and_history_partition_appointments() {
    let h = harness();
    let when = in_a_month();
    let later = when + Duration::days(1);
    let patient = h.patient("john.doe@test.com").await;
    let doctor = h.doctor_with_slots(when.date(), &["09:00"]).await;
    h.service
        .add_doctor_schedule(doctor.id, later.date(), vec!["10:00".to_string()])
        .await
        .unwrap();

    let kept = h
        .service
        .create_appointment(booking(&patient, &doctor, later, "10:00"))
        .await
        .unwrap();
    let dropped = h
        .service
        .create_appointment(booking(&patient, &doctor, when, "09:00"))
        .await
        .unwrap();
    h.service
        .cancel_appointment(
            dropped.appointment.id,
            "Patient unavailable".to_string(),
            CancelledBy::Patient,
        )
        .await
        .unwrap();

    let upcoming = h.service.get_upcoming_appointments(patient.id).await.unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].appointment.id, kept.appointment.id);

    let history = h.service.get_appointment_history(patient.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].appointment.id, dropped.appointment.id);
    assert_eq!(history[0].appointment.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn list_filters_compose() {
    let h = harness();
    let when = in_a_month();
    let patient = h.patient("john.doe@test.com").await;
    let other = h.patient("jane.doe@test.com").await;
    let doctor = h.doctor_with_slots(when.date(), &["09:00", "10:00"]).await;

    h.service
        .create_appointment(booking(&patient, &doctor, when, "09:00"))
        .await
        .unwrap();
    h.service
        .create_appointment(booking(&other, &doctor, when, "10:00"))
        .await
        .unwrap();

    let all = h
        .service
        .get_all_appointments(AppointmentFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let filtered = h
        .service
        .get_all_appointments(AppointmentFilter {
            patient_id: Some(patient.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].appointment.patient_id, patient.id);

    let scheduled = h
        .service
        .get_all_appointments(AppointmentFilter {
            statuses: Some(vec![AppointmentStatus::Scheduled]),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(scheduled.len(), 2);
}

#[tokio::test]
async fn duplicate_day_schedule_is_a_validation_error() {
    let h = harness();
    let when = in_a_month();
    let doctor = h.doctor_with_slots(when.date(), &["09:00"]).await;

    let err = h
        .service
        .add_doctor_schedule(doctor.id, when.date(), vec!["11:00".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{err:?}");
}

#[tokio::test]
async fn schedule_for_unconfigured_date_is_empty() {
    let h = harness();
    let when = in_a_month();
    let doctor = h.doctor_with_slots(when.date(), &["09:00"]).await;

    let other_day = (when + Duration::days(10)).date();
    let schedule = h
        .service
        .get_doctor_schedule(doctor.id, other_day)
        .await
        .unwrap();
    assert!(schedule.available_slots.is_empty());
}

#[tokio::test]
async fn lifecycle_operations_leave_an_audit_trail() {
    let h = harness();
    let when = in_a_month();
    let patient = h.patient("john.doe@test.com").await;
    let doctor = h.doctor_with_slots(when.date(), &["09:00"]).await;

    let details = h
        .service
        .create_appointment(booking(&patient, &doctor, when, "09:00"))
        .await
        .unwrap();
    h.service
        .cancel_appointment(
            details.appointment.id,
            "Patient unavailable".to_string(),
            CancelledBy::Patient,
        )
        .await
        .unwrap();
    // A failed create is audited too.
    let _ = h
        .service
        .create_appointment(booking(&patient, &doctor, when, "15:00"))
        .await
        .unwrap_err();

    let trail = h.store.audit_entries().await;
    assert_eq!(trail.len(), 3);
    assert_eq!(trail[0].severity, AuditSeverity::Low);
    assert_eq!(trail[0].status, AuditStatus::Success);
    assert_eq!(trail[1].severity, AuditSeverity::Medium);
    assert_eq!(trail[2].status, AuditStatus::Failed);
    assert!(trail[2].error_message.is_some());
}

#[tokio::test]
async fn delete_removes_the_record() {
    let h = harness();
    let when = in_a_month();
    let patient = h.patient("john.doe@test.com").await;
    let doctor = h.doctor_with_slots(when.date(), &["09:00"]).await;

    let details = h
        .service
        .create_appointment(booking(&patient, &doctor, when, "09:00"))
        .await
        .unwrap();
    h.service
        .delete_appointment(details.appointment.id)
        .await
        .unwrap();

    let err = h
        .service
        .get_appointment(details.appointment.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "{err:?}");
}
