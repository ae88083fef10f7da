use serde::Serialize;
use serde_json::json;
use time::{Date, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::{
    booking_day, ActorType, Appointment, AppointmentFilter, AppointmentRepository,
    AppointmentStatus, AuditAction, AuditSeverity, CancelledBy, DatabaseError, DoctorRepository,
    DoctorSummary, NewAppointment, NewAuditLog, PatientRepository, PatientSummary, ScheduleError,
    Slot, Stores, UpdateAppointmentPayload,
};
use crate::error::{AppError, AppResult};

use super::audit::AuditSink;

/// An appointment populated with patient and doctor summaries, the shape
/// the controller layer returns to callers.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient: Option<PatientSummary>,
    pub doctor: Option<DoctorSummary>,
}

#[derive(Debug, Serialize)]
pub struct DoctorScheduleView {
    pub doctor: DoctorSummary,
    pub date: Date,
    pub available_slots: Vec<Slot>,
}

/// Booking orchestrator. Validates cross-entity preconditions, drives the
/// appointment lifecycle, keeps the doctor's availability calendar in step
/// and emits audit entries for every mutation.
///
/// Consistency model: the non-cancelled uniqueness guard at the appointment
/// store is the authoritative double-booking defense. The calendar's
/// `is_available` flag is a best-effort projection of it; flips that fail
/// after the record is persisted are logged and tolerated.
#[derive(Clone)]
pub struct AppointmentService {
    stores: Stores,
    audit: AuditSink,
}

impl AppointmentService {
    pub fn new(stores: Stores) -> Self {
        let audit = AuditSink::new(stores.audit_logs.clone());
        Self { stores, audit }
    }

    pub async fn create_appointment(&self, data: NewAppointment) -> AppResult<AppointmentDetails> {
        match self.try_create(&data).await {
            Ok(details) => {
                let patient_name = details.patient.as_ref().map(|p| p.name.clone());
                self.audit
                    .record(
                        NewAuditLog::success(
                            AuditAction::AppointmentCreated,
                            ActorType::Patient,
                            AuditSeverity::Low,
                        )
                        .performed_by(data.patient_id, patient_name)
                        .entity(details.appointment.id)
                        .details(json!({
                            "doctor_id": details.appointment.doctor_id,
                            "appointment_date": details.appointment.appointment_date,
                            "time_slot": details.appointment.time_slot,
                        })),
                    )
                    .await;
                Ok(details)
            }
            Err(err) => {
                self.audit
                    .record(
                        NewAuditLog::failure(
                            AuditAction::AppointmentCreated,
                            ActorType::Patient,
                            AuditSeverity::Medium,
                            err.to_string(),
                        )
                        .performed_by(data.patient_id, None)
                        .details(json!({
                            "doctor_id": data.doctor_id,
                            "appointment_date": data.appointment_date,
                            "time_slot": data.time_slot,
                        })),
                    )
                    .await;
                Err(err)
            }
        }
    }

    async fn try_create(&self, data: &NewAppointment) -> AppResult<AppointmentDetails> {
        data.validate()
            .map_err(|err| AppError::Validation(err.to_string()))?;

        if data.appointment_date <= OffsetDateTime::now_utc() {
            return Err(AppError::Validation(
                "Appointment date must be in the future".to_string(),
            ));
        }

        let patient = self
            .stores
            .patients
            .find_by_id(data.patient_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))?;

        let mut doctor = self
            .stores
            .doctors
            .find_by_id(data.doctor_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Doctor not found".to_string()))?;
        if !doctor.is_active {
            return Err(AppError::InactiveResource(
                "Doctor is not accepting appointments".to_string(),
            ));
        }

        let status = data.status.unwrap_or(AppointmentStatus::Scheduled);
        let day = booking_day(data.appointment_date);

        // Administrative backfill of a Cancelled record skips the slot check.
        if status != AppointmentStatus::Cancelled {
            let available = doctor.schedule.available_slots(day);
            if !available.iter().any(|slot| slot.time == data.time_slot) {
                return Err(AppError::SlotUnavailable(
                    "Selected time slot is not available".to_string(),
                ));
            }
        }

        let now = OffsetDateTime::now_utc();
        let appointment = Appointment {
            id: Uuid::now_v7(),
            patient_id: patient.id,
            doctor_id: doctor.id,
            appointment_date: data.appointment_date,
            time_slot: data.time_slot.clone(),
            reason: data.reason.clone(),
            symptoms: data.symptoms.clone(),
            appointment_type: data.appointment_type,
            status,
            cancellation_reason: None,
            cancelled_at: None,
            cancelled_by: None,
            diagnosis: None,
            prescription: None,
            notes: None,
            follow_up_required: false,
            follow_up_date: None,
            payment_id: None,
            booking_date: now,
            created_at: now,
            updated_at: now,
        };

        // The uniqueness guard is the last line of defense against a
        // concurrent create that slipped past the availability check.
        self.stores
            .appointments
            .insert(&appointment)
            .await
            .map_err(|err| match err {
                DatabaseError::Duplicate => AppError::BookingConflict(
                    "This time slot was just booked by another patient".to_string(),
                ),
                other => other.into(),
            })?;

        // Best-effort projection: a failed flip leaves the record standing,
        // the unique guard still prevents a second booking.
        if matches!(
            appointment.status,
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
        ) {
            match doctor.schedule.book_slot(day, &appointment.time_slot) {
                Ok(_) => {
                    if let Err(err) = self
                        .stores
                        .doctors
                        .save_schedule(doctor.id, &doctor.schedule)
                        .await
                    {
                        warn!(
                            appointment_id = %appointment.id,
                            "Failed to persist slot reservation: {}", err
                        );
                    }
                }
                Err(err) => {
                    warn!(
                        appointment_id = %appointment.id,
                        "Failed to reserve calendar slot: {}", err
                    );
                }
            }
        }

        info!(
            appointment_id = %appointment.id,
            doctor_id = %doctor.id,
            time_slot = %appointment.time_slot,
            "Appointment booked"
        );

        Ok(AppointmentDetails {
            patient: Some((&patient).into()),
            doctor: Some((&doctor).into()),
            appointment,
        })
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        reason: String,
        cancelled_by: CancelledBy,
    ) -> AppResult<AppointmentDetails> {
        let mut appointment = self
            .stores
            .appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;

        self.cancel_record(&mut appointment, reason.clone(), cancelled_by)
            .await?;

        self.audit
            .record(
                NewAuditLog::success(
                    AuditAction::AppointmentCancelled,
                    cancelled_by.into(),
                    AuditSeverity::Medium,
                )
                .performed_by(appointment.patient_id, None)
                .entity(appointment.id)
                .details(json!({ "reason": reason, "cancelled_by": cancelled_by })),
            )
            .await;

        self.populate(appointment).await
    }

    /// Cancels in place and releases the calendar slot. The appointment
    /// record is authoritative; a missed slot release is logged, not fatal.
    async fn cancel_record(
        &self,
        appointment: &mut Appointment,
        reason: String,
        cancelled_by: CancelledBy,
    ) -> AppResult<()> {
        match appointment.status {
            AppointmentStatus::Cancelled => {
                return Err(AppError::AlreadyCancelled(
                    "Appointment is already cancelled".to_string(),
                ))
            }
            AppointmentStatus::Completed => {
                return Err(AppError::InvalidState(
                    "Cannot cancel a completed appointment".to_string(),
                ))
            }
            status if !status.can_transition_to(AppointmentStatus::Cancelled) => {
                return Err(AppError::InvalidState(format!(
                    "Cannot cancel an appointment in status {:?}",
                    status
                )))
            }
            _ => {}
        }

        appointment.status = AppointmentStatus::Cancelled;
        appointment.cancellation_reason = Some(reason);
        appointment.cancelled_at = Some(OffsetDateTime::now_utc());
        appointment.cancelled_by = Some(cancelled_by);
        self.stores.appointments.update(appointment).await?;

        let day = booking_day(appointment.appointment_date);
        match self.stores.doctors.find_by_id(appointment.doctor_id).await {
            Ok(Some(mut doctor)) => {
                doctor.schedule.release_slot(day, &appointment.time_slot);
                if let Err(err) = self
                    .stores
                    .doctors
                    .save_schedule(doctor.id, &doctor.schedule)
                    .await
                {
                    warn!(
                        appointment_id = %appointment.id,
                        "Failed to persist slot release: {}", err
                    );
                }
            }
            Ok(None) => {
                warn!(
                    appointment_id = %appointment.id,
                    doctor_id = %appointment.doctor_id,
                    "Doctor no longer exists, slot release skipped"
                );
            }
            Err(err) => {
                warn!(
                    appointment_id = %appointment.id,
                    "Failed to load doctor for slot release: {}", err
                );
            }
        }

        info!(appointment_id = %appointment.id, "Appointment cancelled");
        Ok(())
    }

    /// Reschedule is cancel-then-create: the original record is cancelled
    /// with reason "Rescheduled" and a fresh record is booked at the new
    /// date and slot. The two records stay linked through the audit detail.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        new_date: OffsetDateTime,
        new_time_slot: String,
    ) -> AppResult<AppointmentDetails> {
        let mut appointment = self
            .stores
            .appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;

        let old_date = appointment.appointment_date;
        let old_time_slot = appointment.time_slot.clone();

        self.cancel_record(
            &mut appointment,
            "Rescheduled".to_string(),
            CancelledBy::Patient,
        )
        .await?;

        let replacement = NewAppointment {
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            appointment_date: new_date,
            time_slot: new_time_slot.clone(),
            reason: appointment.reason.clone(),
            symptoms: appointment.symptoms.clone(),
            appointment_type: appointment.appointment_type,
            status: None,
        };

        let details = match self.try_create(&replacement).await {
            Ok(details) => details,
            Err(err) => {
                // The old record is already cancelled at this point; the
                // caller has to book again explicitly.
                warn!(
                    appointment_id = %appointment_id,
                    "Reschedule failed after cancellation: {}", err
                );
                return Err(err);
            }
        };

        self.audit
            .record(
                NewAuditLog::success(
                    AuditAction::AppointmentUpdated,
                    ActorType::Patient,
                    AuditSeverity::Low,
                )
                .performed_by(appointment.patient_id, None)
                .entity(details.appointment.id)
                .details(json!({
                    "old_appointment_id": appointment_id,
                    "old_date": old_date,
                    "old_time_slot": old_time_slot,
                    "new_date": new_date,
                    "new_time_slot": new_time_slot,
                })),
            )
            .await;

        Ok(details)
    }

    /// Admin field edits. A status change must follow the lifecycle state
    /// machine; cancellation has its own operation.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        payload: UpdateAppointmentPayload,
    ) -> AppResult<AppointmentDetails> {
        payload
            .validate()
            .map_err(|err| AppError::Validation(err.to_string()))?;

        let mut appointment = self
            .stores
            .appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;

        if let Some(new_status) = payload.status {
            if new_status == AppointmentStatus::Cancelled {
                return Err(AppError::InvalidState(
                    "Use the cancel operation to cancel an appointment".to_string(),
                ));
            }
            if new_status != appointment.status {
                if !appointment.status.can_transition_to(new_status) {
                    return Err(AppError::InvalidState(format!(
                        "Cannot move appointment from {:?} to {:?}",
                        appointment.status, new_status
                    )));
                }
                appointment.status = new_status;
            }
        }

        if let Some(diagnosis) = payload.diagnosis {
            appointment.diagnosis = Some(diagnosis);
        }
        if let Some(prescription) = payload.prescription {
            appointment.prescription = Some(prescription);
        }
        if let Some(notes) = payload.notes {
            appointment.notes = Some(notes);
        }
        if let Some(follow_up_required) = payload.follow_up_required {
            appointment.follow_up_required = follow_up_required;
        }
        if let Some(follow_up_date) = payload.follow_up_date {
            appointment.follow_up_date = Some(follow_up_date);
        }
        if let Some(payment_id) = payload.payment_id {
            appointment.payment_id = Some(payment_id);
        }

        self.stores.appointments.update(&appointment).await?;

        self.audit
            .record(
                NewAuditLog::success(
                    AuditAction::AppointmentUpdated,
                    ActorType::Admin,
                    AuditSeverity::Low,
                )
                .entity(appointment.id)
                .details(json!({ "status": appointment.status })),
            )
            .await;

        self.populate(appointment).await
    }

    pub async fn delete_appointment(&self, appointment_id: Uuid) -> AppResult<()> {
        let appointment = self
            .stores
            .appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;

        self.stores.appointments.delete(appointment_id).await?;

        self.audit
            .record(
                NewAuditLog::success(
                    AuditAction::AppointmentCancelled,
                    ActorType::Admin,
                    AuditSeverity::High,
                )
                .entity(appointment_id)
                .details(serde_json::to_value(&appointment).unwrap_or_default()),
            )
            .await;

        Ok(())
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> AppResult<AppointmentDetails> {
        let appointment = self
            .stores
            .appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;

        self.populate(appointment).await
    }

    pub async fn get_all_appointments(
        &self,
        filter: AppointmentFilter,
    ) -> AppResult<Vec<AppointmentDetails>> {
        let appointments = self.stores.appointments.find(&filter).await?;
        self.populate_all(appointments).await
    }

    /// Future appointments still on the books, soonest first.
    pub async fn get_upcoming_appointments(
        &self,
        patient_id: Uuid,
    ) -> AppResult<Vec<AppointmentDetails>> {
        let filter = AppointmentFilter {
            patient_id: Some(patient_id),
            from_date: Some(OffsetDateTime::now_utc()),
            statuses: Some(vec![
                AppointmentStatus::Scheduled,
                AppointmentStatus::Confirmed,
            ]),
            ascending: true,
            ..Default::default()
        };
        let appointments = self.stores.appointments.find(&filter).await?;
        self.populate_all(appointments).await
    }

    /// Settled appointments, most recent first.
    pub async fn get_appointment_history(
        &self,
        patient_id: Uuid,
    ) -> AppResult<Vec<AppointmentDetails>> {
        let filter = AppointmentFilter {
            patient_id: Some(patient_id),
            statuses: Some(vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ]),
            ..Default::default()
        };
        let appointments = self.stores.appointments.find(&filter).await?;
        self.populate_all(appointments).await
    }

    pub async fn get_doctor_schedule(
        &self,
        doctor_id: Uuid,
        date: Date,
    ) -> AppResult<DoctorScheduleView> {
        let doctor = self
            .stores
            .doctors
            .find_by_id(doctor_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Doctor not found".to_string()))?;

        Ok(DoctorScheduleView {
            available_slots: doctor.schedule.available_slots(date),
            doctor: (&doctor).into(),
            date,
        })
    }

    /// Configure a new day of slots for a doctor, all initially available.
    pub async fn add_doctor_schedule(
        &self,
        doctor_id: Uuid,
        date: Date,
        times: Vec<String>,
    ) -> AppResult<DoctorScheduleView> {
        let mut doctor = self
            .stores
            .doctors
            .find_by_id(doctor_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Doctor not found".to_string()))?;

        doctor
            .schedule
            .add_day_schedule(date, times)
            .map_err(|err: ScheduleError| AppError::Validation(err.to_string()))?;

        self.stores
            .doctors
            .save_schedule(doctor.id, &doctor.schedule)
            .await?;

        Ok(DoctorScheduleView {
            available_slots: doctor.schedule.available_slots(date),
            doctor: (&doctor).into(),
            date,
        })
    }

    async fn populate(&self, appointment: Appointment) -> AppResult<AppointmentDetails> {
        let patient = self.stores.patients.find_by_id(appointment.patient_id).await?;
        let doctor = self.stores.doctors.find_by_id(appointment.doctor_id).await?;

        Ok(AppointmentDetails {
            patient: patient.as_ref().map(Into::into),
            doctor: doctor.as_ref().map(Into::into),
            appointment,
        })
    }

    async fn populate_all(
        &self,
        appointments: Vec<Appointment>,
    ) -> AppResult<Vec<AppointmentDetails>> {
        let mut details = Vec::with_capacity(appointments.len());
        for appointment in appointments {
            details.push(self.populate(appointment).await?);
        }
        Ok(details)
    }
}
