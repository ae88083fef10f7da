use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::error::DatabaseError;
use crate::db::models::{Appointment, AppointmentFilter};

use super::AppointmentRepository;

pub struct PgAppointmentRepository {
    pool: PgPool,
}

impl PgAppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AppointmentRepository for PgAppointmentRepository {
    async fn insert(&self, appointment: &Appointment) -> Result<(), DatabaseError> {
        // The partial unique index on (doctor_id, day, time_slot) for
        // non-cancelled rows surfaces here as DatabaseError::Duplicate.
        sqlx::query(
            r#"
            INSERT INTO appointments
                (id, patient_id, doctor_id, appointment_date, time_slot, reason, symptoms,
                 appointment_type, status, cancellation_reason, cancelled_at, cancelled_by,
                 diagnosis, prescription, notes, follow_up_required, follow_up_date,
                 payment_id, booking_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    $13, $14, $15, $16, $17, $18, $19, $20, $21)
            "#,
        )
        .bind(appointment.id)
        .bind(appointment.patient_id)
        .bind(appointment.doctor_id)
        .bind(appointment.appointment_date)
        .bind(&appointment.time_slot)
        .bind(&appointment.reason)
        .bind(&appointment.symptoms)
        .bind(appointment.appointment_type)
        .bind(appointment.status)
        .bind(&appointment.cancellation_reason)
        .bind(appointment.cancelled_at)
        .bind(appointment.cancelled_by)
        .bind(&appointment.diagnosis)
        .bind(&appointment.prescription)
        .bind(&appointment.notes)
        .bind(appointment.follow_up_required)
        .bind(appointment.follow_up_date)
        .bind(appointment.payment_id)
        .bind(appointment.booking_date)
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<Appointment>, DatabaseError> {
        let appointment =
            sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
                .bind(appointment_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(appointment)
    }

    async fn update(&self, appointment: &Appointment) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE appointments SET
                appointment_date = $1,
                time_slot = $2,
                reason = $3,
                symptoms = $4,
                appointment_type = $5,
                status = $6,
                cancellation_reason = $7,
                cancelled_at = $8,
                cancelled_by = $9,
                diagnosis = $10,
                prescription = $11,
                notes = $12,
                follow_up_required = $13,
                follow_up_date = $14,
                payment_id = $15,
                updated_at = NOW()
            WHERE id = $16
            "#,
        )
        .bind(appointment.appointment_date)
        .bind(&appointment.time_slot)
        .bind(&appointment.reason)
        .bind(&appointment.symptoms)
        .bind(appointment.appointment_type)
        .bind(appointment.status)
        .bind(&appointment.cancellation_reason)
        .bind(appointment.cancelled_at)
        .bind(appointment.cancelled_by)
        .bind(&appointment.diagnosis)
        .bind(&appointment.prescription)
        .bind(&appointment.notes)
        .bind(appointment.follow_up_required)
        .bind(appointment.follow_up_date)
        .bind(appointment.payment_id)
        .bind(appointment.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(appointment_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    async fn find(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, DatabaseError> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM appointments WHERE TRUE");

        if let Some(patient_id) = filter.patient_id {
            query.push(" AND patient_id = ").push_bind(patient_id);
        }
        if let Some(doctor_id) = filter.doctor_id {
            query.push(" AND doctor_id = ").push_bind(doctor_id);
        }
        if let Some(statuses) = &filter.statuses {
            query.push(" AND status IN (");
            let mut separated = query.separated(", ");
            for status in statuses {
                separated.push_bind(*status);
            }
            query.push(")");
        }
        if let Some(from_date) = filter.from_date {
            query.push(" AND appointment_date >= ").push_bind(from_date);
        }
        if let Some(to_date) = filter.to_date {
            query.push(" AND appointment_date <= ").push_bind(to_date);
        }
        query.push(if filter.ascending {
            " ORDER BY appointment_date ASC"
        } else {
            " ORDER BY appointment_date DESC"
        });

        let appointments = query
            .build_query_as::<Appointment>()
            .fetch_all(&self.pool)
            .await?;

        Ok(appointments)
    }
}
