use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::error::DatabaseError;
use crate::db::models::{Doctor, DoctorCalendar, NewDoctor};

use super::DoctorRepository;

pub struct PgDoctorRepository {
    pool: PgPool,
}

impl PgDoctorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DoctorRepository for PgDoctorRepository {
    async fn insert(&self, new_doctor: &NewDoctor) -> Result<Doctor, DatabaseError> {
        let doctor = sqlx::query_as::<_, Doctor>(
            r#"
            INSERT INTO doctors
                (id, first_name, last_name, email, phone, specialty, license_number,
                 consultation_fee, hospital_affiliation, schedule, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, TRUE)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&new_doctor.first_name)
        .bind(&new_doctor.last_name)
        .bind(new_doctor.email.to_lowercase())
        .bind(&new_doctor.phone)
        .bind(&new_doctor.specialty)
        .bind(&new_doctor.license_number)
        .bind(new_doctor.consultation_fee)
        .bind(&new_doctor.hospital_affiliation)
        .bind(Json(DoctorCalendar::default()))
        .fetch_one(&self.pool)
        .await?;

        Ok(doctor)
    }

    async fn find_by_id(&self, doctor_id: Uuid) -> Result<Option<Doctor>, DatabaseError> {
        let doctor = sqlx::query_as::<_, Doctor>("SELECT * FROM doctors WHERE id = $1")
            .bind(doctor_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(doctor)
    }

    async fn list(&self) -> Result<Vec<Doctor>, DatabaseError> {
        let doctors =
            sqlx::query_as::<_, Doctor>("SELECT * FROM doctors ORDER BY last_name, first_name")
                .fetch_all(&self.pool)
                .await?;

        Ok(doctors)
    }

    async fn save_schedule(
        &self,
        doctor_id: Uuid,
        schedule: &DoctorCalendar,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE doctors SET schedule = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(Json(schedule))
        .bind(doctor_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }
}
