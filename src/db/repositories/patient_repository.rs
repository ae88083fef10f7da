use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::error::DatabaseError;
use crate::db::models::{NewPatient, Patient};

use super::PatientRepository;

pub struct PgPatientRepository {
    pool: PgPool,
}

impl PgPatientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PatientRepository for PgPatientRepository {
    async fn insert(&self, new_patient: &NewPatient) -> Result<Patient, DatabaseError> {
        let patient = sqlx::query_as::<_, Patient>(
            r#"
            INSERT INTO patients
                (id, first_name, last_name, email, phone, date_of_birth, gender, health_card_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&new_patient.first_name)
        .bind(&new_patient.last_name)
        .bind(new_patient.email.to_lowercase())
        .bind(&new_patient.phone)
        .bind(new_patient.date_of_birth)
        .bind(&new_patient.gender)
        .bind(&new_patient.health_card_number)
        .fetch_one(&self.pool)
        .await?;

        Ok(patient)
    }

    async fn find_by_id(&self, patient_id: Uuid) -> Result<Option<Patient>, DatabaseError> {
        let patient = sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = $1")
            .bind(patient_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(patient)
    }

    async fn list(&self) -> Result<Vec<Patient>, DatabaseError> {
        let patients =
            sqlx::query_as::<_, Patient>("SELECT * FROM patients ORDER BY last_name, first_name")
                .fetch_all(&self.pool)
                .await?;

        Ok(patients)
    }
}
