use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::{Date, OffsetDateTime};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "gender", rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: Date,
    pub gender: Gender,
    pub health_card_number: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    pub phone: String,
    pub date_of_birth: Date,
    pub gender: Gender,
    pub health_card_number: Option<String>,
}

/// Summary fields exposed when an appointment is populated for a caller.
#[derive(Debug, Clone, Serialize)]
pub struct PatientSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub health_card_number: Option<String>,
}

impl From<&Patient> for PatientSummary {
    fn from(patient: &Patient) -> Self {
        Self {
            id: patient.id,
            name: patient.full_name(),
            email: patient.email.clone(),
            phone: patient.phone.clone(),
            health_card_number: patient.health_card_number.clone(),
        }
    }
}
