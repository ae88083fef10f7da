use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Uuid;
use time::OffsetDateTime;

use super::CancelledBy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "audit_action", rename_all = "snake_case")]
pub enum AuditAction {
    AppointmentCreated,
    AppointmentUpdated,
    AppointmentCancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "actor_type", rename_all = "snake_case")]
pub enum ActorType {
    Patient,
    Doctor,
    Admin,
    System,
}

impl From<CancelledBy> for ActorType {
    fn from(cancelled_by: CancelledBy) -> Self {
        match cancelled_by {
            CancelledBy::Patient => ActorType::Patient,
            CancelledBy::Doctor => ActorType::Doctor,
            CancelledBy::Admin => ActorType::Admin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "audit_severity", rename_all = "snake_case")]
pub enum AuditSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "audit_status", rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Failed,
    Warning,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub action: AuditAction,
    pub performed_by_id: Option<Uuid>,
    pub performed_by_type: ActorType,
    pub performed_by_name: Option<String>,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub details: Value,
    pub severity: AuditSeverity,
    pub status: AuditStatus,
    pub error_message: Option<String>,
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub action: AuditAction,
    pub performed_by_id: Option<Uuid>,
    pub performed_by_type: ActorType,
    pub performed_by_name: Option<String>,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub details: Value,
    pub severity: AuditSeverity,
    pub status: AuditStatus,
    pub error_message: Option<String>,
}

impl NewAuditLog {
    pub fn success(
        action: AuditAction,
        performed_by_type: ActorType,
        severity: AuditSeverity,
    ) -> Self {
        Self {
            action,
            performed_by_id: None,
            performed_by_type,
            performed_by_name: None,
            entity_type: "Appointment".to_string(),
            entity_id: None,
            details: Value::Null,
            severity,
            status: AuditStatus::Success,
            error_message: None,
        }
    }

    pub fn failure(
        action: AuditAction,
        performed_by_type: ActorType,
        severity: AuditSeverity,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            status: AuditStatus::Failed,
            error_message: Some(error_message.into()),
            ..Self::success(action, performed_by_type, severity)
        }
    }

    pub fn performed_by(mut self, id: Uuid, name: Option<String>) -> Self {
        self.performed_by_id = Some(id);
        self.performed_by_name = name;
        self
    }

    pub fn entity(mut self, id: Uuid) -> Self {
        self.entity_id = Some(id);
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}
