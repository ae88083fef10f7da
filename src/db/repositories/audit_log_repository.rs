use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::error::DatabaseError;
use crate::db::models::NewAuditLog;

use super::AuditLogRepository;

pub struct PgAuditLogRepository {
    pool: PgPool,
}

impl PgAuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogRepository for PgAuditLogRepository {
    async fn append(&self, entry: &NewAuditLog) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (id, action, performed_by_id, performed_by_type, performed_by_name,
                 entity_type, entity_id, details, severity, status, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(entry.action)
        .bind(entry.performed_by_id)
        .bind(entry.performed_by_type)
        .bind(&entry.performed_by_name)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.details)
        .bind(entry.severity)
        .bind(entry.status)
        .bind(&entry.error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
