use std::sync::Arc;

use tracing::warn;

use crate::db::{AuditLogRepository, NewAuditLog};

/// Injected audit sink. Writes are fire-and-forget: a failed append is
/// logged and never fails the business operation it accompanies.
#[derive(Clone)]
pub struct AuditSink {
    repo: Arc<dyn AuditLogRepository>,
}

impl AuditSink {
    pub fn new(repo: Arc<dyn AuditLogRepository>) -> Self {
        Self { repo }
    }

    pub async fn record(&self, entry: NewAuditLog) {
        if let Err(err) = self.repo.append(&entry).await {
            warn!(action = ?entry.action, "Audit log write failed: {}", err);
        }
    }
}
