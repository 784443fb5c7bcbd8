//! Append-only audit log.
//!
//! Every state transition (registration, enqueue, completion) is recorded
//! for post-hoc inspection by external tooling. The core appends but never
//! reads back.

use std::sync::Arc;

use chrono::Utc;

use crate::error::DatabaseError;
use crate::store::CommanderDb;

/// Action tag of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    RegisterWorker,
    Enqueue,
    Complete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::RegisterWorker => "register_worker",
            AuditAction::Enqueue => "enqueue",
            AuditAction::Complete => "complete",
        }
    }
}

/// Audit log over the durable `audit` table.
pub struct AuditLog {
    db: Arc<CommanderDb>,
}

impl AuditLog {
    pub fn new(db: Arc<CommanderDb>) -> Self {
        Self { db }
    }

    /// Append one entry. Failures propagate — a dropped audit row would make
    /// the log lie about what happened.
    pub async fn record(
        &self,
        action: AuditAction,
        details: serde_json::Value,
    ) -> Result<(), DatabaseError> {
        self.db
            .conn()
            .execute(
                "INSERT INTO audit (ts, action, details) VALUES (?1, ?2, ?3)",
                libsql::params![
                    Utc::now().to_rfc3339(),
                    action.as_str(),
                    details.to_string()
                ],
            )
            .await?;
        Ok(())
    }
}
