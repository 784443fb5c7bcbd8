//! Goal planner — longer-horizon scheduling store.
//!
//! Splits a goal into sentence steps and schedules them one minute apart in
//! the durable `plans` table. Planned tasks are fetched by "due and still
//! pending" and marked done explicitly.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::CommanderDb;

/// A scheduled step of a plan.
#[derive(Debug, Clone)]
pub struct PlannedTask {
    pub id: String,
    pub goal: String,
    pub description: String,
    pub status: String,
    pub scheduled_at: DateTime<Utc>,
}

/// Planner over the durable `plans` table.
pub struct Planner {
    db: Arc<CommanderDb>,
}

impl Planner {
    pub fn new(db: Arc<CommanderDb>) -> Self {
        Self { db }
    }

    /// Split `goal` on sentence boundaries and schedule the steps one minute
    /// apart with strictly increasing timestamps. Returns the ids in order.
    pub async fn plan(&self, goal: &str) -> Result<Vec<String>, DatabaseError> {
        let steps: Vec<&str> = goal
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        let now = Utc::now();
        let mut ids = Vec::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            let id = Uuid::new_v4().to_string();
            let when = now + Duration::minutes(i as i64);
            self.db
                .conn()
                .execute(
                    "INSERT INTO plans (id, goal, description, status, scheduled_at) \
                     VALUES (?1, ?2, ?3, 'pending', ?4)",
                    libsql::params![id.clone(), goal, *step, when.to_rfc3339()],
                )
                .await?;
            ids.push(id);
        }
        tracing::debug!(steps = ids.len(), "Goal planned");
        Ok(ids)
    }

    /// All pending steps whose schedule time is at or before `now`.
    pub async fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<PlannedTask>, DatabaseError> {
        let mut rows = self
            .db
            .conn()
            .query(
                "SELECT id, goal, description, status, scheduled_at FROM plans \
                 WHERE scheduled_at <= ?1 AND status = 'pending' ORDER BY scheduled_at",
                libsql::params![now.to_rfc3339()],
            )
            .await?;

        let mut due = Vec::new();
        while let Some(row) = rows.next().await? {
            let scheduled: String = row.get(4)?;
            due.push(PlannedTask {
                id: row.get(0)?,
                goal: row.get(1)?,
                description: row.get(2)?,
                status: row.get(3)?,
                scheduled_at: DateTime::parse_from_rfc3339(&scheduled)
                    .map_err(|e| DatabaseError::Serialization(e.to_string()))?
                    .with_timezone(&Utc),
            });
        }
        Ok(due)
    }

    /// Mark a planned step done.
    pub async fn mark_done(&self, task_id: &str) -> Result<(), DatabaseError> {
        self.db
            .conn()
            .execute(
                "UPDATE plans SET status = 'done' WHERE id = ?1",
                libsql::params![task_id],
            )
            .await?;
        Ok(())
    }
}
