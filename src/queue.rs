//! Per-worker task queue with at-most-once delivery.
//!
//! Tasks live in the durable `queue` table and are mirrored into an
//! in-memory per-worker list for zero-latency pickup on the common path.
//! A poll drains the mirror, marks those rows `sent`, then sweeps the
//! durable table for any `pending` rows the mirror missed (tasks enqueued
//! by another process instance, or before this one's mirror existed).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::audit::{AuditAction, AuditLog};
use crate::crypto::token_hex;
use crate::error::DatabaseError;
use crate::history::ConversationHistory;
use crate::protocol::{FunctionCall, Role, TaskEnvelope};

/// Task queue over the durable store plus an in-memory mirror.
pub struct TaskQueue {
    db: Arc<crate::store::CommanderDb>,
    audit: Arc<AuditLog>,
    history: Arc<ConversationHistory>,
    /// Pending tasks per worker, in enqueue order. The lock is held across
    /// the whole fetch (drain + durable marking) so two simultaneous polls
    /// by the same worker can never both receive a task.
    mirror: Mutex<HashMap<String, Vec<TaskEnvelope>>>,
}

impl TaskQueue {
    pub fn new(
        db: Arc<crate::store::CommanderDb>,
        audit: Arc<AuditLog>,
        history: Arc<ConversationHistory>,
    ) -> Self {
        Self {
            db,
            audit,
            history,
            mirror: Mutex::new(HashMap::new()),
        }
    }

    /// Enqueue a function call for a worker. Returns the generated task id.
    ///
    /// The task id comes from the OS random generator — unguessable, never a
    /// counter. The durable insert is all-or-nothing: on failure no partial
    /// task is visible to pollers.
    pub async fn enqueue(
        &self,
        worker_id: &str,
        function_call: FunctionCall,
    ) -> Result<String, DatabaseError> {
        let task_id = token_hex(8);

        self.audit
            .record(
                AuditAction::Enqueue,
                serde_json::json!({
                    "task_id": task_id,
                    "worker_id": worker_id,
                    "function": function_call.name,
                    "arguments": function_call.arguments,
                }),
            )
            .await?;

        let payload = serde_json::to_string(&function_call)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        self.db
            .conn()
            .execute(
                "INSERT INTO queue (id, worker_id, status, payload) VALUES (?1, ?2, 'pending', ?3)",
                libsql::params![task_id.clone(), worker_id, payload],
            )
            .await?;

        // Durable row exists; now mirror for immediate pickup.
        let envelope = TaskEnvelope {
            id: task_id.clone(),
            function: function_call,
        };
        self.mirror
            .lock()
            .await
            .entry(worker_id.to_string())
            .or_default()
            .push(envelope);

        tracing::debug!(task_id = %task_id, worker_id = %worker_id, "Task enqueued");
        Ok(task_id)
    }

    /// Atomically claim all currently pending tasks for a worker.
    ///
    /// Calling twice in a row on an undisturbed queue returns the full set
    /// once, then empty — at-most-once delivery per task. A concurrent
    /// enqueue between the two calls is delivered on the second.
    pub async fn fetch_pending(
        &self,
        worker_id: &str,
    ) -> Result<Vec<TaskEnvelope>, DatabaseError> {
        let mut mirror = self.mirror.lock().await;
        let mut tasks = mirror.remove(worker_id).unwrap_or_default();

        let conn = self.db.conn();
        for task in &tasks {
            conn.execute(
                "UPDATE queue SET status = 'sent' WHERE id = ?1",
                libsql::params![task.id.clone()],
            )
            .await?;
        }

        // Sweep durable rows the mirror didn't cover.
        let mut rows = conn
            .query(
                "SELECT id, payload FROM queue WHERE worker_id = ?1 AND status = 'pending' \
                 ORDER BY rowid",
                libsql::params![worker_id],
            )
            .await?;
        let mut swept = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: String = row.get(0)?;
            let payload: String = row.get(1)?;
            let function: FunctionCall = serde_json::from_str(&payload)
                .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
            swept.push(TaskEnvelope { id, function });
        }
        for task in &swept {
            conn.execute(
                "UPDATE queue SET status = 'sent' WHERE id = ?1",
                libsql::params![task.id.clone()],
            )
            .await?;
        }
        tasks.extend(swept);

        drop(mirror);

        if !tasks.is_empty() {
            tracing::debug!(worker_id = %worker_id, count = tasks.len(), "Tasks delivered");
        }
        Ok(tasks)
    }

    /// Record a task result: audit the completion and append a
    /// function-result entry `{task_id, result}` to conversation history.
    ///
    /// Known validation gap, preserved deliberately: the task id is not
    /// checked against delivered (or even existing) tasks, so a forged or
    /// stale id is accepted and lands in history.
    pub async fn complete(
        &self,
        task_id: &str,
        result: serde_json::Value,
    ) -> Result<(), DatabaseError> {
        self.audit
            .record(
                AuditAction::Complete,
                serde_json::json!({"task_id": task_id, "result": result}),
            )
            .await?;

        self.db
            .conn()
            .execute(
                "UPDATE queue SET status = 'done' WHERE id = ?1",
                libsql::params![task_id],
            )
            .await?;

        let entry = serde_json::json!({"task_id": task_id, "result": result});
        self.history.push(Role::Function, entry.to_string()).await;
        tracing::info!(task_id = %task_id, "Task completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CommanderDb;

    async fn queue_over(db: Arc<CommanderDb>) -> (Arc<TaskQueue>, Arc<ConversationHistory>) {
        let audit = Arc::new(AuditLog::new(Arc::clone(&db)));
        let history = Arc::new(ConversationHistory::new());
        (
            Arc::new(TaskQueue::new(db, audit, Arc::clone(&history))),
            history,
        )
    }

    fn dummy_call() -> FunctionCall {
        let mut fc = FunctionCall::new("dummy");
        fc.arguments
            .insert("a".to_string(), serde_json::json!(1));
        fc
    }

    #[tokio::test]
    async fn enqueue_then_fetch_exactly_once() {
        let db = Arc::new(CommanderDb::open_in_memory().await.unwrap());
        let (queue, _) = queue_over(db).await;

        let task_id = queue.enqueue("worker1", dummy_call()).await.unwrap();
        assert_eq!(task_id.len(), 16);

        let tasks = queue.fetch_pending("worker1").await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, task_id);
        assert_eq!(tasks[0].function.name, "dummy");

        // Second fetch on an undisturbed queue is empty.
        assert!(queue.fetch_pending("worker1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_sweeps_durable_rows_not_in_mirror() {
        let db = Arc::new(CommanderDb::open_in_memory().await.unwrap());

        // Row written by "another process instance": durable only.
        db.conn()
            .execute(
                "INSERT INTO queue (id, worker_id, status, payload) \
                 VALUES ('orphan01', 'w1', 'pending', '{\"name\":\"dummy\",\"arguments\":{}}')",
                (),
            )
            .await
            .unwrap();

        let (queue, _) = queue_over(db).await;
        let tasks = queue.fetch_pending("w1").await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "orphan01");

        assert!(queue.fetch_pending("w1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_is_scoped_per_worker() {
        let db = Arc::new(CommanderDb::open_in_memory().await.unwrap());
        let (queue, _) = queue_over(db).await;

        queue.enqueue("w1", dummy_call()).await.unwrap();
        queue.enqueue("w2", dummy_call()).await.unwrap();

        assert_eq!(queue.fetch_pending("w1").await.unwrap().len(), 1);
        assert_eq!(queue.fetch_pending("w2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_polls_never_duplicate_a_task() {
        let db = Arc::new(CommanderDb::open_in_memory().await.unwrap());
        let (queue, _) = queue_over(db).await;

        for _ in 0..5 {
            queue.enqueue("w1", dummy_call()).await.unwrap();
        }

        let q1 = Arc::clone(&queue);
        let q2 = Arc::clone(&queue);
        let (a, b) = tokio::join!(
            tokio::spawn(async move { q1.fetch_pending("w1").await.unwrap() }),
            tokio::spawn(async move { q2.fetch_pending("w1").await.unwrap() }),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        let mut ids: Vec<String> = a.into_iter().chain(b).map(|t| t.id).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(total, 5, "every task delivered exactly once");
        assert_eq!(ids.len(), 5, "no task delivered twice");
    }

    #[tokio::test]
    async fn completion_lands_in_history_once() {
        let db = Arc::new(CommanderDb::open_in_memory().await.unwrap());
        let (queue, history) = queue_over(db).await;

        let task_id = queue.enqueue("w1", FunctionCall::new("dummy")).await.unwrap();
        queue.fetch_pending("w1").await.unwrap();
        queue
            .complete(&task_id, serde_json::json!({"stdout": "ok"}))
            .await
            .unwrap();

        let messages = history.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Function);
        let entry: serde_json::Value = serde_json::from_str(&messages[0].content).unwrap();
        assert_eq!(entry["task_id"], task_id.as_str());
        assert_eq!(entry["result"]["stdout"], "ok");
    }

    #[tokio::test]
    async fn complete_accepts_unknown_task_id() {
        // The validation gap is part of the contract — see `complete` docs.
        let db = Arc::new(CommanderDb::open_in_memory().await.unwrap());
        let (queue, history) = queue_over(db).await;

        queue
            .complete("never-enqueued", serde_json::json!("forged"))
            .await
            .unwrap();
        assert_eq!(history.len().await, 1);
    }
}
