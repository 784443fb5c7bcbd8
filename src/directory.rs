//! Worker directory and global skill registry.
//!
//! One explicitly constructed state object, shared via `Arc` and injected
//! into every handler. Its lifetime is the service process; there are no
//! ambient globals.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::crypto::token_hex;
use crate::protocol::{FunctionSpec, SkillDescriptor, WorkerInfo, make_skill_schema};

/// Deployment tier tag reported in status snapshots.
const DEPLOYMENT_LAYER: &str = "L-3";

/// Read-only view returned by `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct DirectorySnapshot {
    pub workers: Vec<WorkerInfo>,
    pub skills: Vec<String>,
    pub bearer_token: String,
    pub layer: String,
}

struct DirectoryInner {
    /// Registration info per worker id.
    workers: HashMap<String, WorkerInfo>,
    /// Worker ids in registration order — `find_worker_for_skill` scans this.
    order: Vec<String>,
    /// Global skill-name → descriptor map. Name collisions across workers
    /// overwrite silently: last registration wins, no merge, no warning.
    skills: HashMap<String, SkillDescriptor>,
    /// Function-calling schema derived from `skills`, recomputed on register.
    schema: Vec<FunctionSpec>,
}

/// Registered workers, their advertised skills, and the shared bearer token.
///
/// Workers are never expired — there is no heartbeat or TTL in this design.
pub struct WorkerDirectory {
    inner: RwLock<DirectoryInner>,
    /// High-entropy token generated at process start, shared by all workers
    /// and required on every task/result call.
    bearer_token: String,
}

impl WorkerDirectory {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(DirectoryInner {
                workers: HashMap::new(),
                order: Vec::new(),
                skills: HashMap::new(),
                schema: Vec::new(),
            }),
            bearer_token: token_hex(16),
        }
    }

    pub fn bearer_token(&self) -> &str {
        &self.bearer_token
    }

    /// Register (or re-register) a worker.
    ///
    /// Assigns a fresh uuid when `worker_id` is absent, overwrites the full
    /// registration info, upserts every advertised skill into the global
    /// registry, and recomputes the function schema. Returns the worker id.
    pub async fn register(&self, worker_id: Option<String>, info: WorkerInfo) -> String {
        let worker_id = worker_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut inner = self.inner.write().await;
        for skill in &info.skills {
            inner.skills.insert(skill.name.clone(), skill.clone());
        }
        if inner.workers.insert(worker_id.clone(), info).is_none() {
            inner.order.push(worker_id.clone());
        }
        let schema = make_skill_schema(&inner.skills);
        inner.schema = schema;
        tracing::info!(worker_id = %worker_id, "Worker registered");
        worker_id
    }

    /// Find a worker advertising the given skill.
    ///
    /// Linear scan in registration order; first match wins. Callers must not
    /// rely on which worker wins when skill sets overlap.
    pub async fn find_worker_for_skill(&self, name: &str) -> Option<String> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .find(|wid| {
                inner
                    .workers
                    .get(*wid)
                    .is_some_and(|info| info.skills.iter().any(|s| s.name == name))
            })
            .cloned()
    }

    pub async fn contains(&self, worker_id: &str) -> bool {
        self.inner.read().await.workers.contains_key(worker_id)
    }

    /// Current LLM function-calling schema; empty when no skills registered.
    pub async fn function_schema(&self) -> Vec<FunctionSpec> {
        self.inner.read().await.schema.clone()
    }

    pub async fn snapshot(&self) -> DirectorySnapshot {
        let inner = self.inner.read().await;
        let mut skills: Vec<String> = inner.skills.keys().cloned().collect();
        skills.sort();
        DirectorySnapshot {
            workers: inner
                .order
                .iter()
                .filter_map(|wid| inner.workers.get(wid).cloned())
                .collect(),
            skills,
            bearer_token: self.bearer_token.clone(),
            layer: DEPLOYMENT_LAYER.to_string(),
        }
    }
}

impl Default for WorkerDirectory {
    fn default() -> Self {
        Self::new()
    }
}
