//! Worker-side agent: registration, polling, and skill execution.

pub mod client;
pub mod skills;

pub use client::{PollError, WorkerClient};
pub use skills::{Skill, SkillSet};

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::WorkerConfig;
use crate::crypto::ResultCipher;
use crate::error::{Error, Result};
use crate::protocol::{TaskEnvelope, WorkerResult};

/// Execute one task against the local capability table and build the result
/// body. Skill failures become an error result with a failure trace; they do
/// not break the loop.
pub async fn execute_task(
    skills: &SkillSet,
    worker_id: &str,
    task: &TaskEnvelope,
) -> WorkerResult {
    match skills
        .invoke(&task.function.name, task.function.arguments.clone())
        .await
    {
        Ok(result) => WorkerResult {
            worker_id: worker_id.to_string(),
            task_id: task.id.clone(),
            status: "success".to_string(),
            result,
        },
        Err(e) => WorkerResult {
            worker_id: worker_id.to_string(),
            task_id: task.id.clone(),
            status: "error".to_string(),
            result: serde_json::json!({"trace": e.to_string()}),
        },
    }
}

/// Register and run the poll loop until the process is stopped.
///
/// Cadence: `poll_interval` after an empty response, `error_backoff` after a
/// transport error. No exponential backoff.
pub async fn run(config: WorkerConfig, skills: Arc<SkillSet>) -> Result<()> {
    let cipher = ResultCipher::from_config(&config.encryption).map_err(Error::Crypto)?;
    let client = WorkerClient::new(config.server.clone(), config.token.clone());

    let manifest = skills.manifest().await;
    let worker_id = client
        .register(None, std::env::consts::OS, config.layer, manifest)
        .await
        .map_err(Error::Worker)?;
    info!(worker_id = %worker_id, server = %config.server, "Registered");

    loop {
        match client.poll(&worker_id).await {
            Ok(tasks) if tasks.is_empty() => {
                tokio::time::sleep(config.poll_interval).await;
            }
            Ok(tasks) => {
                for task in &tasks {
                    info!(task_id = %task.id, skill = %task.function.name, "Executing task");
                    let result = execute_task(&skills, &worker_id, task).await;
                    if let Err(e) = client.post_result(&cipher, &result).await {
                        error!(task_id = %task.id, error = %e, "Failed to post result");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Poll failed");
                tokio::time::sleep(config.error_backoff).await;
            }
        }
    }
}
