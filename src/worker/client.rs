//! HTTP client a worker uses to talk to the commander.

use std::time::Duration;

use crate::crypto::ResultCipher;
use crate::protocol::{
    Layer, RegisterRequest, RegisterResponse, ResultRequest, ResultResponse, SkillDescriptor,
    TaskEnvelope, TaskListResponse, WorkerResult,
};

/// Failures of one commander round trip. Transport errors are kept distinct
/// so the run loop can apply its longer backoff to them.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unauthorized")]
    Unauthorized,

    #[error("unknown worker")]
    UnknownWorker,

    #[error("unexpected status {0}")]
    UnexpectedStatus(reqwest::StatusCode),
}

/// Client bound to one commander instance.
pub struct WorkerClient {
    http: reqwest::Client,
    server: String,
    token: String,
}

impl WorkerClient {
    pub fn new(server: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            server: server.into(),
            token: token.into(),
        }
    }

    /// Register this worker, returning the commander-assigned id.
    pub async fn register(
        &self,
        worker_id: Option<String>,
        os: &str,
        layer: Layer,
        skills: Vec<SkillDescriptor>,
    ) -> Result<String, PollError> {
        let body = RegisterRequest {
            token: self.token.clone(),
            worker_id,
            os: os.to_string(),
            layer,
            skills,
        };
        let response = self
            .http
            .post(format!("{}/register", self.server))
            .json(&body)
            .send()
            .await?;
        match response.status() {
            reqwest::StatusCode::UNAUTHORIZED => Err(PollError::Unauthorized),
            s if s.is_success() => {
                let parsed: RegisterResponse = response.json().await?;
                Ok(parsed.worker_id)
            }
            s => Err(PollError::UnexpectedStatus(s)),
        }
    }

    /// Poll for assigned tasks. `Ok(vec![])` means an empty queue (204).
    pub async fn poll(&self, worker_id: &str) -> Result<Vec<TaskEnvelope>, PollError> {
        let response = self
            .http
            .get(format!("{}/task/{worker_id}", self.server))
            .header(reqwest::header::AUTHORIZATION, &self.token)
            .send()
            .await?;
        match response.status() {
            reqwest::StatusCode::NO_CONTENT => Ok(Vec::new()),
            reqwest::StatusCode::UNAUTHORIZED => Err(PollError::Unauthorized),
            reqwest::StatusCode::NOT_FOUND => Err(PollError::UnknownWorker),
            s if s.is_success() => {
                let parsed: TaskListResponse = response.json().await?;
                Ok(parsed.tasks)
            }
            s => Err(PollError::UnexpectedStatus(s)),
        }
    }

    /// Post a task result, passing it through the configured cipher.
    pub async fn post_result(
        &self,
        cipher: &ResultCipher,
        result: &WorkerResult,
    ) -> Result<(), PollError> {
        let serialized = serde_json::to_vec(result).unwrap_or_default();
        let body = ResultRequest {
            payload: cipher.encrypt(&serialized),
        };
        let response = self
            .http
            .post(format!("{}/result/{}", self.server, result.task_id))
            .header(reqwest::header::AUTHORIZATION, &self.token)
            .json(&body)
            .send()
            .await?;
        match response.status() {
            reqwest::StatusCode::UNAUTHORIZED => Err(PollError::Unauthorized),
            s if s.is_success() => {
                let _: ResultResponse = response.json().await?;
                Ok(())
            }
            s => Err(PollError::UnexpectedStatus(s)),
        }
    }
}
