//! Error types for the commander.

use std::time::Duration;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Skill error: {0}")]
    Skill(#[from] SkillError),

    #[error("Worker error: {0}")]
    Worker(#[from] crate::worker::PollError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<libsql::Error> for DatabaseError {
    fn from(e: libsql::Error) -> Self {
        DatabaseError::Query(e.to_string())
    }
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Dispatch coordination errors.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("No registered worker advertises skill {skill}")]
    NoEligibleWorker { skill: String },

    #[error("Unknown worker: {worker_id}")]
    UnknownWorker { worker_id: String },
}

/// Result-payload encryption errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid cipher key")]
    InvalidKey,

    #[error("Malformed result payload: {0}")]
    MalformedPayload(String),
}

/// Worker-side skill execution errors.
#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("Skill {name} not found")]
    NotFound { name: String },

    #[error("Skill {name} execution failed: {reason}")]
    ExecutionFailed { name: String, reason: String },

    #[error("Invalid parameters for skill {name}: {reason}")]
    InvalidParameters { name: String, reason: String },

    #[error("Skill {name} timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },
}

/// Result type alias for the commander.
pub type Result<T> = std::result::Result<T, Error>;
