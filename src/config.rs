//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::protocol::Layer;

/// Result-payload encryption, resolved once at startup.
///
/// When enabled, workers wrap result payloads with the shared symmetric
/// cipher keyed by this passphrase; the commander decrypts before parsing.
#[derive(Debug, Clone)]
pub enum EncryptionConfig {
    Disabled,
    Enabled { passphrase: SecretString },
}

impl EncryptionConfig {
    /// Read from `VAULT_PASSPHRASE`; absent or empty means disabled.
    pub fn from_env() -> Self {
        match std::env::var("VAULT_PASSPHRASE") {
            Ok(p) if !p.is_empty() => EncryptionConfig::Enabled {
                passphrase: SecretString::from(p),
            },
            _ => EncryptionConfig::Disabled,
        }
    }
}

/// Commander service configuration.
#[derive(Debug, Clone)]
pub struct CommanderConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Path to the local task database.
    pub db_path: String,
    /// Chat model identifier.
    pub model: String,
    /// API key for the chat completion provider.
    pub api_key: SecretString,
    /// Directory uploaded files are written into.
    pub upload_dir: String,
    pub encryption: EncryptionConfig,
}

impl CommanderConfig {
    /// Build configuration from environment variables.
    ///
    /// `OPENAI_API_KEY` is required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;

        let port: u16 = std::env::var("COMMANDER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                key: "COMMANDER_PORT".to_string(),
                message: format!("{e}"),
            })?;

        Ok(Self {
            bind_addr: format!("0.0.0.0:{port}"),
            db_path: std::env::var("COMMANDER_DB_PATH")
                .unwrap_or_else(|_| "./data/commander.db".to_string()),
            model: std::env::var("COMMANDER_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            api_key: SecretString::from(api_key),
            upload_dir: std::env::var("COMMANDER_UPLOAD_DIR")
                .unwrap_or_else(|_| "./uploads".to_string()),
            encryption: EncryptionConfig::from_env(),
        })
    }
}

/// Worker agent configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base URL of the commander, e.g. `http://127.0.0.1:8000`.
    pub server: String,
    /// Capability tier to advertise.
    pub layer: Layer,
    /// Shared registration/bearer token.
    pub token: String,
    /// Sleep after an empty poll.
    pub poll_interval: Duration,
    /// Sleep after a transport error.
    pub error_backoff: Duration,
    pub encryption: EncryptionConfig,
}

impl WorkerConfig {
    /// Build configuration from environment variables.
    ///
    /// `AGENT_SERVER` and `AGENT_TOKEN` are required. `AGENT_LAYER` defaults
    /// to `L-3` (full tier); any other value falls back to `L-2`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let server = std::env::var("AGENT_SERVER")
            .map_err(|_| ConfigError::MissingEnvVar("AGENT_SERVER".to_string()))?;
        let token = std::env::var("AGENT_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("AGENT_TOKEN".to_string()))?;
        let layer = match std::env::var("AGENT_LAYER").as_deref() {
            Ok("L-2") => Layer::Minimal,
            _ => Layer::Full,
        };

        Ok(Self {
            server: server.trim_end_matches('/').to_string(),
            layer,
            token,
            poll_interval: Duration::from_secs(10),
            error_backoff: Duration::from_secs(15),
            encryption: EncryptionConfig::from_env(),
        })
    }
}
