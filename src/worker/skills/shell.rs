//! Shell command skill.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::SkillError;
use crate::worker::skills::Skill;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Execute a shell command and capture its output.
pub struct ShellSkill {
    timeout: Duration,
}

impl ShellSkill {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ShellSkill {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Skill for ShellSkill {
    fn name(&self) -> &str {
        "run_shell"
    }

    fn description(&self) -> &str {
        "Execute shell command"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {"type": "string", "description": "Command line to run"},
                "timeout": {"type": "integer", "description": "Seconds before the command is killed"}
            },
            "required": ["command"]
        })
    }

    async fn invoke(
        &self,
        args: serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, SkillError> {
        let command = args
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SkillError::InvalidParameters {
                name: "run_shell".to_string(),
                reason: "missing string field `command`".to_string(),
            })?;
        let timeout = args
            .get("timeout")
            .and_then(|v| v.as_u64())
            .map(Duration::from_secs)
            .unwrap_or(self.timeout);

        let output = tokio::time::timeout(
            timeout,
            Command::new("sh").arg("-c").arg(command).output(),
        )
        .await
        .map_err(|_| SkillError::Timeout {
            name: "run_shell".to_string(),
            timeout,
        })?
        .map_err(|e| SkillError::ExecutionFailed {
            name: "run_shell".to_string(),
            reason: e.to_string(),
        })?;

        Ok(serde_json::json!({
            "returncode": output.status.code().unwrap_or(-1),
            "stdout": String::from_utf8_lossy(&output.stdout),
            "stderr": String::from_utf8_lossy(&output.stderr),
        }))
    }
}
