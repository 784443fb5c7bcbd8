//! Wire protocol shared by the commander and its workers.
//!
//! Every shape that crosses the HTTP boundary lives here: chat turns,
//! function calls, skill descriptors, registration bodies, and the task
//! envelope handed out on poll.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Role of a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Carries a JSON-encoded `{task_id, result}` blob posted back by a worker.
    Function,
}

/// One turn of conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A structured (name, arguments) directive produced by the language model
/// in place of a free-text reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: serde_json::Map::new(),
        }
    }
}

/// A named, schema-described capability a worker can execute on request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Structured parameter schema; empty object when the skill takes none.
    #[serde(default)]
    pub parameters: serde_json::Value,
}

/// One entry of the LLM function-calling schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Build the function-calling schema from the global skill map.
///
/// Entries are sorted by name so the schema is stable across registrations.
/// Skills that omit a parameter schema get the empty-object default.
pub fn make_skill_schema(skills: &HashMap<String, SkillDescriptor>) -> Vec<FunctionSpec> {
    let mut specs: Vec<FunctionSpec> = skills
        .values()
        .map(|meta| FunctionSpec {
            name: meta.name.clone(),
            description: meta.description.clone(),
            parameters: if meta.parameters.is_null() {
                serde_json::json!({"type": "object", "properties": {}})
            } else {
                meta.parameters.clone()
            },
        })
        .collect();
    specs.sort_by(|a, b| a.name.cmp(&b.name));
    specs
}

/// Capability tier of a worker, reflecting how much of its optional
/// dependency set installed successfully during bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layer {
    /// Minimal bootstrap only.
    #[serde(rename = "L-2")]
    Minimal,
    /// Full dependency set available.
    #[serde(rename = "L-3")]
    Full,
}

/// Registration info a worker advertises on `/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerInfo {
    pub os: String,
    pub layer: Layer,
    #[serde(default)]
    pub skills: Vec<SkillDescriptor>,
}

/// A queued skill invocation as delivered to a polling worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub id: String,
    pub function: FunctionCall,
}

// ── HTTP bodies ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub token: String,
    #[serde(default)]
    pub worker_id: Option<String>,
    pub os: String,
    pub layer: Layer,
    #[serde(default)]
    pub skills: Vec<SkillDescriptor>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub worker_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskEnvelope>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResultRequest {
    /// JSON string, optionally wrapped by the shared symmetric cipher.
    pub payload: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResultResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Body a worker posts to `/result/{task_id}` (before optional encryption).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResult {
    pub worker_id: String,
    pub task_id: String,
    /// "success" or "error".
    pub status: String,
    pub result: serde_json::Value,
}
