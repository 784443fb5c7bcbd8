//! OpenAI chat-completions backend.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::LlmError;
use crate::llm::{ChatModel, ChatOutcome};
use crate::protocol::{ChatMessage, FunctionCall, FunctionSpec, Role};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Chat model backed by the OpenAI chat-completions API.
pub struct OpenAiChatModel {
    client: reqwest::Client,
    api_base: String,
    api_key: SecretString,
    model: String,
}

impl OpenAiChatModel {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key,
            model: model.into(),
        }
    }

    /// Override the API base URL (proxies, compatible providers, tests).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Function => "function",
    }
}

#[derive(Debug, Deserialize)]
struct CompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    function_call: Option<RawFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct RawFunctionCall {
    name: String,
    /// The API returns arguments as a JSON-encoded string; some compatible
    /// providers send a bare object. Tolerate both.
    #[serde(default)]
    arguments: Option<serde_json::Value>,
}

/// Turn a parsed response body into a [`ChatOutcome`].
fn outcome_from_response(body: CompletionsResponse, model: &str) -> Result<ChatOutcome, LlmError> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse {
            provider: "openai".to_string(),
            reason: format!("model {model} returned no choices"),
        })?;

    if let Some(raw) = choice.message.function_call {
        let arguments = match raw.arguments {
            Some(serde_json::Value::String(s)) if !s.is_empty() => {
                serde_json::from_str(&s).map_err(|e| LlmError::InvalidResponse {
                    provider: "openai".to_string(),
                    reason: format!("unparseable function arguments: {e}"),
                })?
            }
            Some(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        return Ok(ChatOutcome::Call(FunctionCall {
            name: raw.name,
            arguments,
        }));
    }

    Ok(ChatOutcome::Reply(choice.message.content.unwrap_or_default()))
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        functions: &[FunctionSpec],
    ) -> Result<ChatOutcome, LlmError> {
        let wire_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| serde_json::json!({"role": role_str(m.role), "content": m.content}))
            .collect();

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": wire_messages,
        });
        if !functions.is_empty() {
            body["functions"] = serde_json::to_value(functions)?;
            body["function_call"] = serde_json::json!("auto");
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: "openai".to_string(),
                reason: e.to_string(),
            })?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(LlmError::AuthFailed {
                provider: "openai".to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(LlmError::RequestFailed {
                provider: "openai".to_string(),
                reason: format!("status {}", response.status()),
            });
        }

        let parsed: CompletionsResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                provider: "openai".to_string(),
                reason: e.to_string(),
            })?;
        outcome_from_response(parsed, &self.model)
    }
}
