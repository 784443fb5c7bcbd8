//! External chat-completion collaborator.
//!
//! The core only needs one capability from the model: given the current
//! history and the function-calling schema, return either assistant text or
//! a structured function call. Everything behind that seam is swappable.

pub mod openai;

pub use openai::OpenAiChatModel;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::protocol::{ChatMessage, FunctionCall, FunctionSpec};

/// Outcome of one chat-completion call.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    /// Plain assistant text, used as the reply verbatim.
    Reply(String),
    /// The model selected a skill invocation.
    Call(FunctionCall),
}

/// A chat model capable of function calling.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    /// Run one completion over the full history. `functions` is empty when
    /// no skills are registered; implementations must then omit the
    /// function-calling fields entirely.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        functions: &[FunctionSpec],
    ) -> Result<ChatOutcome, LlmError>;
}
