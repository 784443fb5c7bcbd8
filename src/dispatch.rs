//! Dispatch coordinator — ties chat input to the worker queue.

use std::sync::Arc;

use crate::directory::WorkerDirectory;
use crate::error::{DispatchError, Error, Result};
use crate::history::ConversationHistory;
use crate::llm::{ChatModel, ChatOutcome};
use crate::protocol::Role;
use crate::queue::TaskQueue;

/// Orchestration over the directory, queue, history, and chat model.
pub struct Dispatcher {
    directory: Arc<WorkerDirectory>,
    queue: Arc<TaskQueue>,
    history: Arc<ConversationHistory>,
    llm: Arc<dyn ChatModel>,
}

impl Dispatcher {
    pub fn new(
        directory: Arc<WorkerDirectory>,
        queue: Arc<TaskQueue>,
        history: Arc<ConversationHistory>,
        llm: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            directory,
            queue,
            history,
            llm,
        }
    }

    /// Handle one user chat turn. Returns the reply text.
    ///
    /// The model sees the full history plus the current function schema.
    /// A function-call outcome is resolved to a capable worker and enqueued;
    /// the reply then references the generated task id and skill name. A
    /// text outcome is used verbatim. Either way the reply is appended as an
    /// assistant entry.
    pub async fn handle_user_message(&self, text: &str) -> Result<String> {
        self.history.push(Role::User, text).await;

        let messages = self.history.messages().await;
        let schema = self.directory.function_schema().await;
        let outcome = self.llm.chat(&messages, &schema).await?;

        let reply = match outcome {
            ChatOutcome::Reply(text) => text,
            ChatOutcome::Call(call) => {
                let worker_id = self
                    .directory
                    .find_worker_for_skill(&call.name)
                    .await
                    .ok_or_else(|| {
                        Error::Dispatch(DispatchError::NoEligibleWorker {
                            skill: call.name.clone(),
                        })
                    })?;
                let name = call.name.clone();
                let task_id = self
                    .queue
                    .enqueue(&worker_id, call)
                    .await
                    .map_err(Error::Database)?;
                format!("🔧 Queued `{name}` as `{task_id}` on {worker_id}")
            }
        };

        self.history.push(Role::Assistant, reply.clone()).await;
        Ok(reply)
    }
}
