//! Agent Commander — distributed task-dispatch core.
//!
//! A central commander turns chat input into skill invocations via LLM
//! function calling, queues them for registered workers, and reconciles
//! asynchronous results back into a bounded conversation history.

pub mod audit;
pub mod config;
pub mod crypto;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod llm;
pub mod planner;
pub mod protocol;
pub mod queue;
pub mod server;
pub mod store;
pub mod worker;
