//! LLM access for weft.
//!
//! The engine and orchestrator consume the model through the [`Llm`]
//! facade:
//!
//! - [`Llm::generate`] — one-shot, stateless generation
//! - [`Llm::open_session`] — a persistent chat context for the
//!   orchestrator's ReAct loop; releasing the handle disposes it
//!
//! Two implementations ship with the crate:
//!
//! - [`OllamaClient`] — the local model, via Ollama's native API
//! - [`ScriptedLlm`] — queued canned responses, for tests and offline runs
//!
//! The model is a single-instance resource: both implementations
//! serialize requests internally, so concurrent workflow executions
//! queue at this boundary rather than interleaving generations.

mod ollama;
mod script;

pub use ollama::{discover_models, OllamaClient};
pub use script::ScriptedLlm;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by LLM backends.
#[derive(Error, Debug)]
pub enum LlmError {
    /// The request to the model failed.
    #[error("LLM request failed: {0}")]
    Request(String),

    /// The model's response could not be decoded.
    #[error("LLM response malformed: {0}")]
    Malformed(String),

    /// A persistent session could not be allocated.
    #[error("LLM session unavailable: {0}")]
    Session(String),
}

/// Role of a chat message sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Per-request generation options.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl GenerateOptions {
    /// Options with a system prompt and everything else defaulted.
    pub fn with_system(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: Some(system_prompt.into()),
            ..Self::default()
        }
    }
}

/// A persistent chat context bound to one system prompt. Dropping the
/// handle releases the session.
#[async_trait]
pub trait LlmSession: Send {
    /// Continues the bound conversation with one more user turn.
    async fn prompt(&mut self, input: &str, opts: &GenerateOptions) -> Result<String, LlmError>;
}

/// The LLM facade consumed by node executors and the orchestrator.
#[async_trait]
pub trait Llm: Send + Sync {
    /// One-shot, stateless generation.
    async fn generate(&self, prompt: &str, opts: &GenerateOptions) -> Result<String, LlmError>;

    /// Allocates a persistent chat context with the given system prompt.
    async fn open_session(&self, system_prompt: &str) -> Result<Box<dyn LlmSession>, LlmError>;
}
