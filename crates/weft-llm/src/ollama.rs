//! Native Ollama API client.
//!
//! Talks to Ollama's `/api/chat` endpoint directly. A single in-process
//! lock serializes all generations: the local model holds one context
//! sequence, so overlapping requests queue here.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::{ChatMessage, GenerateOptions, Llm, LlmError, LlmSession, Role};

/// Response from Ollama's `/api/tags` endpoint.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

/// Lists the model names available on an Ollama instance.
pub async fn discover_models(ollama_host: &str) -> Result<Vec<String>, LlmError> {
    let client = Client::new();
    let url = format!("{}/api/tags", ollama_host.trim_end_matches('/'));

    let response = client
        .get(&url)
        .timeout(std::time::Duration::from_secs(5))
        .send()
        .await
        .map_err(|e| LlmError::Request(format!("Ollama discovery failed: {e}")))?;

    let tags: TagsResponse = response
        .json()
        .await
        .map_err(|e| LlmError::Malformed(e.to_string()))?;

    let names: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
    info!("Discovered {} Ollama models", names.len());
    Ok(names)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [WireMessage],
    stream: bool,
    options: WireOptions,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct WireOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

fn to_wire(messages: &[ChatMessage]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|m| WireMessage {
            role: match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: m.content.clone(),
        })
        .collect()
}

/// Client for a single Ollama-hosted model.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    api_base: String,
    model: String,
    gate: Arc<Mutex<()>>,
}

impl OllamaClient {
    /// Creates a client for the given model and Ollama host.
    pub fn new(model: &str, api_base: &str) -> Self {
        let base = api_base.trim_end_matches('/').replace("/v1", "");
        Self {
            client: Client::new(),
            api_base: base,
            model: model.to_string(),
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends a non-streaming chat request. Holds the serialization gate
    /// for the duration of the call.
    async fn chat(&self, messages: &[ChatMessage], opts: &GenerateOptions) -> Result<String, LlmError> {
        let _serialized = self.gate.lock().await;

        let url = format!("{}/api/chat", self.api_base);
        let wire = to_wire(messages);
        let request = ChatRequest {
            model: &self.model,
            messages: &wire,
            stream: false,
            options: WireOptions {
                temperature: opts.temperature,
                num_predict: opts.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LlmError::Request(format!(
                "Ollama returned {}",
                response.status()
            )));
        }

        let resp: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;

        Ok(resp.message.map(|m| m.content).unwrap_or_default())
    }
}

#[async_trait]
impl Llm for OllamaClient {
    async fn generate(&self, prompt: &str, opts: &GenerateOptions) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &opts.system_prompt {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(prompt));
        self.chat(&messages, opts).await
    }

    async fn open_session(&self, system_prompt: &str) -> Result<Box<dyn LlmSession>, LlmError> {
        Ok(Box::new(OllamaSession {
            client: self.clone(),
            transcript: vec![ChatMessage::system(system_prompt)],
        }))
    }
}

/// A persistent chat context over the Ollama client: the transcript
/// grows turn by turn and is replayed on every prompt.
struct OllamaSession {
    client: OllamaClient,
    transcript: Vec<ChatMessage>,
}

#[async_trait]
impl LlmSession for OllamaSession {
    async fn prompt(&mut self, input: &str, opts: &GenerateOptions) -> Result<String, LlmError> {
        self.transcript.push(ChatMessage::user(input));
        let reply = self.client.chat(&self.transcript, opts).await?;
        self.transcript.push(ChatMessage::assistant(reply.clone()));
        Ok(reply)
    }
}
