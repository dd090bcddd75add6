//! A scripted LLM that replays queued responses. Used by the test
//! suites and for running workflows with no model attached.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{GenerateOptions, Llm, LlmError, LlmSession};

/// Replays a fixed queue of responses in order, recording every prompt
/// it receives. Sessions share the same queue, so a script can span
/// one-shot calls and session turns.
#[derive(Clone, Default)]
pub struct ScriptedLlm {
    responses: Arc<Mutex<VecDeque<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedLlm {
    /// Creates an empty script. Every call will fail until responses
    /// are pushed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a script from a list of responses.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let script = Self::new();
        for r in responses {
            script.push(r);
        }
        script
    }

    /// Appends one response to the queue.
    pub fn push(&self, response: impl Into<String>) {
        self.responses
            .lock()
            .expect("script lock")
            .push_back(response.into());
    }

    /// All prompts received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("script lock").clone()
    }

    fn next(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts
            .lock()
            .expect("script lock")
            .push(prompt.to_string());
        self.responses
            .lock()
            .expect("script lock")
            .pop_front()
            .ok_or_else(|| LlmError::Request("scripted responses exhausted".into()))
    }
}

#[async_trait]
impl Llm for ScriptedLlm {
    async fn generate(&self, prompt: &str, _opts: &GenerateOptions) -> Result<String, LlmError> {
        self.next(prompt)
    }

    async fn open_session(&self, _system_prompt: &str) -> Result<Box<dyn LlmSession>, LlmError> {
        Ok(Box::new(ScriptedSession { script: self.clone() }))
    }
}

struct ScriptedSession {
    script: ScriptedLlm,
}

#[async_trait]
impl LlmSession for ScriptedSession {
    async fn prompt(&mut self, input: &str, _opts: &GenerateOptions) -> Result<String, LlmError> {
        self.script.next(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_responses_in_order() {
        let llm = ScriptedLlm::with_responses(["first", "second"]);
        let opts = GenerateOptions::default();

        assert_eq!(llm.generate("a", &opts).await.unwrap(), "first");
        assert_eq!(llm.generate("b", &opts).await.unwrap(), "second");
        assert!(llm.generate("c", &opts).await.is_err());
        assert_eq!(llm.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn sessions_share_the_queue() {
        let llm = ScriptedLlm::with_responses(["turn one", "turn two"]);
        let mut session = llm.open_session("system").await.unwrap();
        let opts = GenerateOptions::default();

        assert_eq!(session.prompt("Task: x", &opts).await.unwrap(), "turn one");
        assert_eq!(llm.generate("y", &opts).await.unwrap(), "turn two");
    }
}
