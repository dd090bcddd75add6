//! Observer callbacks fired as the loop progresses.

use std::sync::Arc;

use serde_json::Value;

/// Progress notifications emitted during an orchestrator run.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    /// The model produced a thought.
    Thought(String),
    /// The model committed to a tool call.
    Action { tool: String, input: Value },
    /// A tool call finished (success or error payload).
    ToolComplete { tool: String, result: Value },
    /// A step was appended to memory.
    StepResult { step: usize, result: Option<Value> },
    /// The run finished with a final result.
    Complete(String),
    /// The run failed.
    Error(String),
}

/// Best-effort observer: exceptions must not abort the loop, so the
/// callback is infallible by construction.
pub type EventCallback = Arc<dyn Fn(OrchestratorEvent) + Send + Sync>;

/// Fires the callback when one is installed.
pub(crate) fn notify(callback: &Option<EventCallback>, event: OrchestratorEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}
