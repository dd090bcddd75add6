//! Step memory kept by the autonomous orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminal and in-flight states of an orchestrator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorStatus {
    InProgress,
    Complete,
    Error,
}

/// One Reason-Act-Observe step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorStep {
    pub thought: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl OrchestratorStep {
    /// Creates a step holding only a thought, stamped now.
    pub fn thought(thought: impl Into<String>) -> Self {
        Self {
            thought: thought.into(),
            action: None,
            input: None,
            result: None,
            timestamp: Utc::now(),
        }
    }
}

/// The full record of an orchestrator run: task, bounded step list,
/// terminal status, and the final result when one was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorMemory {
    pub task: String,
    pub steps: Vec<OrchestratorStep>,
    pub status: OrchestratorStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_result: Option<String>,
}

impl OrchestratorMemory {
    /// Creates an in-progress memory for the given task.
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            steps: Vec::new(),
            status: OrchestratorStatus::InProgress,
            final_result: None,
        }
    }

    /// The thought recorded by the most recent step, if any.
    pub fn last_thought(&self) -> Option<&str> {
        self.steps.last().map(|s| s.thought.as_str())
    }
}
