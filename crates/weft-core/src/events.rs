//! Execution progress events and the observer trait the engine emits to.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-node execution status carried by progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Running,
    Complete,
    Error,
    Output,
}

/// An ordered execution event. Serialized with an `event` tag so the
/// WebSocket broadcast can forward events verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ProgressEvent {
    ExecutionStart {
        workflow_id: String,
    },
    Log {
        line: String,
    },
    NodeProgress {
        node_id: String,
        status: NodeStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    ExecutionComplete {
        workflow_id: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// Observer for execution events. Implementations must not block: the
/// engine fires events inline and never awaits the sink.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// A sink that discards every event.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_kebab_case_tags() {
        let event = ProgressEvent::NodeProgress {
            node_id: "n1".into(),
            status: NodeStatus::Running,
            data: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "node-progress");
        assert_eq!(json["nodeId"], "n1");
        assert_eq!(json["status"], "running");
    }
}
