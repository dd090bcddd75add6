//! The execution context handed to node executors.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use weft_core::{NodeStatus, ProgressEvent, ProgressSink};
use weft_llm::Llm;
use weft_tools::ToolRegistry;

/// Everything a node executor can reach during a run: the LLM facade,
/// the live tool registry, the progress sink, and the run's log buffer.
#[derive(Clone)]
pub struct ExecutionContext {
    pub workflow_id: String,
    pub llm: Arc<dyn Llm>,
    pub tools: Arc<ToolRegistry>,
    sink: Arc<dyn ProgressSink>,
    logs: Arc<Mutex<Vec<String>>>,
}

impl ExecutionContext {
    pub fn new(
        workflow_id: impl Into<String>,
        llm: Arc<dyn Llm>,
        tools: Arc<ToolRegistry>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            llm,
            tools,
            sink,
            logs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Appends one line to the execution log, prefixed `HH:MM:SS`, and
    /// mirrors it to the progress sink.
    pub fn log(&self, message: impl AsRef<str>) {
        let line = format!(
            "{} {}",
            chrono::Local::now().format("%H:%M:%S"),
            message.as_ref()
        );
        self.logs.lock().expect("log lock").push(line.clone());
        self.sink.emit(ProgressEvent::Log { line });
    }

    /// Reports node-level progress. Fire-and-forget: the sink is never
    /// awaited.
    pub fn send_progress(&self, node_id: &str, status: NodeStatus, data: Option<Value>) {
        self.sink.emit(ProgressEvent::NodeProgress {
            node_id: node_id.to_string(),
            status,
            data,
        });
    }

    /// Emits a raw progress event.
    pub fn emit(&self, event: ProgressEvent) {
        self.sink.emit(event);
    }

    /// A snapshot of the log collected so far.
    pub fn logs(&self) -> Vec<String> {
        self.logs.lock().expect("log lock").clone()
    }
}
