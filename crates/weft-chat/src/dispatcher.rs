//! The chat dispatcher: build-intent routing into the builder
//! meta-workflow, or freeform chat with command extraction.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use weft_builder::BuilderContext;
use weft_core::{Edge, Node, NullSink};
use weft_engine::{extract_primary_result, Engine};
use weft_llm::{GenerateOptions, Llm};
use weft_store::{TemplateRegistry, WorkflowStore};

use crate::commands::{extract_commands, CommandExecutor, CommandResult};
use crate::prompts;
use crate::session::{ChatMessage, SessionStore};

const CHAT_MAX_TOKENS: u32 = 600;
const HISTORY_WINDOW: usize = 6;

/// Verbs that signal the user wants something constructed.
const BUILD_VERBS: [&str; 11] = [
    "build",
    "create",
    "make",
    "generate",
    "design",
    "new workflow",
    "workflow that",
    "workflow to",
    "set up",
    "setup",
    "construct",
];

/// Objects a build verb must pair with. "workflo" catches the common
/// truncated typo.
const BUILD_OBJECTS: [&str; 9] = [
    "workflow",
    "workflo",
    "flow",
    "automation",
    "pipeline",
    "translator",
    "generator",
    "maker",
    "converter",
];

/// True when the message asks for a workflow to be built.
pub fn is_build_request(message: &str) -> bool {
    let lowered = message.to_lowercase();
    BUILD_VERBS.iter().any(|v| lowered.contains(v))
        && BUILD_OBJECTS.iter().any(|o| lowered.contains(o))
}

/// The graph produced by a build request.
#[derive(Debug, Clone, Serialize)]
pub struct BuiltWorkflow {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Outcome of routing a message into the builder meta-workflow.
#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub built_workflow: Option<BuiltWorkflow>,
}

/// What one chat turn produced.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub session_id: String,
    pub response: String,
    pub commands: Vec<Value>,
    pub command_results: Vec<CommandResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_result: Option<BuildResult>,
}

/// Session-scoped chat entry point.
pub struct ChatDispatcher {
    llm: Arc<dyn Llm>,
    engine: Arc<Engine>,
    store: Arc<WorkflowStore>,
    templates: Arc<TemplateRegistry>,
    builder: Arc<BuilderContext>,
    executor: CommandExecutor,
    sessions: SessionStore,
    plugin_names: Vec<String>,
    builder_workflow_id: Mutex<Option<String>>,
}

impl ChatDispatcher {
    pub fn new(
        llm: Arc<dyn Llm>,
        engine: Arc<Engine>,
        store: Arc<WorkflowStore>,
        templates: Arc<TemplateRegistry>,
        builder: Arc<BuilderContext>,
        plugin_names: Vec<String>,
    ) -> Self {
        let executor = CommandExecutor::new(
            Arc::clone(&engine),
            Arc::clone(&store),
            Arc::clone(&templates),
        );
        Self {
            llm,
            engine,
            store,
            templates,
            builder,
            executor,
            sessions: SessionStore::new(),
            plugin_names,
            builder_workflow_id: Mutex::new(None),
        }
    }

    /// The session store (for the HTTP session endpoints).
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handles one chat message. An unknown or expired session id gets
    /// a fresh session transparently.
    pub async fn chat(
        &self,
        session_id: Option<&str>,
        message: &str,
        execute_commands: bool,
    ) -> ChatOutcome {
        let session_id = self.resolve_session(session_id);
        self.sessions.with_session(&session_id, |session| {
            session.messages.push(ChatMessage::user(message));
        });

        if is_build_request(message) {
            return self.handle_build(&session_id, message).await;
        }
        self.handle_freeform(&session_id, message, execute_commands)
            .await
    }

    fn resolve_session(&self, session_id: Option<&str>) -> String {
        if let Some(id) = session_id {
            if self.sessions.with_session(id, |_| ()).is_some() {
                return id.to_string();
            }
        }
        self.sessions.create()
    }

    /// Locates the saved builder workflow (name containing "workflow
    /// builder"), caching its id after the first hit.
    fn builder_workflow(&self) -> Option<weft_store::SavedWorkflow> {
        let mut cached = self.builder_workflow_id.lock().expect("builder id lock");
        if let Some(id) = cached.clone() {
            match self.store.get(&id) {
                Ok(Some(saved)) => return Some(saved),
                _ => *cached = None,
            }
        }

        let found = self
            .store
            .list()
            .into_iter()
            .find(|w| w.name.to_lowercase().contains("workflow builder"));
        if let Some(saved) = &found {
            *cached = Some(saved.id.clone());
        }
        found
    }

    async fn handle_build(&self, session_id: &str, message: &str) -> ChatOutcome {
        info!("Build intent detected, routing into the builder workflow");

        let Some(saved) = self.builder_workflow() else {
            warn!("No builder workflow in the store");
            let response =
                "I couldn't find the workflow builder workflow; save one named \"Workflow Builder\" first.".to_string();
            self.append_assistant(session_id, &response);
            return ChatOutcome {
                session_id: session_id.to_string(),
                response,
                commands: Vec::new(),
                command_results: Vec::new(),
                build_result: Some(BuildResult {
                    success: false,
                    result: None,
                    error: Some("builder workflow not found".into()),
                    built_workflow: None,
                }),
            };
        };

        // Substitute the instrumented build prompt into the meta-workflow's
        // text-input node, then run it; the orchestrator drives the
        // builder tools from there.
        let mut doc = saved.to_workflow();
        if let Some(node) = doc.nodes.iter_mut().find(|n| n.type_id() == "text-input") {
            node.data
                .config
                .insert("text".into(), json!(prompts::build_prompt(message)));
        }

        let execution = self.engine.execute(&doc, Arc::new(NullSink)).await;

        let built = self.builder.with_state(|state| BuiltWorkflow {
            nodes: state.nodes.clone(),
            edges: state.edges.clone(),
        });

        let (response, build_result) = if execution.success {
            let result = extract_primary_result(&doc, &execution.outputs)
                .unwrap_or_else(|| "Workflow built".to_string());
            (
                format!("I've built your workflow! {result}"),
                BuildResult {
                    success: true,
                    result: Some(result),
                    error: None,
                    built_workflow: Some(built),
                },
            )
        } else {
            let error = execution
                .error
                .unwrap_or_else(|| "builder execution failed".to_string());
            (
                format!("I hit an error while building the workflow: {error}"),
                BuildResult {
                    success: false,
                    result: None,
                    error: Some(error),
                    built_workflow: Some(built),
                },
            )
        };

        self.append_assistant(session_id, &response);
        ChatOutcome {
            session_id: session_id.to_string(),
            response,
            commands: Vec::new(),
            command_results: Vec::new(),
            build_result: Some(build_result),
        }
    }

    async fn handle_freeform(
        &self,
        session_id: &str,
        message: &str,
        execute_commands: bool,
    ) -> ChatOutcome {
        let system = prompts::chat_system_prompt(&self.templates.summaries(), &self.plugin_names);
        let prompt = self.prompt_with_history(session_id, message);

        let opts = GenerateOptions {
            system_prompt: Some(system),
            max_tokens: Some(CHAT_MAX_TOKENS),
            temperature: None,
        };
        let response = match self.llm.generate(&prompt, &opts).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Chat generation failed: {e}");
                let response = "Sorry—there was an error generating the response.".to_string();
                self.append_assistant(session_id, &response);
                return ChatOutcome {
                    session_id: session_id.to_string(),
                    response,
                    commands: Vec::new(),
                    command_results: Vec::new(),
                    build_result: None,
                };
            }
        };

        let commands = extract_commands(&response);
        let mut command_results = Vec::new();

        if execute_commands && !commands.is_empty() {
            // Work on a canvas snapshot so the session lock is not held
            // across awaits, then write the mutated canvas back.
            let canvas = self
                .sessions
                .with_session(session_id, |s| s.canvas.clone());
            if let Some(mut canvas) = canvas {
                for cmd in &commands {
                    command_results.push(self.executor.execute(&mut canvas, cmd).await);
                }
                self.sessions
                    .with_session(session_id, |s| s.canvas = canvas);
            }
        }

        self.append_assistant(session_id, &response);
        ChatOutcome {
            session_id: session_id.to_string(),
            response,
            commands,
            command_results,
            build_result: None,
        }
    }

    /// Prepends a short window of the prior conversation to the prompt.
    fn prompt_with_history(&self, session_id: &str, message: &str) -> String {
        let history = self
            .sessions
            .with_session(session_id, |session| {
                let prior = session.messages.len().saturating_sub(1);
                session.messages[..prior]
                    .iter()
                    .rev()
                    .take(HISTORY_WINDOW)
                    .rev()
                    .map(|m| {
                        let role = match m.role {
                            crate::session::ChatRole::User => "user",
                            crate::session::ChatRole::Assistant => "assistant",
                        };
                        format!("{role}: {}", m.content)
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        if history.is_empty() {
            message.to_string()
        } else {
            format!("Conversation so far:\n{history}\n\nUser: {message}")
        }
    }

    fn append_assistant(&self, session_id: &str, response: &str) {
        self.sessions.with_session(session_id, |session| {
            session.messages.push(ChatMessage::assistant(response));
        });
    }
}
