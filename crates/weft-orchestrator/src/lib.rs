//! The autonomous orchestrator: a bounded Reason-Act-Observe loop that
//! drives an LLM to emit `ACTION`/`INPUT`/`DONE` directives, dispatches
//! tool calls, and feeds observations back into a persistent session.
//!
//! - [`Orchestrator`] — owns the LLM facade and the tool registry
//! - [`OrchestratorConfig`] — step bound, enabled tools, custom prompt
//! - [`parser`] — tolerant directive parsing
//! - [`OrchestratorEvent`] — best-effort progress callbacks
//!
//! # Example
//!
//! ```rust,ignore
//! let orchestrator = Orchestrator::new(llm, tools);
//! let config = OrchestratorConfig {
//!     max_steps: 5,
//!     enabled_tools: vec!["calculator".into()],
//!     system_prompt: None,
//! };
//! let memory = orchestrator.run("What is 2+2?", &config, None).await;
//! assert_eq!(memory.status, OrchestratorStatus::Complete);
//! ```

mod events;
pub mod parser;
pub mod prompts;

pub use events::{EventCallback, OrchestratorEvent};
pub use parser::Directive;

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use weft_core::{OrchestratorMemory, OrchestratorStatus, OrchestratorStep};
use weft_llm::{GenerateOptions, Llm};
use weft_tools::ToolRegistry;

use crate::events::notify;

/// Configuration for one orchestrator run.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on loop iterations; `steps.len()` never exceeds it.
    pub max_steps: usize,
    /// Names of the tools the model may call this run.
    pub enabled_tools: Vec<String>,
    /// Optional preamble replacing the default system persona.
    pub system_prompt: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_steps: 5,
            enabled_tools: Vec::new(),
            system_prompt: None,
        }
    }
}

/// Drives the ReAct loop over a persistent LLM session.
pub struct Orchestrator {
    llm: Arc<dyn Llm>,
    tools: Arc<ToolRegistry>,
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn Llm>, tools: Arc<ToolRegistry>) -> Self {
        Self { llm, tools }
    }

    /// Runs the loop until the model says `DONE`, the step bound is
    /// reached, or the LLM fails. Tool and parse errors are surfaced to
    /// the model through the next prompt; only LLM failures end the run
    /// with `status == Error`.
    pub async fn run(
        &self,
        task: &str,
        config: &OrchestratorConfig,
        on_event: Option<EventCallback>,
    ) -> OrchestratorMemory {
        let mut memory = OrchestratorMemory::new(task);
        let enabled = &config.enabled_tools;

        if enabled.is_empty() {
            memory.status = OrchestratorStatus::Error;
            memory.final_result = Some("no tools".to_string());
            notify(&on_event, OrchestratorEvent::Error("no tools".into()));
            return memory;
        }

        info!(
            "Orchestrator run: {} step cap, tools [{}]",
            config.max_steps,
            enabled.join(", ")
        );

        let fragment = self.tools.descriptions_for_prompt(enabled);
        let system = prompts::system_prompt(&fragment, config.system_prompt.as_deref());

        // The session lives exactly as long as the loop; dropping the
        // handle at every return path disposes it.
        let mut session = match self.llm.open_session(&system).await {
            Ok(session) => session,
            Err(e) => {
                memory.status = OrchestratorStatus::Error;
                memory.final_result = Some(e.to_string());
                notify(&on_event, OrchestratorEvent::Error(e.to_string()));
                return memory;
            }
        };

        let opts = GenerateOptions {
            system_prompt: None,
            max_tokens: Some(200),
            temperature: Some(0.1),
        };

        let mut next_prompt = prompts::task_prompt(task);

        for step_index in 0..config.max_steps {
            let response = match session.prompt(&next_prompt, &opts).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("LLM failed mid-run: {e}");
                    memory.status = OrchestratorStatus::Error;
                    memory.final_result = Some(e.to_string());
                    notify(&on_event, OrchestratorEvent::Error(e.to_string()));
                    return memory;
                }
            };

            debug!("Turn {step_index}: {response}");
            let directive = parser::parse_response(&response);

            let mut step = OrchestratorStep {
                thought: directive.thought.clone().unwrap_or_default(),
                action: directive.action.clone(),
                input: directive.input.clone(),
                result: None,
                timestamp: chrono::Utc::now(),
            };

            if let Some(thought) = &directive.thought {
                notify(&on_event, OrchestratorEvent::Thought(thought.clone()));
            }

            // A DONE alongside an ACTION is the model hallucinating a
            // final after committing to a call; the action wins.
            if directive.action.is_none() {
                if let Some(final_result) = directive.done {
                    memory.steps.push(step);
                    memory.status = OrchestratorStatus::Complete;
                    memory.final_result = Some(final_result.clone());
                    notify(&on_event, OrchestratorEvent::Complete(final_result));
                    return memory;
                }
            }

            match &directive.action {
                Some(action) => {
                    let input = directive.input.clone().unwrap_or_else(|| json!({}));
                    notify(
                        &on_event,
                        OrchestratorEvent::Action {
                            tool: action.clone(),
                            input: input.clone(),
                        },
                    );

                    if !enabled.contains(action) {
                        let msg = format!(
                            "Tool \"{action}\" not enabled. Available: {}",
                            enabled.join(", ")
                        );
                        step.result = Some(json!({ "error": msg }));
                        next_prompt = format!("ERROR: {msg}");
                    } else {
                        match self.tools.get(action) {
                            None => {
                                step.result = Some(json!({ "error": "tool not found" }));
                                next_prompt = format!(
                                    "ERROR: Tool \"{action}\" not found. Available: {}",
                                    enabled.join(", ")
                                );
                            }
                            Some(tool) => match tool.execute(input).await {
                                Ok(result) => {
                                    notify(
                                        &on_event,
                                        OrchestratorEvent::ToolComplete {
                                            tool: action.clone(),
                                            result: result.clone(),
                                        },
                                    );
                                    next_prompt = format!("RESULT: {result}");
                                    step.result = Some(result);
                                }
                                Err(e) => {
                                    let msg = e.to_string();
                                    warn!("Tool '{action}' failed: {msg}");
                                    step.result = Some(json!({ "error": msg }));
                                    next_prompt = format!("ERROR: {msg}");
                                }
                            },
                        }
                    }
                }
                None => {
                    next_prompt = prompts::CONTINUE_PROMPT.to_string();
                }
            }

            notify(
                &on_event,
                OrchestratorEvent::StepResult {
                    step: step_index,
                    result: step.result.clone(),
                },
            );
            memory.steps.push(step);
        }

        memory.status = OrchestratorStatus::Complete;
        let last = memory.last_thought().unwrap_or_default().to_string();
        let final_result = format!("Reached maximum steps. Last progress: {last}");
        memory.final_result = Some(final_result.clone());
        notify(&on_event, OrchestratorEvent::Complete(final_result));
        memory
    }
}
