//! Workflow persistence for weft: one JSON document per saved workflow
//! on disk, plus the template registry and first-run seeding.
//!
//! - [`WorkflowStore`] — save/get/list/delete/rename/duplicate
//! - [`SavedWorkflow`] — the on-disk record
//! - [`TemplateRegistry`] — built-in and directory-loaded templates
//! - [`seed_store`] — installs the Workflow Builder meta-workflow and
//!   example workflows into an empty store

mod templates;

pub use templates::{builder_workflow, seed_store, TemplateRegistry};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use weft_core::{Edge, Node, Workflow};

/// Errors raised by the workflow store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O failed for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode workflow: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("workflow not found: '{0}'")]
    NotFound(String),
}

impl StoreError {
    fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A saved workflow document, as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedWorkflow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub created_at: String,
    pub updated_at: String,
}

impl SavedWorkflow {
    /// The saved record as an executable workflow document.
    pub fn to_workflow(&self) -> Workflow {
        Workflow {
            id: self.id.clone(),
            name: self.name.clone(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Generates a workflow id: `wf_<ms>_<rand5>`.
fn generate_id() -> String {
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    format!("wf_{ms}_{suffix}")
}

/// Disk-backed workflow store: one `<id>.json` file per workflow under
/// the store directory. Mutations are serialized by an internal lock;
/// reads go straight to disk.
pub struct WorkflowStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl WorkflowStore {
    /// Opens (and creates if needed) a store rooted at `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(dir.display().to_string(), e))?;
        info!("Workflow store at {}", dir.display());
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn write(&self, workflow: &SavedWorkflow) -> Result<(), StoreError> {
        let path = self.path_for(&workflow.id);
        let json = serde_json::to_string_pretty(workflow)?;
        fs::write(&path, json).map_err(|e| StoreError::io(path.display().to_string(), e))
    }

    /// Saves a workflow. With `existing_id` set, updates that record in
    /// place (preserving `created_at`); otherwise allocates a fresh id.
    pub fn save(
        &self,
        name: &str,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        description: Option<&str>,
        existing_id: Option<&str>,
    ) -> Result<SavedWorkflow, StoreError> {
        let _guard = self.write_lock.lock().expect("store lock");

        let existing = existing_id.and_then(|id| self.get(id).ok().flatten());
        let now = now_rfc3339();
        let workflow = SavedWorkflow {
            id: existing
                .as_ref()
                .map(|w| w.id.clone())
                .unwrap_or_else(generate_id),
            name: name.to_string(),
            description: description
                .map(String::from)
                .or_else(|| existing.as_ref().map(|w| w.description.clone()))
                .unwrap_or_default(),
            nodes,
            edges,
            created_at: existing.map(|w| w.created_at).unwrap_or_else(|| now.clone()),
            updated_at: now,
        };

        self.write(&workflow)?;
        info!("Saved workflow '{}' ({})", workflow.name, workflow.id);
        Ok(workflow)
    }

    /// Loads a workflow by id. `Ok(None)` when the file does not exist.
    pub fn get(&self, id: &str) -> Result<Option<SavedWorkflow>, StoreError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let content =
            fs::read_to_string(&path).map_err(|e| StoreError::io(path.display().to_string(), e))?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// All saved workflows, most recently updated first. Unreadable
    /// files are logged and skipped.
    pub fn list(&self) -> Vec<SavedWorkflow> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot list workflow store: {e}");
                return Vec::new();
            }
        };

        let mut workflows: Vec<SavedWorkflow> = entries
            .flatten()
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|entry| {
                let path = entry.path();
                match fs::read_to_string(&path) {
                    Ok(content) => match serde_json::from_str(&content) {
                        Ok(workflow) => Some(workflow),
                        Err(e) => {
                            warn!("Skipping unreadable workflow {}: {e}", path.display());
                            None
                        }
                    },
                    Err(e) => {
                        warn!("Skipping unreadable workflow {}: {e}", path.display());
                        None
                    }
                }
            })
            .collect();

        workflows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        workflows
    }

    /// Deletes a workflow. Returns `false` when it did not exist.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().expect("store lock");
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| StoreError::io(path.display().to_string(), e))?;
        info!("Deleted workflow {id}");
        Ok(true)
    }

    /// Renames a workflow, bumping `updated_at`.
    pub fn rename(&self, id: &str, name: &str) -> Result<SavedWorkflow, StoreError> {
        let _guard = self.write_lock.lock().expect("store lock");
        let mut workflow = self
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        workflow.name = name.to_string();
        workflow.updated_at = now_rfc3339();
        self.write(&workflow)?;
        Ok(workflow)
    }

    /// Copies a workflow under a fresh id.
    pub fn duplicate(&self, id: &str, name: Option<&str>) -> Result<SavedWorkflow, StoreError> {
        let source = self
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let copy_name = name
            .map(String::from)
            .unwrap_or_else(|| format!("{} (copy)", source.name));
        self.save(
            &copy_name,
            source.nodes.clone(),
            source.edges.clone(),
            Some(&source.description),
            None,
        )
    }
}
