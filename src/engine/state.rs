//! Stack State Persistence
//!
//! A stack checkpoint records everything the engine knows about a deployed
//! stack: configuration, pinned plugins, every resource with its inputs and
//! provider-assigned outputs, and the exported stack outputs. Two backends
//! are provided:
//! - **JSON**: one pretty-printed file per stack under the workspace
//!   directory (the durable default)
//! - **Memory**: in-process storage for tests
//!
//! Both implement the [`StatePersistence`] trait.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during state persistence
#[derive(Error, Debug)]
pub enum StateError {
    #[error("State persistence error: {0}")]
    Persistence(String),

    #[error("No recorded state for stack: {0}")]
    StateNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for state operations
pub type StateResult<T> = Result<T, StateError>;

/// A pinned provider plugin recorded in the checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRecord {
    /// Plugin name (e.g. "azure-native")
    pub name: String,
    /// Pinned version (e.g. "v1.23.0")
    pub version: String,
}

/// One deployed resource as recorded in the checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Stable resource URN within the stack
    pub urn: String,
    /// Provider type token (e.g. "azure:network:PublicIpAddress")
    pub token: String,
    /// Logical name used in the program
    pub name: String,
    /// Provider-assigned physical name
    pub physical_name: String,
    /// Provider-assigned id
    pub id: String,
    /// URN of the parent resource or component, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Declared inputs at the time of the last apply
    pub inputs: Value,
    /// Provider-assigned outputs
    pub outputs: serde_json::Map<String, Value>,
    /// When the resource was first created
    pub created_at: DateTime<Utc>,
}

/// The full checkpoint for one stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackState {
    /// Project name
    pub project: String,
    /// Stack name
    pub stack: String,
    /// Monotonically increasing checkpoint serial
    pub serial: u64,
    /// Stack configuration values
    #[serde(default)]
    pub config: IndexMap<String, String>,
    /// Provider plugins pinned at the last operation
    #[serde(default)]
    pub plugins: Vec<PluginRecord>,
    /// Deployed resources in registration order
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
    /// Exported stack outputs
    #[serde(default)]
    pub outputs: IndexMap<String, Value>,
    /// When this checkpoint was written
    pub updated_at: DateTime<Utc>,
}

impl StackState {
    /// An empty checkpoint for a fresh stack.
    pub fn new(project: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            stack: stack.into(),
            serial: 0,
            config: IndexMap::new(),
            plugins: Vec::new(),
            resources: Vec::new(),
            outputs: IndexMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Look up a recorded resource by URN.
    pub fn resource(&self, urn: &str) -> Option<&ResourceRecord> {
        self.resources.iter().find(|r| r.urn == urn)
    }

    /// Whether the stack has any deployed resources or exports.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.outputs.is_empty()
    }
}

/// Persistence backend type
#[derive(Debug, Clone)]
pub enum StateBackend {
    /// JSON file-based storage rooted at the given workspace directory
    Json(PathBuf),
    /// In-memory storage (for testing)
    Memory,
}

impl StateBackend {
    /// Construct the persistence implementation for this backend.
    pub fn open(&self) -> StateResult<Box<dyn StatePersistence>> {
        match self {
            Self::Json(dir) => Ok(Box::new(JsonStateBackend::new(dir.clone())?)),
            Self::Memory => Ok(Box::new(MemoryStateBackend::default())),
        }
    }
}

/// Trait for stack checkpoint storage.
pub trait StatePersistence: Send + Sync {
    /// Persist a checkpoint, replacing any previous one for the same stack.
    fn save(&self, state: &StackState) -> StateResult<()>;

    /// Load the checkpoint for a stack, if one exists.
    fn load(&self, project: &str, stack: &str) -> StateResult<Option<StackState>>;

    /// Remove the checkpoint for a stack.
    fn remove(&self, project: &str, stack: &str) -> StateResult<()>;
}

// ============================================================================
// JSON Backend
// ============================================================================

/// JSON file-based checkpoint storage.
///
/// Checkpoints live under `<workspace>/.updraft/<project>/<stack>.json`.
pub struct JsonStateBackend {
    stacks_dir: PathBuf,
}

impl JsonStateBackend {
    /// Create the backend, ensuring the storage directory exists.
    pub fn new(workspace_dir: PathBuf) -> StateResult<Self> {
        let stacks_dir = workspace_dir.join(".updraft");
        fs::create_dir_all(&stacks_dir)?;
        Ok(Self { stacks_dir })
    }

    fn state_path(&self, project: &str, stack: &str) -> PathBuf {
        self.stacks_dir.join(project).join(format!("{}.json", stack))
    }
}

impl StatePersistence for JsonStateBackend {
    fn save(&self, state: &StackState) -> StateResult<()> {
        let path = self.state_path(&state.project, &state.stack);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, state)?;
        Ok(())
    }

    fn load(&self, project: &str, stack: &str) -> StateResult<Option<StackState>> {
        let path = self.state_path(project, stack);
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(&path)?;
        let reader = BufReader::new(file);
        let state: StackState = serde_json::from_reader(reader)?;
        Ok(Some(state))
    }

    fn remove(&self, project: &str, stack: &str) -> StateResult<()> {
        let path = self.state_path(project, stack);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

// ============================================================================
// Memory Backend
// ============================================================================

/// In-memory checkpoint storage for tests.
#[derive(Default)]
pub struct MemoryStateBackend {
    states: RwLock<HashMap<String, StackState>>,
}

impl MemoryStateBackend {
    fn key(project: &str, stack: &str) -> String {
        format!("{}/{}", project, stack)
    }
}

impl StatePersistence for MemoryStateBackend {
    fn save(&self, state: &StackState) -> StateResult<()> {
        self.states
            .write()
            .insert(Self::key(&state.project, &state.stack), state.clone());
        Ok(())
    }

    fn load(&self, project: &str, stack: &str) -> StateResult<Option<StackState>> {
        Ok(self.states.read().get(&Self::key(project, stack)).cloned())
    }

    fn remove(&self, project: &str, stack: &str) -> StateResult<()> {
        self.states.write().remove(&Self::key(project, stack));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_state() -> StackState {
        let mut state = StackState::new("update-management", "dev");
        state.serial = 3;
        state.plugins.push(PluginRecord {
            name: "azure-native".to_string(),
            version: "v1.23.0".to_string(),
        });
        state.resources.push(ResourceRecord {
            urn: "urn:updraft:dev::update-management::azure:resources:ResourceGroup::dev-mgmt"
                .to_string(),
            token: "azure:resources:ResourceGroup".to_string(),
            name: "dev-mgmt".to_string(),
            physical_name: "dev-mgmt".to_string(),
            id: "/subscriptions/xxx/resourceGroups/dev-mgmt".to_string(),
            parent: None,
            inputs: json!({"location": "westeurope"}),
            outputs: json!({"name": "dev-mgmt"}).as_object().unwrap().clone(),
            created_at: Utc::now(),
        });
        state
            .outputs
            .insert("automation_account".to_string(), json!("aa-dev-mgmt"));
        state
    }

    #[test]
    fn test_json_backend_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonStateBackend::new(dir.path().to_path_buf()).unwrap();

        assert!(backend.load("update-management", "dev").unwrap().is_none());

        let state = sample_state();
        backend.save(&state).unwrap();

        let loaded = backend.load("update-management", "dev").unwrap().unwrap();
        assert_eq!(loaded.serial, 3);
        assert_eq!(loaded.resources.len(), 1);
        assert_eq!(loaded.plugins[0].version, "v1.23.0");
        assert_eq!(loaded.outputs["automation_account"], json!("aa-dev-mgmt"));

        backend.remove("update-management", "dev").unwrap();
        assert!(backend.load("update-management", "dev").unwrap().is_none());
    }

    #[test]
    fn test_memory_backend_roundtrip() {
        let backend = MemoryStateBackend::default();
        let state = sample_state();
        backend.save(&state).unwrap();

        let loaded = backend.load("update-management", "dev").unwrap().unwrap();
        assert_eq!(loaded.stack, "dev");

        backend.remove("update-management", "dev").unwrap();
        assert!(backend.load("update-management", "dev").unwrap().is_none());
    }

    #[test]
    fn test_resource_lookup() {
        let state = sample_state();
        assert!(state
            .resource("urn:updraft:dev::update-management::azure:resources:ResourceGroup::dev-mgmt")
            .is_some());
        assert!(state.resource("urn:updraft:dev::missing").is_none());
        assert!(!state.is_empty());
    }
}
