//! Stack Engine
//!
//! The engine owns the declaration-and-apply lifecycle of one stack:
//!
//! - A [`StackProgram`] declares resources against a [`StackContext`]; each
//!   [`StackContext::register`] call compares the declared inputs with the
//!   recorded checkpoint and either plans (preview) or performs (apply) the
//!   operation, in registration order.
//! - [`Stack::refresh`] re-reads the checkpoint, [`Stack::preview`] computes
//!   a plan without touching the provider or the checkpoint, [`Stack::up`]
//!   applies the program and persists the new checkpoint, [`Stack::destroy`]
//!   deletes every recorded resource in reverse order and clears exports.
//!
//! Dependency ordering is expressed only by chaining [`Output`] values from
//! one registration into the inputs of the next; the engine has no
//! synchronization of its own.

pub mod output;
pub mod plan;
pub mod state;

use std::collections::HashSet;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::provider::{self, ProviderError, ProviderRegistry, ResourceOutputs};

pub use output::Output;
pub use plan::{ChangeSummary, PlanStep, StepOp};
pub use state::{PluginRecord, ResourceRecord, StackState, StateBackend};

/// How a program run treats the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecMode {
    /// Plan only; the provider is never invoked
    Preview,
    /// Perform the planned operations
    Apply,
}

/// The lifecycle operation a summary describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Refresh,
    Preview,
    Update,
    Destroy,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Refresh => write!(f, "refresh"),
            OperationKind::Preview => write!(f, "preview"),
            OperationKind::Update => write!(f, "update"),
            OperationKind::Destroy => write!(f, "destroy"),
        }
    }
}

/// Result summary of one lifecycle operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSummary {
    /// Operation that produced this summary
    pub kind: OperationKind,
    /// Operation result ("succeeded"; failures propagate as errors instead)
    pub result: String,
    /// Unique id of this operation
    pub deployment_id: Uuid,
    /// Per-operation resource counts
    pub resource_changes: ChangeSummary,
    /// Wall-clock duration of the operation
    pub duration_ms: u64,
}

impl UpdateSummary {
    fn new(kind: OperationKind, resource_changes: ChangeSummary, started: Instant) -> Self {
        Self {
            kind,
            result: "succeeded".to_string(),
            deployment_id: Uuid::new_v4(),
            resource_changes,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Result of [`Stack::preview`].
#[derive(Debug, Clone)]
pub struct PreviewResult {
    /// Operation summary
    pub summary: UpdateSummary,
    /// The full plan, one step per resource
    pub steps: Vec<PlanStep>,
}

/// Result of [`Stack::up`].
#[derive(Debug, Clone)]
pub struct UpResult {
    /// Operation summary
    pub summary: UpdateSummary,
    /// Exported stack outputs as persisted
    pub outputs: IndexMap<String, Value>,
}

/// Registration options for one resource.
#[derive(Debug, Clone, Default)]
pub struct ResourceOptions {
    /// URN of the parent resource or component, if any
    pub parent: Option<String>,
}

impl ResourceOptions {
    /// Options with a parent URN.
    pub fn parent(urn: impl Into<String>) -> Self {
        Self {
            parent: Some(urn.into()),
        }
    }
}

/// Handle to a registered resource; field access goes through [`Output`]s
/// because provider-assigned values exist only once the resource does.
#[derive(Debug, Clone)]
pub struct RegisteredResource {
    /// Stable resource URN
    pub urn: String,
    /// Provider type token
    pub token: String,
    /// Logical name used in the program
    pub logical_name: String,
    outputs: Output<ResourceOutputs>,
}

impl RegisteredResource {
    /// One provider-assigned output by key.
    pub fn output(&self, key: &str) -> Output<Value> {
        match &self.outputs {
            Output::Known(map) => match map.get(key) {
                Some(value) => Output::known(value.clone()),
                None => Output::computed(),
            },
            Output::Computed => Output::computed(),
        }
    }

    /// The provider-assigned id.
    pub fn id(&self) -> Output<String> {
        self.output("id")
            .map(|v| v.as_str().unwrap_or_default().to_string())
    }

    /// The provider-assigned (possibly normalized) physical name.
    pub fn name(&self) -> Output<String> {
        self.output("name")
            .map(|v| v.as_str().unwrap_or_default().to_string())
    }
}

/// A declaration program run against a [`StackContext`].
#[async_trait]
pub trait StackProgram: Send + Sync {
    /// Declare every resource and export of the stack.
    async fn declare(&self, ctx: &mut StackContext<'_>) -> Result<()>;
}

/// Per-run context a program declares resources against.
pub struct StackContext<'a> {
    mode: ExecMode,
    project: String,
    stack: String,
    config: IndexMap<String, String>,
    registry: &'a ProviderRegistry,
    prior: StackState,
    seen: HashSet<String>,
    steps: Vec<PlanStep>,
    records: Vec<ResourceRecord>,
    exports: IndexMap<String, Output<Value>>,
    sink: &'a mut (dyn FnMut(&str) + Send),
}

impl<'a> StackContext<'a> {
    fn new(
        mode: ExecMode,
        project: &str,
        stack: &str,
        config: IndexMap<String, String>,
        registry: &'a ProviderRegistry,
        prior: StackState,
        sink: &'a mut (dyn FnMut(&str) + Send),
    ) -> Self {
        Self {
            mode,
            project: project.to_string(),
            stack: stack.to_string(),
            config,
            registry,
            prior,
            seen: HashSet::new(),
            steps: Vec::new(),
            records: Vec::new(),
            exports: IndexMap::new(),
            sink,
        }
    }

    /// Name of the stack the program runs against.
    pub fn stack_name(&self) -> &str {
        &self.stack
    }

    /// Project the stack belongs to.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Whether this run only plans.
    pub fn is_preview(&self) -> bool {
        self.mode == ExecMode::Preview
    }

    /// A stack configuration value.
    pub fn config(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    /// A stack configuration value that must be present.
    pub fn require_config(&self, key: &str) -> Result<&str> {
        self.config(key)
            .ok_or_else(|| Error::MissingConfig(key.to_string()))
    }

    fn urn(&self, token: &str, name: &str) -> String {
        format!(
            "urn:updraft:{}::{}::{}::{}",
            self.stack, self.project, token, name
        )
    }

    fn emit(&mut self, line: &str) {
        (self.sink)(line);
    }

    /// Export a stack output.
    pub fn export(&mut self, name: impl Into<String>, value: Output<Value>) {
        self.exports.insert(name.into(), value);
    }

    /// Declare a component grouping (e.g. one declarator instance).
    ///
    /// Components are tracked in the checkpoint so their children can parent
    /// under them, but they have no provider operation of their own.
    pub async fn register_component(
        &mut self,
        token: &str,
        name: &str,
        opts: ResourceOptions,
    ) -> Result<RegisteredResource> {
        let urn = self.urn(token, name);
        if !self.seen.insert(urn.clone()) {
            return Err(Error::DuplicateResource(urn));
        }

        let inputs = Value::Object(serde_json::Map::new());
        let op = plan::classify(&self.prior, &urn, &inputs);
        let prior_record = self.prior.resource(&urn).cloned();

        if self.mode == ExecMode::Apply {
            self.records.push(ResourceRecord {
                urn: urn.clone(),
                token: token.to_string(),
                name: name.to_string(),
                physical_name: name.to_string(),
                id: String::new(),
                parent: opts.parent.clone(),
                inputs: inputs.clone(),
                outputs: ResourceOutputs::new(),
                created_at: prior_record
                    .as_ref()
                    .map(|r| r.created_at)
                    .unwrap_or_else(Utc::now),
            });
        }

        self.steps.push(PlanStep {
            urn: urn.clone(),
            token: token.to_string(),
            name: name.to_string(),
            op,
            before: prior_record.map(|r| r.inputs),
            after: Some(inputs),
        });

        Ok(RegisteredResource {
            urn,
            token: token.to_string(),
            logical_name: name.to_string(),
            outputs: Output::known(ResourceOutputs::new()),
        })
    }

    /// Declare one resource.
    ///
    /// In preview mode this classifies the operation and resolves outputs
    /// from the checkpoint where possible; in apply mode it performs the
    /// operation through the provider.
    pub async fn register(
        &mut self,
        token: &str,
        name: &str,
        inputs: Value,
        opts: ResourceOptions,
    ) -> Result<RegisteredResource> {
        let urn = self.urn(token, name);
        if !self.seen.insert(urn.clone()) {
            return Err(Error::DuplicateResource(urn));
        }

        let op = plan::classify(&self.prior, &urn, &inputs);
        let prior_record = self.prior.resource(&urn).cloned();

        let outputs = match self.mode {
            ExecMode::Preview => {
                let line = match op {
                    StepOp::Create => format!("+  {} {}: would create", token, name),
                    StepOp::Update => format!("~  {} {}: would update", token, name),
                    _ => format!("   {} {}: unchanged", token, name),
                };
                self.emit(&line);

                match &prior_record {
                    Some(record) if op != StepOp::Create => Output::known(record.outputs.clone()),
                    _ => Output::computed(),
                }
            }
            ExecMode::Apply => {
                let provider = self.registry.get(token).ok_or_else(|| {
                    ProviderError::UnknownResourceType(token.to_string())
                })?;

                let record = match op {
                    StepOp::Same => {
                        self.emit(&format!("   {} {}: unchanged", token, name));
                        let mut record = prior_record
                            .clone()
                            .expect("same-classified resource has a prior record");
                        record.parent = opts.parent.clone();
                        record
                    }
                    StepOp::Create => {
                        self.emit(&format!("+  {} {}: creating", token, name));
                        let outputs = provider.create(name, &inputs).await?;
                        record_from_outputs(&urn, token, name, &opts, &inputs, outputs, None)
                    }
                    StepOp::Update => {
                        self.emit(&format!("~  {} {}: updating", token, name));
                        let prior = prior_record
                            .clone()
                            .expect("update-classified resource has a prior record");
                        let outputs = provider.update(name, &inputs, &prior.outputs).await?;
                        record_from_outputs(&urn, token, name, &opts, &inputs, outputs, Some(prior))
                    }
                    StepOp::Delete => unreachable!("classify never yields delete"),
                };

                let outputs = record.outputs.clone();
                self.records.push(record);
                Output::known(outputs)
            }
        };

        self.steps.push(PlanStep {
            urn: urn.clone(),
            token: token.to_string(),
            name: name.to_string(),
            op,
            before: prior_record.map(|r| r.inputs),
            after: Some(inputs),
        });

        Ok(RegisteredResource {
            urn,
            token: token.to_string(),
            logical_name: name.to_string(),
            outputs,
        })
    }

    /// Handle recorded resources the program no longer declares. Runs after
    /// the program, in reverse registration order.
    async fn sweep_undeclared(&mut self) -> Result<()> {
        let undeclared: Vec<ResourceRecord> = self
            .prior
            .resources
            .iter()
            .rev()
            .filter(|record| !self.seen.contains(&record.urn))
            .cloned()
            .collect();

        for record in undeclared {
            match self.mode {
                ExecMode::Preview => {
                    self.emit(&format!(
                        "-  {} {}: would delete",
                        record.token, record.name
                    ));
                }
                ExecMode::Apply => {
                    self.emit(&format!("-  {} {}: deleting", record.token, record.name));
                    match self.registry.get(&record.token) {
                        Some(provider) => {
                            provider
                                .delete(&record.physical_name, &record.outputs)
                                .await?;
                        }
                        None if is_component_token(&record.token) => {}
                        None => {
                            return Err(
                                ProviderError::UnknownResourceType(record.token.clone()).into()
                            )
                        }
                    }
                }
            }
            self.steps.push(PlanStep {
                urn: record.urn.clone(),
                token: record.token.clone(),
                name: record.name.clone(),
                op: StepOp::Delete,
                before: Some(record.inputs.clone()),
                after: None,
            });
        }
        Ok(())
    }
}

/// Component tokens live in the `updraft:` namespace and have no provider.
fn is_component_token(token: &str) -> bool {
    token.starts_with("updraft:")
}

fn record_from_outputs(
    urn: &str,
    token: &str,
    name: &str,
    opts: &ResourceOptions,
    inputs: &Value,
    outputs: ResourceOutputs,
    prior: Option<ResourceRecord>,
) -> ResourceRecord {
    let physical_name = outputs
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(name)
        .to_string();
    let id = outputs
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    ResourceRecord {
        urn: urn.to_string(),
        token: token.to_string(),
        name: name.to_string(),
        physical_name,
        id,
        parent: opts.parent.clone(),
        inputs: inputs.clone(),
        outputs,
        created_at: prior.map(|r| r.created_at).unwrap_or_else(Utc::now),
    }
}

/// One stack of one project, bound to a state backend.
pub struct Stack {
    project: String,
    name: String,
    registry: ProviderRegistry,
    backend: Box<dyn state::StatePersistence>,
    state: StackState,
    config: IndexMap<String, String>,
    plugins: Vec<PluginRecord>,
}

impl Stack {
    /// Load the stack from the backend, or initialize a fresh one.
    pub fn create_or_select(
        project: impl Into<String>,
        name: impl Into<String>,
        backend: &StateBackend,
    ) -> Result<Self> {
        let project = project.into();
        let name = name.into();
        let persistence = backend.open()?;
        let state = persistence
            .load(&project, &name)?
            .unwrap_or_else(|| StackState::new(project.clone(), name.clone()));

        tracing::debug!(
            project = project.as_str(),
            stack = name.as_str(),
            serial = state.serial,
            resources = state.resources.len(),
            "selected stack"
        );

        Ok(Self {
            project,
            name,
            registry: ProviderRegistry::with_builtins(),
            backend: persistence,
            config: state.config.clone(),
            plugins: state.plugins.clone(),
            state,
        })
    }

    /// Stack name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Project name.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// The current checkpoint.
    pub fn state(&self) -> &StackState {
        &self.state
    }

    /// Exported outputs from the current checkpoint.
    pub fn outputs(&self) -> &IndexMap<String, Value> {
        &self.state.outputs
    }

    /// Pin a provider plugin. Only the bundled plugin at its pinned version
    /// is accepted.
    pub fn install_plugin(&mut self, name: &str, version: &str) -> Result<()> {
        if name != provider::PLUGIN_NAME {
            return Err(Error::UnknownPlugin(name.to_string()));
        }
        if version != provider::PLUGIN_VERSION {
            return Err(Error::PluginVersion {
                name: name.to_string(),
                requested: version.to_string(),
                bundled: provider::PLUGIN_VERSION.to_string(),
            });
        }

        let record = PluginRecord {
            name: name.to_string(),
            version: version.to_string(),
        };
        if !self.plugins.contains(&record) {
            self.plugins.push(record);
        }
        tracing::debug!(name, version, "provider plugin pinned");
        Ok(())
    }

    /// Set a stack configuration value.
    pub fn set_config(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.config.insert(key.into(), value.into());
    }

    /// Re-read the checkpoint from the backend, reporting each recorded
    /// resource. Never mutates anything.
    pub async fn refresh(&mut self, mut on_output: impl FnMut(&str) + Send) -> Result<UpdateSummary> {
        let started = Instant::now();
        if let Some(state) = self.backend.load(&self.project, &self.name)? {
            self.state = state;
        }

        let mut changes = ChangeSummary::default();
        for record in &self.state.resources {
            on_output(&format!("   {} {}: read", record.token, record.name));
            changes.record(StepOp::Same);
        }
        Ok(UpdateSummary::new(OperationKind::Refresh, changes, started))
    }

    /// Compute the plan for a program without applying it. The provider is
    /// never invoked and the checkpoint is untouched.
    pub async fn preview(
        &mut self,
        program: &dyn StackProgram,
        mut on_output: impl FnMut(&str) + Send,
    ) -> Result<PreviewResult> {
        let started = Instant::now();
        let mut ctx = StackContext::new(
            ExecMode::Preview,
            &self.project,
            &self.name,
            self.config.clone(),
            &self.registry,
            self.state.clone(),
            &mut on_output,
        );
        program.declare(&mut ctx).await?;
        ctx.sweep_undeclared().await?;

        let steps = ctx.steps;
        let summary = UpdateSummary::new(
            OperationKind::Preview,
            ChangeSummary::from_steps(&steps),
            started,
        );
        Ok(PreviewResult { summary, steps })
    }

    /// Apply a program: create, update and keep declared resources in
    /// registration order, delete undeclared recorded resources in reverse
    /// order, then persist the new checkpoint with the exported outputs.
    pub async fn up(
        &mut self,
        program: &dyn StackProgram,
        mut on_output: impl FnMut(&str) + Send,
    ) -> Result<UpResult> {
        let started = Instant::now();
        let mut ctx = StackContext::new(
            ExecMode::Apply,
            &self.project,
            &self.name,
            self.config.clone(),
            &self.registry,
            self.state.clone(),
            &mut on_output,
        );
        program.declare(&mut ctx).await?;
        ctx.sweep_undeclared().await?;

        let StackContext {
            steps,
            records,
            exports,
            ..
        } = ctx;

        let mut outputs = IndexMap::new();
        for (key, value) in exports {
            match value {
                Output::Known(value) => {
                    outputs.insert(key, value);
                }
                Output::Computed => return Err(Error::UnresolvedOutput(key)),
            }
        }

        self.state.serial += 1;
        self.state.config = self.config.clone();
        self.state.plugins = self.plugins.clone();
        self.state.resources = records;
        self.state.outputs = outputs.clone();
        self.state.updated_at = Utc::now();
        self.backend.save(&self.state)?;

        let summary = UpdateSummary::new(
            OperationKind::Update,
            ChangeSummary::from_steps(&steps),
            started,
        );
        Ok(UpResult { summary, outputs })
    }

    /// Delete every recorded resource in reverse registration order, clear
    /// the exports and persist the emptied checkpoint.
    pub async fn destroy(&mut self, mut on_output: impl FnMut(&str) + Send) -> Result<UpdateSummary> {
        let started = Instant::now();
        let mut changes = ChangeSummary::default();

        for record in self.state.resources.clone().iter().rev() {
            on_output(&format!("-  {} {}: deleting", record.token, record.name));
            match self.registry.get(&record.token) {
                Some(provider) => {
                    provider
                        .delete(&record.physical_name, &record.outputs)
                        .await?;
                }
                None if is_component_token(&record.token) => {}
                None => {
                    return Err(ProviderError::UnknownResourceType(record.token.clone()).into())
                }
            }
            changes.record(StepOp::Delete);
        }

        self.state.serial += 1;
        self.state.resources.clear();
        self.state.outputs.clear();
        self.state.updated_at = Utc::now();
        self.backend.save(&self.state)?;

        Ok(UpdateSummary::new(OperationKind::Destroy, changes, started))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct PairProgram;

    #[async_trait]
    impl StackProgram for PairProgram {
        async fn declare(&self, ctx: &mut StackContext<'_>) -> Result<()> {
            let rg = ctx
                .register(
                    "azure:resources:ResourceGroup",
                    "dev",
                    json!({"resource_group_name": "dev", "location": "westeurope"}),
                    ResourceOptions::default(),
                )
                .await?;
            ctx.export("rg_name", rg.name().map(Value::String));
            Ok(())
        }
    }

    struct DuplicateProgram;

    #[async_trait]
    impl StackProgram for DuplicateProgram {
        async fn declare(&self, ctx: &mut StackContext<'_>) -> Result<()> {
            let inputs = json!({"resource_group_name": "dev", "location": "westeurope"});
            ctx.register(
                "azure:resources:ResourceGroup",
                "dev",
                inputs.clone(),
                ResourceOptions::default(),
            )
            .await?;
            ctx.register(
                "azure:resources:ResourceGroup",
                "dev",
                inputs,
                ResourceOptions::default(),
            )
            .await?;
            Ok(())
        }
    }

    fn new_stack() -> Stack {
        Stack::create_or_select("update-management", "dev", &StateBackend::Memory).unwrap()
    }

    #[tokio::test]
    async fn test_up_records_and_exports() {
        let mut stack = new_stack();
        let result = stack.up(&PairProgram, |_| {}).await.unwrap();

        assert_eq!(result.summary.resource_changes.create, 1);
        assert_eq!(result.outputs["rg_name"], json!("dev"));
        assert_eq!(stack.state().resources.len(), 1);
        assert_eq!(stack.state().serial, 1);
    }

    #[tokio::test]
    async fn test_duplicate_registration_fails() {
        let mut stack = new_stack();
        let err = stack.up(&DuplicateProgram, |_| {}).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateResource(_)));
    }

    #[tokio::test]
    async fn test_plugin_pinning() {
        let mut stack = new_stack();
        assert!(stack.install_plugin("azure-native", "v1.23.0").is_ok());
        assert!(matches!(
            stack.install_plugin("aws-native", "v1.23.0"),
            Err(Error::UnknownPlugin(_))
        ));
        assert!(matches!(
            stack.install_plugin("azure-native", "v2.0.0"),
            Err(Error::PluginVersion { .. })
        ));
    }

    #[tokio::test]
    async fn test_preview_resolves_recorded_outputs() {
        let mut stack = new_stack();
        stack.up(&PairProgram, |_| {}).await.unwrap();

        let preview = stack.preview(&PairProgram, |_| {}).await.unwrap();
        assert_eq!(preview.summary.resource_changes.same, 1);
        assert!(!preview.summary.resource_changes.has_changes());
    }

    #[tokio::test]
    async fn test_refresh_counts_recorded_resources() {
        let mut stack = new_stack();
        stack.up(&PairProgram, |_| {}).await.unwrap();

        let mut lines = Vec::new();
        let summary = stack.refresh(|line| lines.push(line.to_string())).await.unwrap();
        assert_eq!(summary.kind, OperationKind::Refresh);
        assert_eq!(summary.resource_changes.same, 1);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_registered_resource_outputs() {
        let resource = RegisteredResource {
            urn: "urn:updraft:dev::p::t::n".to_string(),
            token: "t".to_string(),
            logical_name: "n".to_string(),
            outputs: Output::known(
                json!({"id": "/subscriptions/xxx/n", "name": "n-abc"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            ),
        };
        assert_eq!(resource.id().get().unwrap(), "/subscriptions/xxx/n");
        assert_eq!(resource.name().get().unwrap(), "n-abc");
        assert!(!resource.output("missing").is_known());
    }
}
