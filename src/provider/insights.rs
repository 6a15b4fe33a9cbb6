//! Log-analytics resource types and the shared-keys lookup.
//!
//! ## WorkspaceProvider
//!
//! A log-analytics workspace with a retention policy and a pricing sku. The
//! resolved workspace name feeds the solution name downstream, and the
//! synthesized `customer_id` is the workspace id agents report to.
//!
//! ## LinkedServiceProvider
//!
//! Binds an automation account to a workspace. The service name must be
//! `automation` for update management to activate; anything else is rejected
//! by the control plane, not here.
//!
//! ## SolutionProvider
//!
//! A gallery solution (e.g. `Updates(<workspace>)`) bound to a workspace.

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::{parse_args, physical_name, resource_id, require, ProviderResult};
use super::{ResourceOutputs, ResourceProvider};

const WORKSPACE_TOKEN: &str = "azure:operationalinsights:Workspace";
const LINKED_SERVICE_TOKEN: &str = "azure:operationalinsights:LinkedService";
const SOLUTION_TOKEN: &str = "azure:operationsmanagement:Solution";

/// Workspace pricing sku.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSkuArgs {
    /// Sku name (e.g. "PerGB2018")
    pub name: String,
}

/// Arguments for a log-analytics workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceArgs {
    /// Explicit workspace name; auto-named when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_name: Option<String>,
    /// Resource group holding the workspace
    pub resource_group_name: String,
    /// Azure region
    pub location: String,
    /// Data retention in days
    pub retention_in_days: i64,
    /// Pricing sku
    pub sku: WorkspaceSkuArgs,
}

/// Azure Log Analytics Workspace resource type.
pub struct WorkspaceProvider;

#[async_trait]
impl ResourceProvider for WorkspaceProvider {
    fn token(&self) -> &'static str {
        WORKSPACE_TOKEN
    }

    fn description(&self) -> &'static str {
        "A log-analytics workspace collecting agent and solution data"
    }

    fn validate(&self, inputs: &Value) -> ProviderResult<()> {
        let args: WorkspaceArgs = parse_args(WORKSPACE_TOKEN, inputs)?;
        require(WORKSPACE_TOKEN, "resource_group_name", &args.resource_group_name)?;
        require(WORKSPACE_TOKEN, "location", &args.location)?;
        require(WORKSPACE_TOKEN, "sku.name", &args.sku.name)
    }

    async fn create(&self, name: &str, inputs: &Value) -> ProviderResult<ResourceOutputs> {
        self.validate(inputs)?;
        let args: WorkspaceArgs = parse_args(WORKSPACE_TOKEN, inputs)?;

        let physical = physical_name(name, args.workspace_name.as_deref());
        tracing::info!(
            name = physical.as_str(),
            retention_in_days = args.retention_in_days,
            sku = args.sku.name.as_str(),
            "creating log-analytics workspace"
        );

        let outputs = json!({
            "id": resource_id(
                &args.resource_group_name,
                "Microsoft.OperationalInsights",
                "workspaces",
                &physical,
            ),
            "name": physical,
            "customer_id": uuid::Uuid::new_v4().to_string(),
            "retention_in_days": args.retention_in_days,
        });
        Ok(outputs.as_object().cloned().unwrap_or_default())
    }
}

/// Arguments for a workspace linked service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedServiceArgs {
    /// Linked service name ("automation" activates update management)
    pub linked_service_name: String,
    /// Resource group holding the workspace
    pub resource_group_name: String,
    /// Name of the workspace being linked
    pub workspace_name: String,
    /// Id of the resource granted write access (the automation account)
    pub write_access_resource_id: String,
}

/// Azure Log Analytics Linked Service resource type.
pub struct LinkedServiceProvider;

#[async_trait]
impl ResourceProvider for LinkedServiceProvider {
    fn token(&self) -> &'static str {
        LINKED_SERVICE_TOKEN
    }

    fn description(&self) -> &'static str {
        "Links an automation account to a log-analytics workspace"
    }

    fn validate(&self, inputs: &Value) -> ProviderResult<()> {
        let args: LinkedServiceArgs = parse_args(LINKED_SERVICE_TOKEN, inputs)?;
        require(LINKED_SERVICE_TOKEN, "linked_service_name", &args.linked_service_name)?;
        require(LINKED_SERVICE_TOKEN, "resource_group_name", &args.resource_group_name)?;
        require(LINKED_SERVICE_TOKEN, "workspace_name", &args.workspace_name)?;
        require(
            LINKED_SERVICE_TOKEN,
            "write_access_resource_id",
            &args.write_access_resource_id,
        )
    }

    async fn create(&self, name: &str, inputs: &Value) -> ProviderResult<ResourceOutputs> {
        self.validate(inputs)?;
        let args: LinkedServiceArgs = parse_args(LINKED_SERVICE_TOKEN, inputs)?;

        tracing::info!(
            name,
            workspace = args.workspace_name.as_str(),
            service = args.linked_service_name.as_str(),
            "creating linked service"
        );

        let id = format!(
            "{}/linkedServices/{}",
            resource_id(
                &args.resource_group_name,
                "Microsoft.OperationalInsights",
                "workspaces",
                &args.workspace_name,
            ),
            args.linked_service_name,
        );
        let outputs = json!({
            "id": id,
            "name": args.linked_service_name,
        });
        Ok(outputs.as_object().cloned().unwrap_or_default())
    }
}

/// Plan of a gallery solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionPlanArgs {
    pub name: String,
    pub product: String,
    pub publisher: String,
    #[serde(default)]
    pub promotion_code: String,
}

/// Properties of a gallery solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionPropertiesArgs {
    /// Id of the workspace the solution is bound to
    pub workspace_resource_id: String,
}

/// Arguments for a gallery solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionArgs {
    /// Solution name, `<plan>(<workspace>)` by convention
    pub solution_name: String,
    /// Resource group holding the solution
    pub resource_group_name: String,
    /// Azure region
    pub location: String,
    /// Gallery plan
    pub plan: SolutionPlanArgs,
    /// Solution properties
    pub properties: SolutionPropertiesArgs,
}

/// Azure Operations Management Solution resource type.
pub struct SolutionProvider;

#[async_trait]
impl ResourceProvider for SolutionProvider {
    fn token(&self) -> &'static str {
        SOLUTION_TOKEN
    }

    fn description(&self) -> &'static str {
        "A gallery solution deployed into a log-analytics workspace"
    }

    fn validate(&self, inputs: &Value) -> ProviderResult<()> {
        let args: SolutionArgs = parse_args(SOLUTION_TOKEN, inputs)?;
        require(SOLUTION_TOKEN, "solution_name", &args.solution_name)?;
        require(SOLUTION_TOKEN, "resource_group_name", &args.resource_group_name)?;
        require(SOLUTION_TOKEN, "plan.name", &args.plan.name)?;
        require(
            SOLUTION_TOKEN,
            "properties.workspace_resource_id",
            &args.properties.workspace_resource_id,
        )
    }

    async fn create(&self, name: &str, inputs: &Value) -> ProviderResult<ResourceOutputs> {
        self.validate(inputs)?;
        let args: SolutionArgs = parse_args(SOLUTION_TOKEN, inputs)?;

        tracing::info!(
            name,
            solution = args.solution_name.as_str(),
            product = args.plan.product.as_str(),
            "creating solution"
        );

        let outputs = json!({
            "id": resource_id(
                &args.resource_group_name,
                "Microsoft.OperationsManagement",
                "solutions",
                &args.solution_name,
            ),
            "name": args.solution_name,
        });
        Ok(outputs.as_object().cloned().unwrap_or_default())
    }
}

// ============================================================================
// Shared keys lookup
// ============================================================================

/// Shared access keys of a workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedKeys {
    pub primary_shared_key: String,
    pub secondary_shared_key: String,
}

/// Look up the shared access keys of a workspace.
///
/// Keys are synthesized deterministically from the workspace coordinates so
/// repeated lookups agree across runs; anything keyed off them diffs clean.
pub async fn get_shared_keys(
    resource_group_name: &str,
    workspace_name: &str,
) -> ProviderResult<SharedKeys> {
    require(WORKSPACE_TOKEN, "resource_group_name", resource_group_name)?;
    require(WORKSPACE_TOKEN, "workspace_name", workspace_name)?;

    tracing::debug!(
        resource_group = resource_group_name,
        workspace = workspace_name,
        "reading workspace shared keys"
    );

    let derive = |label: &str| {
        let mut hasher = Sha256::new();
        hasher.update(label.as_bytes());
        hasher.update(resource_group_name.as_bytes());
        hasher.update(b"/");
        hasher.update(workspace_name.as_bytes());
        base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
    };

    Ok(SharedKeys {
        primary_shared_key: derive("primary"),
        secondary_shared_key: derive("secondary"),
    })
}
