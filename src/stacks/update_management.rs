//! Centralized update-management declarator.
//!
//! Declares the fixed management unit: a user-assigned identity, an
//! automation account running as that identity, a log-analytics workspace
//! with the configured retention, the linked service binding account to
//! workspace, and the "Updates" gallery solution. The solution name is
//! derived from the *resolved* workspace name, which is only known once the
//! workspace exists.

use serde_json::{json, Map, Value};

use crate::engine::{RegisteredResource, ResourceOptions, StackContext};
use crate::error::Result;

/// Component token for one update-management unit.
pub const COMPONENT_TOKEN: &str = "updraft:stacks:UpdateManagement";

/// Arguments for [`UpdateManagement::declare`].
#[derive(Debug, Clone)]
pub struct UpdateManagementArgs {
    /// Resource group the management resources live in
    pub resource_group: RegisteredResource,
    /// Workspace data retention in days
    pub retention_in_days: i64,
}

/// The declared update-management unit.
#[derive(Debug, Clone)]
pub struct UpdateManagement {
    /// Component handle
    pub component: RegisteredResource,
    /// Identity the automation account runs as
    pub automation_user_identity: RegisteredResource,
    /// Automation account hosting update schedules
    pub automation_account: RegisteredResource,
    /// Log-analytics workspace
    pub log_analytics: RegisteredResource,
    /// Linked service binding the account to the workspace
    pub automation_linked_service: RegisteredResource,
    /// "Updates" solution deployed into the workspace
    pub automation_update_solution: RegisteredResource,
}

/// Turn `<id>` into `{ <id>: {} }`, the shape the identity map expects.
fn id_to_map(id: String) -> Value {
    let mut map = Map::new();
    map.insert(id, json!({}));
    Value::Object(map)
}

impl UpdateManagement {
    /// Declare the management unit under the given component name.
    pub async fn declare(
        ctx: &mut StackContext<'_>,
        name: &str,
        args: UpdateManagementArgs,
        opts: ResourceOptions,
    ) -> Result<Self> {
        let component = ctx.register_component(COMPONENT_TOKEN, name, opts).await?;

        let rg_name = args.resource_group.name();
        let rg_location = args.resource_group.output("location");

        let automation_user_identity = ctx
            .register(
                "azure:managedidentity:UserAssignedIdentity",
                &format!("id-{}", name),
                json!({
                    "location": rg_location.to_value(),
                    "resource_group_name": rg_name.to_value(),
                }),
                ResourceOptions::parent(&component.urn),
            )
            .await?;

        let automation_account = ctx
            .register(
                "azure:automation:AutomationAccount",
                name,
                json!({
                    "automation_account_name": format!("aa-{}", name),
                    "location": rg_location.to_value(),
                    "resource_group_name": rg_name.to_value(),
                    "sku": {
                        "name": "Basic",
                    },
                    "identity": {
                        "type": "UserAssigned",
                        "user_assigned_identities":
                            automation_user_identity.id().map(id_to_map).to_value(),
                    },
                }),
                ResourceOptions::parent(&component.urn),
            )
            .await?;

        let log_analytics = ctx
            .register(
                "azure:operationalinsights:Workspace",
                name,
                json!({
                    "workspace_name": format!("law-{}", name),
                    "location": rg_location.to_value(),
                    "resource_group_name": rg_name.to_value(),
                    "retention_in_days": args.retention_in_days,
                    "sku": {
                        "name": "PerGB2018",
                    },
                }),
                ResourceOptions::parent(&component.urn),
            )
            .await?;

        let automation_linked_service = ctx
            .register(
                "azure:operationalinsights:LinkedService",
                name,
                json!({
                    "linked_service_name": "automation", // name is important
                    "resource_group_name": rg_name.to_value(),
                    "workspace_name": log_analytics.name().to_value(),
                    "write_access_resource_id": automation_account.id().to_value(),
                }),
                ResourceOptions::parent(&log_analytics.urn),
            )
            .await?;

        let automation_update_solution = ctx
            .register(
                "azure:operationsmanagement:Solution",
                name,
                json!({
                    // name is important
                    "solution_name": log_analytics
                        .name()
                        .map(|n| format!("Updates({})", n))
                        .to_value(),
                    "location": rg_location.to_value(),
                    "resource_group_name": rg_name.to_value(),
                    "plan": {
                        "name": "Updates",
                        "product": "OMSGallery/Updates",
                        "publisher": "Microsoft",
                        "promotion_code": "",
                    },
                    "properties": {
                        "workspace_resource_id": log_analytics.id().to_value(),
                    },
                }),
                ResourceOptions::parent(&log_analytics.urn),
            )
            .await?;

        Ok(Self {
            component,
            automation_user_identity,
            automation_account,
            log_analytics,
            automation_linked_service,
            automation_update_solution,
        })
    }
}
