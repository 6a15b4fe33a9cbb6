//! Topology program
//!
//! Composes the full stack: one management resource group carrying the
//! update-management unit, one compute resource group with a virtual network,
//! and one monitored Linux VM per configured name, each wired to the
//! management workspace through deferred values. Exports the automation
//! account name and the id/name/public-IP record of every VM.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::DeployConfig;
use crate::engine::{Output, ResourceOptions, StackContext, StackProgram};
use crate::error::Result;
use crate::provider::insights;
use crate::stacks::{UpdateManagement, UpdateManagementArgs, VmLinux, VmLinuxArgs};

/// Workspace data retention applied to the management stack.
const LOG_RETENTION_DAYS: i64 = 30;

/// The update-management topology program.
#[derive(Debug, Clone)]
pub struct UpdateManagementProgram {
    /// Admin username provisioned on each VM
    pub admin_user: String,
    /// SSH public key authorized for the admin user
    pub admin_ssh_pubkey: String,
    /// Source address prefix allowed inbound on 22 and 80
    pub source_address_prefix: String,
}

impl UpdateManagementProgram {
    /// Build the program from deployment configuration, failing fast on
    /// missing values.
    pub fn from_config(config: &DeployConfig) -> Result<Self> {
        Ok(Self {
            admin_user: config.admin_user()?.to_string(),
            admin_ssh_pubkey: config.admin_ssh_pubkey()?.to_string(),
            source_address_prefix: config.access_source_address_prefix()?.to_string(),
        })
    }

    /// The configured VM names, a single `<stack>01` entry.
    fn vm_names(stack_name: &str) -> Vec<String> {
        vec![format!("{}01", stack_name)]
    }
}

#[async_trait]
impl StackProgram for UpdateManagementProgram {
    async fn declare(&self, ctx: &mut StackContext<'_>) -> Result<()> {
        let stack_name = ctx.stack_name().to_string();
        let location = ctx.require_config("azure-native:location")?.to_string();

        // Declare management resources
        let rg_management = ctx
            .register(
                "azure:resources:ResourceGroup",
                &format!("{}-mgmt", stack_name),
                json!({"location": location}),
                ResourceOptions::default(),
            )
            .await?;
        let update_management = UpdateManagement::declare(
            ctx,
            &format!("{}-mgmt", stack_name),
            UpdateManagementArgs {
                resource_group: rg_management.clone(),
                retention_in_days: LOG_RETENTION_DAYS,
            },
            ResourceOptions::default(),
        )
        .await?;
        ctx.export(
            "automation_account",
            update_management
                .automation_account
                .name()
                .map(Value::String),
        );

        // Declare compute resources
        let rg_compute = ctx
            .register(
                "azure:resources:ResourceGroup",
                &stack_name,
                json!({"location": location}),
                ResourceOptions::default(),
            )
            .await?;
        let vnet_compute = ctx
            .register(
                "azure:network:VirtualNetwork",
                "virtualNetwork",
                json!({
                    "virtual_network_name": stack_name,
                    "address_space": {
                        "address_prefixes": ["10.0.0.0/16"],
                    },
                    "subnets": [{
                        "name": stack_name,
                        "address_prefix": "10.0.0.0/16",
                    }],
                    "location": rg_compute.output("location").to_value(),
                    "resource_group_name": rg_compute.name().to_value(),
                }),
                ResourceOptions::default(),
            )
            .await?;
        let subnet_id = vnet_compute.output("subnets").map(|subnets| {
            subnets
                .get(0)
                .and_then(|s| s.get("id"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        });

        // The workspace shared key resolves only once the workspace exists
        let coords = rg_management
            .name()
            .zip(update_management.log_analytics.name());
        let shared_keys = match coords.get() {
            Some((rg, workspace)) => Output::known(insights::get_shared_keys(rg, workspace).await?),
            None => Output::computed(),
        };
        let workspace_key = shared_keys.map(|keys| keys.primary_shared_key);
        let workspace_id = update_management
            .log_analytics
            .output("customer_id")
            .map(|v| v.as_str().unwrap_or_default().to_string());

        let mut vm_output: Vec<Output<Value>> = Vec::new();
        for vm_name in Self::vm_names(&stack_name) {
            let vm = VmLinux::declare(
                ctx,
                &vm_name,
                VmLinuxArgs {
                    resource_group: rg_compute.clone(),
                    workspace_id: workspace_id.clone(),
                    workspace_key: workspace_key.clone(),
                    admin_user: self.admin_user.clone(),
                    admin_ssh_pubkey: self.admin_ssh_pubkey.clone(),
                    subnet_id: subnet_id.clone(),
                    source_address_prefix: self.source_address_prefix.clone(),
                },
                ResourceOptions::parent(&vnet_compute.urn),
            )
            .await?;

            let entry = vm
                .virtual_machine
                .id()
                .zip(vm.virtual_machine.name())
                .zip(vm.public_ip_address.output("ip_address"))
                .map(|((id, name), pip)| {
                    json!({
                        "id": id,
                        "name": name,
                        "pip": pip,
                    })
                });
            vm_output.push(entry);
        }
        ctx.export("vm_output", Output::all(vm_output).map(Value::Array));

        Ok(())
    }
}
