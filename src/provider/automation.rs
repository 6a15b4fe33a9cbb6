//! Identity and automation resource types.
//!
//! ## UserAssignedIdentityProvider
//!
//! A managed identity assignable to other resources. Outputs include the
//! synthesized `principal_id` and `client_id` the directory would assign.
//!
//! ## AutomationAccountProvider
//!
//! An automation account with a sku and an optional user-assigned identity
//! map in the `{identity_id: {}}` shape the ARM API expects.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{parse_args, physical_name, resource_id, require, ProviderResult};
use super::{ResourceOutputs, ResourceProvider};

const IDENTITY_TOKEN: &str = "azure:managedidentity:UserAssignedIdentity";
const ACCOUNT_TOKEN: &str = "azure:automation:AutomationAccount";

/// Arguments for a user-assigned identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAssignedIdentityArgs {
    /// Resource group holding the identity
    pub resource_group_name: String,
    /// Azure region
    pub location: String,
}

/// Azure User Assigned Identity resource type.
pub struct UserAssignedIdentityProvider;

#[async_trait]
impl ResourceProvider for UserAssignedIdentityProvider {
    fn token(&self) -> &'static str {
        IDENTITY_TOKEN
    }

    fn description(&self) -> &'static str {
        "A user-assigned managed identity"
    }

    fn validate(&self, inputs: &Value) -> ProviderResult<()> {
        let args: UserAssignedIdentityArgs = parse_args(IDENTITY_TOKEN, inputs)?;
        require(IDENTITY_TOKEN, "resource_group_name", &args.resource_group_name)?;
        require(IDENTITY_TOKEN, "location", &args.location)
    }

    async fn create(&self, name: &str, inputs: &Value) -> ProviderResult<ResourceOutputs> {
        self.validate(inputs)?;
        let args: UserAssignedIdentityArgs = parse_args(IDENTITY_TOKEN, inputs)?;

        let physical = physical_name(name, None);
        tracing::info!(
            name = physical.as_str(),
            resource_group = args.resource_group_name.as_str(),
            "creating user-assigned identity"
        );

        let outputs = json!({
            "id": resource_id(
                &args.resource_group_name,
                "Microsoft.ManagedIdentity",
                "userAssignedIdentities",
                &physical,
            ),
            "name": physical,
            "principal_id": format!("{:032x}", rand::random::<u128>()),
            "client_id": format!("{:032x}", rand::random::<u128>()),
        });
        Ok(outputs.as_object().cloned().unwrap_or_default())
    }
}

/// Sku of an automation account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationSkuArgs {
    /// Sku name: Free or Basic
    pub name: String,
}

/// Identity configuration of an automation account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationIdentityArgs {
    /// Identity type: SystemAssigned, UserAssigned
    #[serde(rename = "type")]
    pub identity_type: String,
    /// Map of user-assigned identity ids, `{identity_id: {}}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_assigned_identities: Option<HashMap<String, Value>>,
}

/// Arguments for an automation account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationAccountArgs {
    /// Explicit account name; auto-named when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_account_name: Option<String>,
    /// Resource group holding the account
    pub resource_group_name: String,
    /// Azure region
    pub location: String,
    /// Account sku
    pub sku: AutomationSkuArgs,
    /// Identity configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<AutomationIdentityArgs>,
}

/// Azure Automation Account resource type.
pub struct AutomationAccountProvider;

#[async_trait]
impl ResourceProvider for AutomationAccountProvider {
    fn token(&self) -> &'static str {
        ACCOUNT_TOKEN
    }

    fn description(&self) -> &'static str {
        "An automation account hosting runbooks and update schedules"
    }

    fn validate(&self, inputs: &Value) -> ProviderResult<()> {
        let args: AutomationAccountArgs = parse_args(ACCOUNT_TOKEN, inputs)?;
        require(ACCOUNT_TOKEN, "resource_group_name", &args.resource_group_name)?;
        require(ACCOUNT_TOKEN, "location", &args.location)?;
        require(ACCOUNT_TOKEN, "sku.name", &args.sku.name)
    }

    async fn create(&self, name: &str, inputs: &Value) -> ProviderResult<ResourceOutputs> {
        self.validate(inputs)?;
        let args: AutomationAccountArgs = parse_args(ACCOUNT_TOKEN, inputs)?;

        let physical = physical_name(name, args.automation_account_name.as_deref());
        tracing::info!(
            name = physical.as_str(),
            sku = args.sku.name.as_str(),
            "creating automation account"
        );

        let outputs = json!({
            "id": resource_id(
                &args.resource_group_name,
                "Microsoft.Automation",
                "automationAccounts",
                &physical,
            ),
            "name": physical,
            "state": "Ok",
        });
        Ok(outputs.as_object().cloned().unwrap_or_default())
    }
}
