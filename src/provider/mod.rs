//! Simulated Azure resource provider
//!
//! This module provides the resource-type registry the stack engine dispatches
//! to. Each resource type implements [`ResourceProvider`]: it parses and
//! validates its typed argument struct from the declared JSON inputs, then
//! performs a simulated create/update/delete that logs the operation and
//! synthesizes the provider-assigned values (ARM ids, normalized physical
//! names, addresses, keys) a real control plane would return.
//!
//! The provider ships as a single bundled plugin, pinned:
//!
//! | Plugin | Version |
//! |--------|---------|
//! | `azure-native` | `v1.23.0` |
//!
//! Resource types are grouped the way the Azure namespaces group them:
//!
//! - [`resources`] — resource groups
//! - [`automation`] — user-assigned identities, automation accounts
//! - [`insights`] — log-analytics workspaces, linked services, solutions,
//!   shared-keys lookup
//! - [`network`] — virtual networks, public IPs, security groups, interfaces
//! - [`compute`] — virtual machines, VM extensions

pub mod automation;
pub mod compute;
pub mod insights;
pub mod network;
pub mod resources;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Name of the bundled provider plugin.
pub const PLUGIN_NAME: &str = "azure-native";

/// Pinned version of the bundled provider plugin.
pub const PLUGIN_VERSION: &str = "v1.23.0";

/// Subscription id used in synthesized ARM ids.
pub(crate) const SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Errors raised by provider resource operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Invalid argument for {token}: {message}")]
    InvalidArgument {
        token: &'static str,
        message: String,
    },

    #[error("Missing required argument '{argument}' for {token}")]
    MissingArgument {
        token: &'static str,
        argument: &'static str,
    },

    #[error("Operation failed for {token}: {message}")]
    OperationFailed {
        token: &'static str,
        message: String,
    },
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Provider-assigned outputs of one resource.
pub type ResourceOutputs = serde_json::Map<String, Value>;

/// Trait implemented by every resource type the provider supports.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Returns the type token (e.g. `azure:network:PublicIpAddress`).
    fn token(&self) -> &'static str;

    /// Returns a description of the resource type.
    fn description(&self) -> &'static str;

    /// Validate declared inputs without performing any operation.
    fn validate(&self, inputs: &Value) -> ProviderResult<()>;

    /// Create the resource, returning its provider-assigned outputs.
    async fn create(&self, name: &str, inputs: &Value) -> ProviderResult<ResourceOutputs>;

    /// Update the resource in place.
    ///
    /// The default implementation re-runs the create path and carries the
    /// previously assigned identity forward, so in-place updates never change
    /// a resource's physical name or id.
    async fn update(
        &self,
        name: &str,
        inputs: &Value,
        prior: &ResourceOutputs,
    ) -> ProviderResult<ResourceOutputs> {
        let mut outputs = self.create(name, inputs).await?;
        for key in ["name", "id"] {
            if let Some(value) = prior.get(key) {
                outputs.insert(key.to_string(), value.clone());
            }
        }
        Ok(outputs)
    }

    /// Delete the resource.
    async fn delete(&self, name: &str, _outputs: &ResourceOutputs) -> ProviderResult<()> {
        tracing::info!(token = self.token(), name, "deleting resource");
        Ok(())
    }
}

/// Registry for looking up resource types by token.
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn ResourceProvider>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Create a registry with every bundled resource type
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(resources::ResourceGroupProvider));

        // Identity and automation
        registry.register(Arc::new(automation::UserAssignedIdentityProvider));
        registry.register(Arc::new(automation::AutomationAccountProvider));

        // Log analytics
        registry.register(Arc::new(insights::WorkspaceProvider));
        registry.register(Arc::new(insights::LinkedServiceProvider));
        registry.register(Arc::new(insights::SolutionProvider));

        // Networking
        registry.register(Arc::new(network::VirtualNetworkProvider));
        registry.register(Arc::new(network::PublicIpAddressProvider));
        registry.register(Arc::new(network::NetworkSecurityGroupProvider));
        registry.register(Arc::new(network::NetworkInterfaceProvider));

        // Compute
        registry.register(Arc::new(compute::VirtualMachineProvider));
        registry.register(Arc::new(compute::VirtualMachineExtensionProvider));

        registry
    }

    /// Register a resource type
    pub fn register(&mut self, provider: Arc<dyn ResourceProvider>) {
        self.providers.insert(provider.token(), provider);
    }

    /// Get a resource type by token
    pub fn get(&self, token: &str) -> Option<Arc<dyn ResourceProvider>> {
        self.providers.get(token).cloned()
    }

    /// Check if a resource type exists
    pub fn contains(&self, token: &str) -> bool {
        self.providers.contains_key(token)
    }

    /// Get all registered tokens
    pub fn tokens(&self) -> Vec<&'static str> {
        self.providers.keys().copied().collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Resolve the physical name for a resource: the explicitly supplied name, or
/// the logical name normalized with a random suffix the way the control plane
/// auto-names resources. Dependent declarations must therefore consume the
/// *resolved* name, never assume it equals the logical one.
pub(crate) fn physical_name(logical: &str, explicit: Option<&str>) -> String {
    match explicit {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{}-{:08x}", logical, rand::random::<u32>()),
    }
}

/// Synthesize the ARM id of a resource group.
pub(crate) fn resource_group_id(name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}",
        SUBSCRIPTION_ID, name
    )
}

/// Synthesize the ARM id of a resource inside a resource group.
pub(crate) fn resource_id(
    resource_group: &str,
    provider_namespace: &str,
    type_plural: &str,
    name: &str,
) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
        SUBSCRIPTION_ID, resource_group, provider_namespace, type_plural, name
    )
}

/// Parse a typed argument struct out of declared inputs.
pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(
    token: &'static str,
    inputs: &Value,
) -> ProviderResult<T> {
    serde_json::from_value(inputs.clone()).map_err(|e| ProviderError::InvalidArgument {
        token,
        message: e.to_string(),
    })
}

/// Required-string check shared by the argument parsers.
pub(crate) fn require(
    token: &'static str,
    argument: &'static str,
    value: &str,
) -> ProviderResult<()> {
    if value.is_empty() {
        return Err(ProviderError::MissingArgument { token, argument });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_builtins() {
        let registry = ProviderRegistry::with_builtins();
        for token in [
            "azure:resources:ResourceGroup",
            "azure:managedidentity:UserAssignedIdentity",
            "azure:automation:AutomationAccount",
            "azure:operationalinsights:Workspace",
            "azure:operationalinsights:LinkedService",
            "azure:operationsmanagement:Solution",
            "azure:network:VirtualNetwork",
            "azure:network:PublicIpAddress",
            "azure:network:NetworkSecurityGroup",
            "azure:network:NetworkInterface",
            "azure:compute:VirtualMachine",
            "azure:compute:VirtualMachineExtension",
        ] {
            assert!(registry.contains(token), "missing builtin {}", token);
        }
        assert_eq!(registry.tokens().len(), 12);
        assert!(!registry.contains("azure:compute:Disk"));
    }

    #[test]
    fn test_physical_name() {
        assert_eq!(physical_name("law-dev", Some("law-dev")), "law-dev");

        let generated = physical_name("law-dev", None);
        assert!(generated.starts_with("law-dev-"));
        assert_eq!(generated.len(), "law-dev-".len() + 8);
    }

    #[test]
    fn test_resource_ids() {
        assert_eq!(
            resource_group_id("dev-mgmt"),
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/dev-mgmt"
        );
        assert_eq!(
            resource_id("dev", "Microsoft.Network", "publicIPAddresses", "pip-dev01"),
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/dev/providers/Microsoft.Network/publicIPAddresses/pip-dev01"
        );
    }
}
