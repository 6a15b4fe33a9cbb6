//! Resource group resource type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{parse_args, physical_name, resource_group_id, require, ProviderResult};
use super::{ResourceOutputs, ResourceProvider};

const TOKEN: &str = "azure:resources:ResourceGroup";

/// Arguments for a resource group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceGroupArgs {
    /// Explicit resource group name; auto-named from the logical name when
    /// absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,
    /// Azure region
    pub location: String,
}

/// Azure Resource Group resource type.
pub struct ResourceGroupProvider;

#[async_trait]
impl ResourceProvider for ResourceGroupProvider {
    fn token(&self) -> &'static str {
        TOKEN
    }

    fn description(&self) -> &'static str {
        "A container that holds related Azure resources"
    }

    fn validate(&self, inputs: &Value) -> ProviderResult<()> {
        let args: ResourceGroupArgs = parse_args(TOKEN, inputs)?;
        require(TOKEN, "location", &args.location)
    }

    async fn create(&self, name: &str, inputs: &Value) -> ProviderResult<ResourceOutputs> {
        self.validate(inputs)?;
        let args: ResourceGroupArgs = parse_args(TOKEN, inputs)?;

        let physical = physical_name(name, args.resource_group_name.as_deref());
        tracing::info!(
            name = physical.as_str(),
            location = args.location.as_str(),
            "creating resource group"
        );

        let outputs = json!({
            "id": resource_group_id(&physical),
            "name": physical,
            "location": args.location,
            "provisioning_state": "Succeeded",
        });
        Ok(outputs.as_object().cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_with_explicit_name() {
        let provider = ResourceGroupProvider;
        let inputs = json!({
            "resource_group_name": "dev-mgmt",
            "location": "westeurope",
        });

        let outputs = provider.create("dev-mgmt", &inputs).await.unwrap();
        assert_eq!(outputs["name"], json!("dev-mgmt"));
        assert_eq!(
            outputs["id"],
            json!("/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/dev-mgmt")
        );
        assert_eq!(outputs["location"], json!("westeurope"));
    }

    #[tokio::test]
    async fn test_create_auto_names() {
        let provider = ResourceGroupProvider;
        let inputs = json!({"location": "westeurope"});

        let outputs = provider.create("dev", &inputs).await.unwrap();
        let name = outputs["name"].as_str().unwrap();
        assert!(name.starts_with("dev-"));
    }

    #[test]
    fn test_validate_rejects_missing_location() {
        let provider = ResourceGroupProvider;
        assert!(provider.validate(&json!({})).is_err());
        assert!(provider.validate(&json!({"location": ""})).is_err());
        assert!(provider.validate(&json!({"location": "westeurope"})).is_ok());
    }
}
