//! Compute resource types: virtual machines and VM extensions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{parse_args, physical_name, resource_id, require, ProviderResult};
use super::{ResourceOutputs, ResourceProvider};

const VM_TOKEN: &str = "azure:compute:VirtualMachine";
const EXTENSION_TOKEN: &str = "azure:compute:VirtualMachineExtension";

// ============================================================================
// Virtual Machine
// ============================================================================

/// Hardware profile of a virtual machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareProfileArgs {
    /// VM size (e.g. "Standard_D2s_v3")
    pub vm_size: String,
}

/// A network interface attached to a virtual machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInterfaceReferenceArgs {
    pub id: String,
    #[serde(default)]
    pub primary: bool,
}

/// Network profile of a virtual machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkProfileArgs {
    pub network_interfaces: Vec<NetworkInterfaceReferenceArgs>,
}

/// An authorized SSH public key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshPublicKeyArgs {
    /// Path the key is installed at (e.g. /home/ops/.ssh/authorized_keys)
    pub path: String,
    /// Public key data
    pub key_data: String,
}

/// SSH configuration of a Linux VM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfigurationArgs {
    pub public_keys: Vec<SshPublicKeyArgs>,
}

/// Patch settings of a Linux VM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinuxPatchSettingsArgs {
    /// Patch mode ("ImageDefault" or "AutomaticByPlatform")
    pub patch_mode: String,
}

/// Linux configuration of a virtual machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinuxConfigurationArgs {
    pub disable_password_authentication: bool,
    #[serde(default)]
    pub provision_vm_agent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_settings: Option<LinuxPatchSettingsArgs>,
    pub ssh: SshConfigurationArgs,
}

/// OS profile of a virtual machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsProfileArgs {
    pub computer_name: String,
    pub admin_username: String,
    pub linux_configuration: LinuxConfigurationArgs,
}

/// Marketplace image reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageReferenceArgs {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: String,
}

/// Managed disk parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedDiskParametersArgs {
    /// Storage tier (e.g. "Premium_LRS")
    pub storage_account_type: String,
}

/// OS disk of a virtual machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsDiskArgs {
    pub name: String,
    /// Caching mode ("None", "ReadOnly", "ReadWrite")
    pub caching: String,
    /// Create option ("FromImage", "Attach", "Empty")
    pub create_option: String,
    pub managed_disk: ManagedDiskParametersArgs,
}

/// Storage profile of a virtual machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageProfileArgs {
    pub image_reference: ImageReferenceArgs,
    pub os_disk: OsDiskArgs,
}

/// Arguments for a virtual machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualMachineArgs {
    /// Explicit machine name; auto-named when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_name: Option<String>,
    /// Resource group holding the machine
    pub resource_group_name: String,
    /// Azure region
    pub location: String,
    pub hardware_profile: HardwareProfileArgs,
    pub network_profile: NetworkProfileArgs,
    pub os_profile: OsProfileArgs,
    pub storage_profile: StorageProfileArgs,
}

/// Azure Virtual Machine resource type.
pub struct VirtualMachineProvider;

#[async_trait]
impl ResourceProvider for VirtualMachineProvider {
    fn token(&self) -> &'static str {
        VM_TOKEN
    }

    fn description(&self) -> &'static str {
        "A virtual machine booted from a marketplace image"
    }

    fn validate(&self, inputs: &Value) -> ProviderResult<()> {
        let args: VirtualMachineArgs = parse_args(VM_TOKEN, inputs)?;
        require(VM_TOKEN, "resource_group_name", &args.resource_group_name)?;
        require(VM_TOKEN, "location", &args.location)?;
        require(VM_TOKEN, "hardware_profile.vm_size", &args.hardware_profile.vm_size)?;
        require(VM_TOKEN, "os_profile.admin_username", &args.os_profile.admin_username)?;
        if args.network_profile.network_interfaces.is_empty() {
            return Err(super::ProviderError::MissingArgument {
                token: VM_TOKEN,
                argument: "network_profile.network_interfaces",
            });
        }
        if args
            .os_profile
            .linux_configuration
            .ssh
            .public_keys
            .is_empty()
        {
            return Err(super::ProviderError::MissingArgument {
                token: VM_TOKEN,
                argument: "os_profile.linux_configuration.ssh.public_keys",
            });
        }
        Ok(())
    }

    async fn create(&self, name: &str, inputs: &Value) -> ProviderResult<ResourceOutputs> {
        self.validate(inputs)?;
        let args: VirtualMachineArgs = parse_args(VM_TOKEN, inputs)?;

        let physical = physical_name(name, args.vm_name.as_deref());
        let image = format!(
            "{}:{}:{}",
            args.storage_profile.image_reference.publisher,
            args.storage_profile.image_reference.offer,
            args.storage_profile.image_reference.sku
        );
        tracing::info!(
            name = physical.as_str(),
            size = args.hardware_profile.vm_size.as_str(),
            image = image.as_str(),
            "creating virtual machine"
        );

        let outputs = json!({
            "id": resource_id(
                &args.resource_group_name,
                "Microsoft.Compute",
                "virtualMachines",
                &physical,
            ),
            "name": physical,
            "vm_id": uuid::Uuid::new_v4().to_string(),
            "provisioning_state": "Succeeded",
        });
        Ok(outputs.as_object().cloned().unwrap_or_default())
    }
}

// ============================================================================
// Virtual Machine Extension
// ============================================================================

/// Arguments for a VM extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualMachineExtensionArgs {
    /// Machine the extension installs onto
    pub vm_name: String,
    /// Resource group holding the machine
    pub resource_group_name: String,
    /// Extension publisher (e.g. "Microsoft.EnterpriseCloud.Monitoring")
    pub publisher: String,
    /// Extension type (e.g. "OmsAgentForLinux")
    #[serde(rename = "type")]
    pub extension_type: String,
    /// Handler version (e.g. "1.13")
    pub type_handler_version: String,
    /// Whether minor handler versions auto-upgrade
    #[serde(default)]
    pub auto_upgrade_minor_version: bool,
    /// Public settings passed to the handler
    #[serde(default)]
    pub settings: Value,
    /// Protected settings passed to the handler (not echoed in outputs)
    #[serde(default)]
    pub protected_settings: Value,
}

/// Azure Virtual Machine Extension resource type.
pub struct VirtualMachineExtensionProvider;

#[async_trait]
impl ResourceProvider for VirtualMachineExtensionProvider {
    fn token(&self) -> &'static str {
        EXTENSION_TOKEN
    }

    fn description(&self) -> &'static str {
        "An extension handler installed on a virtual machine"
    }

    fn validate(&self, inputs: &Value) -> ProviderResult<()> {
        let args: VirtualMachineExtensionArgs = parse_args(EXTENSION_TOKEN, inputs)?;
        require(EXTENSION_TOKEN, "vm_name", &args.vm_name)?;
        require(EXTENSION_TOKEN, "resource_group_name", &args.resource_group_name)?;
        require(EXTENSION_TOKEN, "publisher", &args.publisher)?;
        require(EXTENSION_TOKEN, "type", &args.extension_type)?;
        require(EXTENSION_TOKEN, "type_handler_version", &args.type_handler_version)
    }

    async fn create(&self, name: &str, inputs: &Value) -> ProviderResult<ResourceOutputs> {
        self.validate(inputs)?;
        let args: VirtualMachineExtensionArgs = parse_args(EXTENSION_TOKEN, inputs)?;

        let physical = physical_name(name, None);
        tracing::info!(
            name = physical.as_str(),
            vm = args.vm_name.as_str(),
            extension = args.extension_type.as_str(),
            version = args.type_handler_version.as_str(),
            "creating vm extension"
        );

        let id = format!(
            "{}/extensions/{}",
            resource_id(
                &args.resource_group_name,
                "Microsoft.Compute",
                "virtualMachines",
                &args.vm_name,
            ),
            physical,
        );
        let outputs = json!({
            "id": id,
            "name": physical,
            "provisioning_state": "Succeeded",
        });
        Ok(outputs.as_object().cloned().unwrap_or_default())
    }
}
