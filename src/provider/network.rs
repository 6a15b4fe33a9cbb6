//! Networking resource types.
//!
//! Covers the four networking resources the topology needs: virtual networks
//! with inline subnets, public IP addresses, network security groups with
//! inline security rules, and network interfaces binding all three together.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{parse_args, physical_name, resource_id, require, ProviderResult};
use super::{ResourceOutputs, ResourceProvider};

const VNET_TOKEN: &str = "azure:network:VirtualNetwork";
const PIP_TOKEN: &str = "azure:network:PublicIpAddress";
const NSG_TOKEN: &str = "azure:network:NetworkSecurityGroup";
const NIC_TOKEN: &str = "azure:network:NetworkInterface";

// ============================================================================
// Virtual Network
// ============================================================================

/// Address space of a virtual network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressSpaceArgs {
    pub address_prefixes: Vec<String>,
}

/// An inline subnet declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetArgs {
    pub name: String,
    pub address_prefix: String,
}

/// Arguments for a virtual network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualNetworkArgs {
    /// Explicit network name; auto-named when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_network_name: Option<String>,
    /// Resource group holding the network
    pub resource_group_name: String,
    /// Azure region
    pub location: String,
    /// Address space of the network
    pub address_space: AddressSpaceArgs,
    /// Inline subnets
    #[serde(default)]
    pub subnets: Vec<SubnetArgs>,
}

/// Azure Virtual Network resource type.
pub struct VirtualNetworkProvider;

#[async_trait]
impl ResourceProvider for VirtualNetworkProvider {
    fn token(&self) -> &'static str {
        VNET_TOKEN
    }

    fn description(&self) -> &'static str {
        "A virtual network with inline subnets"
    }

    fn validate(&self, inputs: &Value) -> ProviderResult<()> {
        let args: VirtualNetworkArgs = parse_args(VNET_TOKEN, inputs)?;
        require(VNET_TOKEN, "resource_group_name", &args.resource_group_name)?;
        require(VNET_TOKEN, "location", &args.location)?;
        if args.address_space.address_prefixes.is_empty() {
            return Err(super::ProviderError::MissingArgument {
                token: VNET_TOKEN,
                argument: "address_space.address_prefixes",
            });
        }
        Ok(())
    }

    async fn create(&self, name: &str, inputs: &Value) -> ProviderResult<ResourceOutputs> {
        self.validate(inputs)?;
        let args: VirtualNetworkArgs = parse_args(VNET_TOKEN, inputs)?;

        let physical = physical_name(name, args.virtual_network_name.as_deref());
        tracing::info!(
            name = physical.as_str(),
            prefixes = ?args.address_space.address_prefixes,
            subnets = args.subnets.len(),
            "creating virtual network"
        );

        let vnet_id = resource_id(
            &args.resource_group_name,
            "Microsoft.Network",
            "virtualNetworks",
            &physical,
        );
        let subnets: Vec<Value> = args
            .subnets
            .iter()
            .map(|subnet| {
                json!({
                    "id": format!("{}/subnets/{}", vnet_id, subnet.name),
                    "name": subnet.name,
                    "address_prefix": subnet.address_prefix,
                })
            })
            .collect();

        let outputs = json!({
            "id": vnet_id,
            "name": physical,
            "address_space": args.address_space.address_prefixes,
            "subnets": subnets,
        });
        Ok(outputs.as_object().cloned().unwrap_or_default())
    }
}

// ============================================================================
// Public IP Address
// ============================================================================

/// Arguments for a public IP address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicIpAddressArgs {
    /// Explicit address name; auto-named when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip_address_name: Option<String>,
    /// Resource group holding the address
    pub resource_group_name: String,
    /// Azure region
    pub location: String,
}

/// Azure Public IP Address resource type.
pub struct PublicIpAddressProvider;

#[async_trait]
impl ResourceProvider for PublicIpAddressProvider {
    fn token(&self) -> &'static str {
        PIP_TOKEN
    }

    fn description(&self) -> &'static str {
        "A publicly routable IP address"
    }

    fn validate(&self, inputs: &Value) -> ProviderResult<()> {
        let args: PublicIpAddressArgs = parse_args(PIP_TOKEN, inputs)?;
        require(PIP_TOKEN, "resource_group_name", &args.resource_group_name)?;
        require(PIP_TOKEN, "location", &args.location)
    }

    async fn create(&self, name: &str, inputs: &Value) -> ProviderResult<ResourceOutputs> {
        self.validate(inputs)?;
        let args: PublicIpAddressArgs = parse_args(PIP_TOKEN, inputs)?;

        let physical = physical_name(name, args.public_ip_address_name.as_deref());
        let ip_address = format!(
            "20.{}.{}.{}",
            rand::random::<u8>(),
            rand::random::<u8>(),
            rand::random::<u8>()
        );
        tracing::info!(
            name = physical.as_str(),
            ip_address = ip_address.as_str(),
            "creating public ip address"
        );

        let outputs = json!({
            "id": resource_id(
                &args.resource_group_name,
                "Microsoft.Network",
                "publicIPAddresses",
                &physical,
            ),
            "name": physical,
            "ip_address": ip_address,
        });
        Ok(outputs.as_object().cloned().unwrap_or_default())
    }
}

// ============================================================================
// Network Security Group
// ============================================================================

/// An inline security rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRuleArgs {
    pub name: String,
    /// Allow or Deny
    pub access: String,
    /// Inbound or Outbound
    pub direction: String,
    /// Rule priority (100-4096, lower wins)
    pub priority: i64,
    /// Protocol ("Tcp", "Udp" or "*")
    pub protocol: String,
    pub source_address_prefix: String,
    pub source_port_range: String,
    pub destination_address_prefix: String,
    pub destination_port_range: String,
}

/// Arguments for a network security group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSecurityGroupArgs {
    /// Explicit group name; auto-named when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_security_group_name: Option<String>,
    /// Resource group holding the group
    pub resource_group_name: String,
    /// Azure region
    pub location: String,
    /// Inline security rules
    #[serde(default)]
    pub security_rules: Vec<SecurityRuleArgs>,
}

/// Azure Network Security Group resource type.
pub struct NetworkSecurityGroupProvider;

#[async_trait]
impl ResourceProvider for NetworkSecurityGroupProvider {
    fn token(&self) -> &'static str {
        NSG_TOKEN
    }

    fn description(&self) -> &'static str {
        "A network security group filtering inbound and outbound traffic"
    }

    fn validate(&self, inputs: &Value) -> ProviderResult<()> {
        let args: NetworkSecurityGroupArgs = parse_args(NSG_TOKEN, inputs)?;
        require(NSG_TOKEN, "resource_group_name", &args.resource_group_name)?;
        require(NSG_TOKEN, "location", &args.location)?;
        for rule in &args.security_rules {
            require(NSG_TOKEN, "security_rules[].name", &rule.name)?;
            require(NSG_TOKEN, "security_rules[].source_address_prefix", &rule.source_address_prefix)?;
        }
        Ok(())
    }

    async fn create(&self, name: &str, inputs: &Value) -> ProviderResult<ResourceOutputs> {
        self.validate(inputs)?;
        let args: NetworkSecurityGroupArgs = parse_args(NSG_TOKEN, inputs)?;

        let physical = physical_name(name, args.network_security_group_name.as_deref());
        tracing::info!(
            name = physical.as_str(),
            rules = args.security_rules.len(),
            "creating network security group"
        );

        let outputs = json!({
            "id": resource_id(
                &args.resource_group_name,
                "Microsoft.Network",
                "networkSecurityGroups",
                &physical,
            ),
            "name": physical,
            "security_rules": args.security_rules,
        });
        Ok(outputs.as_object().cloned().unwrap_or_default())
    }
}

// ============================================================================
// Network Interface
// ============================================================================

/// A resource referenced by id (public IP, subnet, security group).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubResourceArgs {
    pub id: String,
}

/// An ip configuration of a network interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpConfigurationArgs {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip_address: Option<SubResourceArgs>,
    pub subnet: SubResourceArgs,
}

/// Arguments for a network interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInterfaceArgs {
    /// Explicit interface name; auto-named when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_interface_name: Option<String>,
    /// Resource group holding the interface
    pub resource_group_name: String,
    /// Azure region
    pub location: String,
    /// IP configurations (at least one)
    pub ip_configurations: Vec<IpConfigurationArgs>,
    /// Security group applied to the interface
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_security_group: Option<SubResourceArgs>,
    /// Whether accelerated networking is enabled
    #[serde(default)]
    pub enable_accelerated_networking: bool,
}

/// Azure Network Interface resource type.
pub struct NetworkInterfaceProvider;

#[async_trait]
impl ResourceProvider for NetworkInterfaceProvider {
    fn token(&self) -> &'static str {
        NIC_TOKEN
    }

    fn description(&self) -> &'static str {
        "A network interface binding a machine to a subnet"
    }

    fn validate(&self, inputs: &Value) -> ProviderResult<()> {
        let args: NetworkInterfaceArgs = parse_args(NIC_TOKEN, inputs)?;
        require(NIC_TOKEN, "resource_group_name", &args.resource_group_name)?;
        require(NIC_TOKEN, "location", &args.location)?;
        if args.ip_configurations.is_empty() {
            return Err(super::ProviderError::MissingArgument {
                token: NIC_TOKEN,
                argument: "ip_configurations",
            });
        }
        for config in &args.ip_configurations {
            require(NIC_TOKEN, "ip_configurations[].subnet.id", &config.subnet.id)?;
        }
        Ok(())
    }

    async fn create(&self, name: &str, inputs: &Value) -> ProviderResult<ResourceOutputs> {
        self.validate(inputs)?;
        let args: NetworkInterfaceArgs = parse_args(NIC_TOKEN, inputs)?;

        let physical = physical_name(name, args.network_interface_name.as_deref());
        let private_ip = format!("10.0.{}.{}", rand::random::<u8>(), rand::random::<u8>());
        tracing::info!(
            name = physical.as_str(),
            private_ip = private_ip.as_str(),
            accelerated = args.enable_accelerated_networking,
            "creating network interface"
        );

        let outputs = json!({
            "id": resource_id(
                &args.resource_group_name,
                "Microsoft.Network",
                "networkInterfaces",
                &physical,
            ),
            "name": physical,
            "private_ip_address": private_ip,
            "mac_address": format!(
                "{:02X}-{:02X}-{:02X}-{:02X}-{:02X}-{:02X}",
                rand::random::<u8>(),
                rand::random::<u8>(),
                rand::random::<u8>(),
                rand::random::<u8>(),
                rand::random::<u8>(),
                rand::random::<u8>()
            ),
            "enable_accelerated_networking": args.enable_accelerated_networking,
        });
        Ok(outputs.as_object().cloned().unwrap_or_default())
    }
}
