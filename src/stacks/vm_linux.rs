//! Monitored Linux VM declarator.
//!
//! Declares one Linux VM with its networking: a public IP, a security group
//! admitting inbound 22 and 80 only from the configured source prefix, an
//! accelerated-networking NIC binding all three, the machine itself (CentOS
//! image, SSH-key-only auth, premium managed OS disk) and the monitoring
//! extension shipping logs to the given workspace.

use serde_json::json;

use crate::engine::{Output, RegisteredResource, ResourceOptions, StackContext};
use crate::error::Result;

/// Component token for one Linux VM unit.
pub const COMPONENT_TOKEN: &str = "updraft:stacks:VmLinux";

/// Arguments for [`VmLinux::declare`].
#[derive(Debug, Clone)]
pub struct VmLinuxArgs {
    /// Resource group the VM resources live in
    pub resource_group: RegisteredResource,
    /// Workspace id the monitoring agent reports to
    pub workspace_id: Output<String>,
    /// Workspace shared key the monitoring agent authenticates with
    pub workspace_key: Output<String>,
    /// Admin username
    pub admin_user: String,
    /// SSH public key authorized for the admin user
    pub admin_ssh_pubkey: String,
    /// Subnet the NIC attaches to
    pub subnet_id: Output<String>,
    /// Source address prefix allowed inbound on 22 and 80
    pub source_address_prefix: String,
}

/// The declared VM unit.
#[derive(Debug, Clone)]
pub struct VmLinux {
    /// Component handle
    pub component: RegisteredResource,
    /// Public IP of the machine
    pub public_ip_address: RegisteredResource,
    /// Security group filtering inbound traffic
    pub network_security_group: RegisteredResource,
    /// Network interface
    pub network_interface: RegisteredResource,
    /// The virtual machine
    pub virtual_machine: RegisteredResource,
    /// Monitoring extension wired to the workspace
    pub vm_monitoring: RegisteredResource,
}

impl VmLinux {
    /// Declare the VM unit under the given component name.
    pub async fn declare(
        ctx: &mut StackContext<'_>,
        name: &str,
        args: VmLinuxArgs,
        opts: ResourceOptions,
    ) -> Result<Self> {
        let component = ctx.register_component(COMPONENT_TOKEN, name, opts).await?;

        let rg_name = args.resource_group.name();
        let rg_location = args.resource_group.output("location");

        let public_ip_address = ctx
            .register(
                "azure:network:PublicIpAddress",
                name,
                json!({
                    "public_ip_address_name": format!("pip-{}", name),
                    "location": rg_location.to_value(),
                    "resource_group_name": rg_name.to_value(),
                }),
                ResourceOptions::parent(&component.urn),
            )
            .await?;

        let network_security_group = ctx
            .register(
                "azure:network:NetworkSecurityGroup",
                name,
                json!({
                    "network_security_group_name": format!("nsg-{}", name),
                    "location": rg_location.to_value(),
                    "resource_group_name": rg_name.to_value(),
                    "security_rules": [
                        {
                            "name": "ssh",
                            "access": "Allow",
                            "direction": "Inbound",
                            "priority": 100,
                            "protocol": "*",
                            "source_address_prefix": args.source_address_prefix,
                            "source_port_range": "*",
                            "destination_address_prefix": "*",
                            "destination_port_range": "22",
                        },
                        {
                            "name": "http",
                            "access": "Allow",
                            "direction": "Inbound",
                            "priority": 101,
                            "protocol": "*",
                            "source_address_prefix": args.source_address_prefix,
                            "source_port_range": "*",
                            "destination_address_prefix": "*",
                            "destination_port_range": "80",
                        },
                    ],
                }),
                ResourceOptions::parent(&component.urn),
            )
            .await?;

        let network_interface = ctx
            .register(
                "azure:network:NetworkInterface",
                name,
                json!({
                    "network_interface_name": format!("nic-{}", name),
                    "location": rg_location.to_value(),
                    "resource_group_name": rg_name.to_value(),
                    "enable_accelerated_networking": true,
                    "ip_configurations": [{
                        "name": "ipconfig1",
                        "public_ip_address": {
                            "id": public_ip_address.id().to_value(),
                        },
                        "subnet": {
                            "id": args.subnet_id.to_value(),
                        },
                    }],
                    "network_security_group": {
                        "id": network_security_group.id().to_value(),
                    },
                }),
                ResourceOptions::parent(&public_ip_address.urn),
            )
            .await?;

        let virtual_machine = ctx
            .register(
                "azure:compute:VirtualMachine",
                name,
                json!({
                    "vm_name": name,
                    "location": rg_location.to_value(),
                    "resource_group_name": rg_name.to_value(),
                    "hardware_profile": {
                        "vm_size": "Standard_D2s_v3",
                    },
                    "network_profile": {
                        "network_interfaces": [{
                            "id": network_interface.id().to_value(),
                            "primary": true,
                        }],
                    },
                    "os_profile": {
                        "computer_name": name,
                        "admin_username": args.admin_user,
                        "linux_configuration": {
                            "disable_password_authentication": true,
                            "provision_vm_agent": true,
                            "patch_settings": {
                                "patch_mode": "ImageDefault",
                            },
                            "ssh": {
                                "public_keys": [{
                                    "key_data": args.admin_ssh_pubkey,
                                    "path": format!("/home/{}/.ssh/authorized_keys", args.admin_user),
                                }],
                            },
                        },
                    },
                    "storage_profile": {
                        "image_reference": {
                            "publisher": "OpenLogic",
                            "offer": "CentOS-LVM",
                            "sku": "8-lvm-gen2",
                            "version": "latest",
                        },
                        "os_disk": {
                            "name": format!("disk-{}", name),
                            "caching": "ReadWrite",
                            "create_option": "FromImage",
                            "managed_disk": {
                                "storage_account_type": "Premium_LRS",
                            },
                        },
                    },
                }),
                ResourceOptions::parent(&network_interface.urn),
            )
            .await?;

        let vm_monitoring = ctx
            .register(
                "azure:compute:VirtualMachineExtension",
                name,
                json!({
                    "vm_name": virtual_machine.name().to_value(),
                    "resource_group_name": rg_name.to_value(),
                    "publisher": "Microsoft.EnterpriseCloud.Monitoring",
                    "type": "OmsAgentForLinux",
                    "type_handler_version": "1.13",
                    "auto_upgrade_minor_version": true,
                    "settings": {
                        "workspaceId": args.workspace_id.to_value(),
                    },
                    "protected_settings": {
                        "workspaceKey": args.workspace_key.to_value(),
                    },
                }),
                ResourceOptions::parent(&virtual_machine.urn),
            )
            .await?;

        Ok(Self {
            component,
            public_ip_address,
            network_security_group,
            network_interface,
            virtual_machine,
            vm_monitoring,
        })
    }
}
