//! Lifecycle tests for the full update-management topology: apply, preview,
//! idempotent re-apply, input-change updates and destroy.

use pretty_assertions::assert_eq as assert_eq_pretty;
use serde_json::Value;
use updraft::engine::{Stack, StateBackend};
use updraft::program::UpdateManagementProgram;

fn program() -> UpdateManagementProgram {
    UpdateManagementProgram {
        admin_user: "opsadmin".to_string(),
        admin_ssh_pubkey: "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAA test".to_string(),
        source_address_prefix: "203.0.113.0/24".to_string(),
    }
}

fn stack_in(dir: &tempfile::TempDir) -> Stack {
    let backend = StateBackend::Json(dir.path().to_path_buf());
    let mut stack = Stack::create_or_select("update-management", "dev", &backend).unwrap();
    stack.install_plugin("azure-native", "v1.23.0").unwrap();
    stack.set_config("azure-native:location", "westeurope");
    stack
}

fn count_token(stack: &Stack, token: &str) -> usize {
    stack
        .state()
        .resources
        .iter()
        .filter(|r| r.token == token)
        .count()
}

/// The full topology: 2 resource groups, 1 network, 2 components, 5
/// management resources and 5 VM resources.
const TOPOLOGY_SIZE: usize = 15;

#[tokio::test]
async fn test_up_declares_full_topology() {
    let dir = tempfile::tempdir().unwrap();
    let mut stack = stack_in(&dir);

    let result = stack.up(&program(), |_| {}).await.unwrap();
    assert_eq!(result.summary.resource_changes.create, TOPOLOGY_SIZE);
    assert_eq!(result.summary.resource_changes.update, 0);
    assert_eq!(stack.state().resources.len(), TOPOLOGY_SIZE);
    assert_eq!(stack.state().serial, 1);

    // Management declarator: exactly one of each
    assert_eq!(count_token(&stack, "azure:managedidentity:UserAssignedIdentity"), 1);
    assert_eq!(count_token(&stack, "azure:automation:AutomationAccount"), 1);
    assert_eq!(count_token(&stack, "azure:operationalinsights:Workspace"), 1);
    assert_eq!(count_token(&stack, "azure:operationalinsights:LinkedService"), 1);
    assert_eq!(count_token(&stack, "azure:operationsmanagement:Solution"), 1);

    // VM declarator: exactly one of each
    assert_eq!(count_token(&stack, "azure:network:PublicIpAddress"), 1);
    assert_eq!(count_token(&stack, "azure:network:NetworkSecurityGroup"), 1);
    assert_eq!(count_token(&stack, "azure:network:NetworkInterface"), 1);
    assert_eq!(count_token(&stack, "azure:compute:VirtualMachine"), 1);
    assert_eq!(count_token(&stack, "azure:compute:VirtualMachineExtension"), 1);

    // Shared topology
    assert_eq!(count_token(&stack, "azure:resources:ResourceGroup"), 2);
    assert_eq!(count_token(&stack, "azure:network:VirtualNetwork"), 1);
}

#[tokio::test]
async fn test_up_exports() {
    let dir = tempfile::tempdir().unwrap();
    let mut stack = stack_in(&dir);

    let result = stack.up(&program(), |_| {}).await.unwrap();

    let account = result.outputs["automation_account"].as_str().unwrap();
    assert!(account.starts_with("aa-dev-mgmt"));

    let vm_output = result.outputs["vm_output"].as_array().unwrap();
    assert_eq!(vm_output.len(), 1);
    let entry = &vm_output[0];
    assert_eq!(entry["name"], Value::String("dev01".to_string()));
    assert!(entry["id"]
        .as_str()
        .unwrap()
        .ends_with("Microsoft.Compute/virtualMachines/dev01"));
    assert_eq!(entry["pip"].as_str().unwrap().split('.').count(), 4);

    // Exports are persisted into the checkpoint
    assert_eq!(stack.outputs()["automation_account"].as_str().unwrap(), account);
}

#[tokio::test]
async fn test_solution_name_follows_resolved_workspace_name() {
    let dir = tempfile::tempdir().unwrap();
    let mut stack = stack_in(&dir);
    stack.up(&program(), |_| {}).await.unwrap();

    let workspace = stack
        .state()
        .resources
        .iter()
        .find(|r| r.token == "azure:operationalinsights:Workspace")
        .unwrap();
    let solution = stack
        .state()
        .resources
        .iter()
        .find(|r| r.token == "azure:operationsmanagement:Solution")
        .unwrap();

    assert_eq!(
        solution.physical_name,
        format!("Updates({})", workspace.physical_name)
    );
}

#[tokio::test]
async fn test_nsg_admits_only_configured_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let mut stack = stack_in(&dir);
    stack.up(&program(), |_| {}).await.unwrap();

    let nsg = stack
        .state()
        .resources
        .iter()
        .find(|r| r.token == "azure:network:NetworkSecurityGroup")
        .unwrap();
    let rules = nsg.inputs["security_rules"].as_array().unwrap();

    assert_eq!(rules.len(), 2);
    let mut ports: Vec<&str> = rules
        .iter()
        .map(|r| r["destination_port_range"].as_str().unwrap())
        .collect();
    ports.sort_unstable();
    assert_eq!(ports, vec!["22", "80"]);

    for rule in rules {
        assert_eq!(rule["access"], Value::String("Allow".to_string()));
        assert_eq!(rule["direction"], Value::String("Inbound".to_string()));
        assert_eq!(
            rule["source_address_prefix"],
            Value::String("203.0.113.0/24".to_string())
        );
    }
}

#[tokio::test]
async fn test_preview_never_mutates_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut stack = stack_in(&dir);

    let preview = stack.preview(&program(), |_| {}).await.unwrap();
    assert_eq!(preview.summary.resource_changes.create, TOPOLOGY_SIZE);

    // Nothing recorded, nothing persisted
    assert_eq!(stack.state().serial, 0);
    assert!(stack.state().resources.is_empty());
    assert!(!dir
        .path()
        .join(".updraft/update-management/dev.json")
        .exists());
}

#[tokio::test]
async fn test_second_up_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut stack = stack_in(&dir);

    let first = stack.up(&program(), |_| {}).await.unwrap();
    let second = stack.up(&program(), |_| {}).await.unwrap();

    assert_eq!(second.summary.resource_changes.same, TOPOLOGY_SIZE);
    assert_eq!(second.summary.resource_changes.create, 0);
    assert_eq!(second.summary.resource_changes.update, 0);

    // Provider-assigned values are stable across applies
    assert_eq_pretty!(first.outputs, second.outputs);
}

#[tokio::test]
async fn test_changed_input_updates_only_affected_resource() {
    let dir = tempfile::tempdir().unwrap();
    let mut stack = stack_in(&dir);
    stack.up(&program(), |_| {}).await.unwrap();

    let mut changed = program();
    changed.source_address_prefix = "198.51.100.0/24".to_string();
    let result = stack.up(&changed, |_| {}).await.unwrap();

    // Only the security group consumes the source prefix
    assert_eq!(result.summary.resource_changes.update, 1);
    assert_eq!(result.summary.resource_changes.delete, 0);
    assert_eq!(
        result.summary.resource_changes.same,
        TOPOLOGY_SIZE - 1
    );

    let nsg = stack
        .state()
        .resources
        .iter()
        .find(|r| r.token == "azure:network:NetworkSecurityGroup")
        .unwrap();
    assert_eq!(
        nsg.inputs["security_rules"][0]["source_address_prefix"],
        Value::String("198.51.100.0/24".to_string())
    );
}

#[tokio::test]
async fn test_destroy_removes_everything() {
    let dir = tempfile::tempdir().unwrap();
    let mut stack = stack_in(&dir);
    stack.up(&program(), |_| {}).await.unwrap();

    let mut lines = Vec::new();
    let summary = stack.destroy(|line| lines.push(line.to_string())).await.unwrap();

    assert_eq!(summary.resource_changes.delete, TOPOLOGY_SIZE);
    assert!(stack.state().resources.is_empty());
    assert!(stack.outputs().is_empty());
    assert_eq!(lines.len(), TOPOLOGY_SIZE);

    // Deletion runs in reverse registration order: the extension goes first,
    // the management resource group last
    assert!(lines.first().unwrap().contains("VirtualMachineExtension"));
    assert!(lines.last().unwrap().contains("ResourceGroup"));
}

#[tokio::test]
async fn test_state_survives_reselection() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StateBackend::Json(dir.path().to_path_buf());

    {
        let mut stack = stack_in(&dir);
        stack.up(&program(), |_| {}).await.unwrap();
    }

    let stack = Stack::create_or_select("update-management", "dev", &backend).unwrap();
    assert_eq!(stack.state().resources.len(), TOPOLOGY_SIZE);
    assert_eq!(stack.state().serial, 1);
    assert_eq!(stack.state().plugins[0].name, "azure-native");
    assert!(stack.outputs().contains_key("vm_output"));
}

#[tokio::test]
async fn test_preview_after_up_reports_no_changes() {
    let dir = tempfile::tempdir().unwrap();
    let mut stack = stack_in(&dir);
    stack.up(&program(), |_| {}).await.unwrap();

    let mut lines = Vec::new();
    let preview = stack
        .preview(&program(), |line| lines.push(line.to_string()))
        .await
        .unwrap();

    assert!(!preview.summary.resource_changes.has_changes());
    assert_eq!(preview.summary.resource_changes.same, TOPOLOGY_SIZE);
    assert!(lines.iter().all(|line| line.contains("unchanged")));
}

#[tokio::test]
async fn test_missing_region_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let backend = StateBackend::Json(dir.path().to_path_buf());
    let mut stack = Stack::create_or_select("update-management", "dev", &backend).unwrap();

    let err = stack.up(&program(), |_| {}).await.unwrap_err();
    assert!(err
        .to_string()
        .contains("azure-native:location"));
}
