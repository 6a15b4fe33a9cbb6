//! # Updraft - Declarative Azure Update-Management Deployment
//!
//! Updraft declares a fixed Azure topology - resource groups, networking, a
//! monitored Linux virtual machine and a centralized update-management /
//! log-analytics stack - and drives the refresh, preview, update and destroy
//! lifecycle over it from a small CLI.
//!
//! ## Core Concepts
//!
//! - **Declarators**: groupings of resource declarations representing one
//!   logical unit (the update-management stack, a VM with its networking)
//! - **Stack engine**: compares declared resources with the recorded
//!   checkpoint and creates, updates, keeps or deletes them in order
//! - **Deferred values**: provider-assigned values ([`engine::Output`]) that
//!   chain dependent declarations; passing them onward is the only ordering
//!   mechanism
//! - **Provider**: the bundled, pinned resource provider performing simulated
//!   CRUD per resource type
//! - **Checkpoint**: the persisted stack state (resources, outputs, config,
//!   plugins) that preview diffs against
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       CLI Interface                          │
//! │          (apply by default, preview, destroy)                │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Topology Program                         │
//! │   (management stack + virtual network + N Linux VMs)         │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Stack Engine                           │
//! │   (plan computation, registration order, checkpointing)      │
//! └─────────────────────────────────────────────────────────────┘
//!                  │                          │
//!                  ▼                          ▼
//! ┌───────────────────────────┐   ┌───────────────────────────┐
//! │     Provider Registry      │   │     State Backends        │
//! │   (azure-native, pinned)   │   │     (JSON / memory)       │
//! └───────────────────────────┘   └───────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use updraft::engine::{Stack, StateBackend};
//! use updraft::program::UpdateManagementProgram;
//!
//! #[tokio::main]
//! async fn main() -> updraft::error::Result<()> {
//!     let mut stack = Stack::create_or_select(
//!         "update-management",
//!         "dev",
//!         &StateBackend::Json(std::env::current_dir()?),
//!     )?;
//!     stack.install_plugin("azure-native", "v1.23.0")?;
//!     stack.set_config("azure-native:location", "westeurope");
//!
//!     let program = UpdateManagementProgram {
//!         admin_user: "ops".into(),
//!         admin_ssh_pubkey: "ssh-ed25519 AAAA...".into(),
//!         source_address_prefix: "203.0.113.0/24".into(),
//!     };
//!     let result = stack.up(&program, |line| println!("{}", line)).await?;
//!     println!("{:?}", result.summary.resource_changes);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod program;
pub mod provider;
pub mod stacks;

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types.

    // Error handling
    pub use crate::error::{Error, Result};

    // Stack engine
    pub use crate::engine::{
        Output, RegisteredResource, ResourceOptions, Stack, StackContext, StackProgram,
        StateBackend,
    };

    // Configuration
    pub use crate::config::DeployConfig;

    // Topology
    pub use crate::program::UpdateManagementProgram;
    pub use crate::stacks::{UpdateManagement, UpdateManagementArgs, VmLinux, VmLinuxArgs};

    // Provider
    pub use crate::provider::{ProviderRegistry, ResourceProvider};
}
