//! Declarators
//!
//! A declarator groups the provider resource declarations of one logical
//! unit behind a component: the centralized update-management stack and a
//! monitored Linux VM with its networking. Declarators only plumb arguments
//! into resource registrations; everything interesting (planning, CRUD,
//! ordering) happens in the engine and provider underneath them.

pub mod update_management;
pub mod vm_linux;

pub use update_management::{UpdateManagement, UpdateManagementArgs};
pub use vm_linux::{VmLinux, VmLinuxArgs};
