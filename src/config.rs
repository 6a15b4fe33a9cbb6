//! Configuration module for Updraft
//!
//! Handles loading the deployment configuration from multiple sources:
//! - A local environment file (`dev.env` by default, KEY=VALUE lines)
//! - Process environment variables (which override the file)
//!
//! Keys are case-insensitive, so `ADMIN_USER=ops` in the env file and
//! `admin_user` in the deserialized struct refer to the same value.

use std::path::Path;

use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default environment file consulted when `--env-file` is not given.
pub const DEFAULT_ENV_FILE: &str = "dev.env";

/// Deployment configuration consumed by the topology program.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Admin username provisioned on each virtual machine
    pub admin_user: Option<String>,

    /// SSH public key authorized for the admin user
    pub admin_ssh_pubkey: Option<String>,

    /// Source address prefix allowed inbound on ports 22 and 80
    pub access_source_address_prefix: Option<String>,

    /// Azure region the stack deploys into
    pub azure_location: Option<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            admin_user: None,
            admin_ssh_pubkey: None,
            access_source_address_prefix: None,
            azure_location: None,
        }
    }
}

impl DeployConfig {
    /// Load configuration from the given env file (if it exists) overlaid
    /// with process environment variables.
    pub fn load(env_file: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                File::from(env_file.to_path_buf())
                    .format(FileFormat::Ini)
                    .required(false),
            )
            .add_source(Environment::default())
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Admin username, or a missing-configuration error.
    pub fn admin_user(&self) -> Result<&str> {
        self.admin_user
            .as_deref()
            .ok_or_else(|| Error::MissingConfig("admin_user".to_string()))
    }

    /// SSH public key, or a missing-configuration error.
    pub fn admin_ssh_pubkey(&self) -> Result<&str> {
        self.admin_ssh_pubkey
            .as_deref()
            .ok_or_else(|| Error::MissingConfig("admin_ssh_pubkey".to_string()))
    }

    /// Allowed inbound source prefix, or a missing-configuration error.
    pub fn access_source_address_prefix(&self) -> Result<&str> {
        self.access_source_address_prefix
            .as_deref()
            .ok_or_else(|| Error::MissingConfig("access_source_address_prefix".to_string()))
    }

    /// Deployment region, or a missing-configuration error.
    pub fn azure_location(&self) -> Result<&str> {
        self.azure_location
            .as_deref()
            .ok_or_else(|| Error::MissingConfig("azure_location".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_env_file(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("dev.env");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    #[serial_test::serial]
    fn test_load_from_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_env_file(
            &dir,
            "ADMIN_USER=opsadmin\n\
             ADMIN_SSH_PUBKEY=ssh-ed25519 AAAA...\n\
             ACCESS_SOURCE_ADDRESS_PREFIX=203.0.113.0/24\n\
             AZURE_LOCATION=westeurope\n",
        );

        let cfg = DeployConfig::load(&path).unwrap();
        assert_eq!(cfg.admin_user().unwrap(), "opsadmin");
        assert_eq!(cfg.admin_ssh_pubkey().unwrap(), "ssh-ed25519 AAAA...");
        assert_eq!(
            cfg.access_source_address_prefix().unwrap(),
            "203.0.113.0/24"
        );
        assert_eq!(cfg.azure_location().unwrap(), "westeurope");
    }

    #[test]
    #[serial_test::serial]
    fn test_environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_env_file(&dir, "ADMIN_USER=fromfile\n");

        std::env::set_var("ADMIN_USER", "fromenv");
        let cfg = DeployConfig::load(&path).unwrap();
        std::env::remove_var("ADMIN_USER");

        assert_eq!(cfg.admin_user().unwrap(), "fromenv");
    }

    #[test]
    #[serial_test::serial]
    fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DeployConfig::load(&dir.path().join("absent.env")).unwrap();
        assert!(cfg.admin_user.is_none());
    }

    #[test]
    #[serial_test::serial]
    fn test_missing_required_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_env_file(&dir, "AZURE_LOCATION=westeurope\n");

        let cfg = DeployConfig::load(&path).unwrap();
        let err = cfg.admin_user().unwrap_err();
        assert!(matches!(err, Error::MissingConfig(ref key) if key == "admin_user"));
    }
}
