//! Error types for Updraft.
//!
//! This module defines the crate-level error type. All failures — invalid
//! configuration, provider errors, state persistence problems — propagate
//! unmodified to the process boundary and terminate execution; nothing is
//! caught, classified or retried along the way.

use thiserror::Error;

use crate::engine::state::StateError;
use crate::provider::ProviderError;

/// Result type alias for Updraft operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Updraft.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Error loading or merging deployment configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required configuration value was not provided.
    #[error("Missing required configuration value '{0}' (set it in the env file or environment)")]
    MissingConfig(String),

    // ========================================================================
    // Plugin Errors
    // ========================================================================
    /// The requested provider plugin is not bundled with this build.
    #[error("Unknown provider plugin '{0}'")]
    UnknownPlugin(String),

    /// The requested provider plugin version does not match the pinned one.
    #[error("Provider plugin '{name}' version mismatch: requested {requested}, bundled {bundled}")]
    PluginVersion {
        /// Plugin name
        name: String,
        /// Version requested by the program
        requested: String,
        /// Version bundled with this build
        bundled: String,
    },

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// The same resource URN was registered twice in one program run.
    #[error("Duplicate resource registration: {0}")]
    DuplicateResource(String),

    /// A stack output could not be resolved during apply.
    #[error("Unresolved output '{0}' after apply")]
    UnresolvedOutput(String),

    /// Provider-level failure during resource CRUD.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// State persistence failure.
    #[error(transparent)]
    State(#[from] StateError),

    // ========================================================================
    // Serialization / IO Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Provider(_) | Error::DuplicateResource(_) | Error::UnresolvedOutput(_) => 2,
            Error::UnknownPlugin(_) | Error::PluginVersion { .. } => 3,
            Error::Config(_) | Error::MissingConfig(_) => 4,
            Error::State(_) => 5,
            _ => 1,
        }
    }
}
