//! Error types for Folio Core
//!
//! Only failures that leave a workspace unusable surface as errors:
//! - Workspace root (or its stage/year parents) could not be created
//! - Authentication failed
//! - Workspace could not be located for relocation or removal
//! - Configuration is incomplete
//!
//! Everything else is recorded in the operation's report.

use folio_model::{FolderPath, PathError};
use folio_storage::StorageError;
use std::path::PathBuf;

/// Fatal failure of a provisioning call
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Stage, year or workspace root folder could not be created
    #[error("failed to create workspace root '{path}': {source}")]
    RootCreation {
        path: FolderPath,
        #[source]
        source: StorageError,
    },

    /// Backend rejected our credentials
    #[error("authentication failed at '{path}': {source}")]
    Authentication {
        path: FolderPath,
        #[source]
        source: StorageError,
    },

    /// Identity produced a path the backend cannot address
    #[error("invalid workspace path: {0}")]
    InvalidPath(#[from] PathError),
}

impl ProvisionError {
    /// Classify a backend failure on the workspace root chain
    pub(crate) fn from_root_failure(path: FolderPath, source: StorageError) -> Self {
        if source.is_auth_failure() {
            Self::Authentication { path, source }
        } else {
            Self::RootCreation { path, source }
        }
    }
}

/// Failure of a relocation or removal
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// No stage directory holds the workspace
    #[error("workspace '{folder_name}' not found in any lifecycle stage")]
    WorkspaceNotFound { folder_name: String },

    /// Backend operation failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Identity produced a path the backend cannot address
    #[error("invalid workspace path: {0}")]
    InvalidPath(#[from] PathError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`EngineConfig`](crate::EngineConfig)
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Required setting absent
    #[error("missing configuration value '{0}'")]
    Missing(&'static str),

    /// Setting present but unusable
    #[error("invalid value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },

    /// Backend could not be constructed
    #[error("failed to build storage backend: {0}")]
    Backend(#[from] StorageError),
}
