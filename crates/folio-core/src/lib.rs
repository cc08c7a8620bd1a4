//! Folio Core - Workspace provisioning engine
//!
//! Drives a [`StorageBackend`](folio_storage::StorageBackend) to:
//! - Provision a project workspace (folder taxonomy, manifest, starter documents)
//! - Relocate a workspace between lifecycle stages
//! - Remove a workspace
//!
//! # Example
//!
//! ```rust,no_run
//! use folio_core::WorkspaceProvisioner;
//! use folio_model::{ProjectWorkspaceIdentity, TemplateVariant};
//! use folio_storage::LocalBackend;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provisioner = WorkspaceProvisioner::new(Arc::new(LocalBackend::new("/srv/projects")))
//!     .with_template_library(Some("/srv/templates".into()));
//!
//! let identity = ProjectWorkspaceIdentity::new("TC2602001", "Projeto Teste", "EMP")?;
//! let result = provisioner.create(&identity, TemplateVariant::Full).await?;
//!
//! println!("created {} folders", result.created_count);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cache;
pub mod config;
pub mod error;
pub mod locator;
pub mod provisioner;
pub mod seeder;
pub mod types;

pub use cache::CreationCache;
pub use config::{
    BackendKind, CloudSection, EngineConfig, LocalSection, StorageSection, TemplatesSection,
    DEFAULT_AUTHORITY_BASE_URL,
};
pub use error::{ConfigError, LifecycleError, ProvisionError};
pub use locator::LifecycleLocator;
pub use provisioner::{WorkspaceProvisioner, DEFAULT_MAX_WORKERS};
pub use seeder::{SeedItem, TemplateDocumentSeeder, PROPOSAL_FOLDER};
pub use types::{
    DeleteReport, DeletedLocation, FolderFailure, MoveOutcome, ProvisionResult, SeedFailure, SeedReport,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Folio Core
    pub use crate::{EngineConfig, LifecycleLocator, MoveOutcome, ProvisionResult, WorkspaceProvisioner};
    pub use folio_model::{LifecycleStage, ProjectWorkspaceIdentity, TemplateVariant};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
