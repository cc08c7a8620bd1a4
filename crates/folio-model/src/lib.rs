//! Folio Model
//!
//! Plain data shared by every layer of the workspace engine.
//!
//! # Core Concepts
//!
//! - [`ProjectWorkspaceIdentity`]: number, name and client abbreviation of a project
//! - [`LifecycleStage`]: which base directory currently holds a workspace
//! - [`TemplateVariant`]: which starter documents get seeded
//! - [`FolderPath`]: segment-based addressing understood by every backend
//! - [`FolderTaxonomyBuilder`]: the canonical folder tree of a workspace
//!
//! # Example
//!
//! ```rust
//! use folio_model::{FolderTaxonomyBuilder, ProjectWorkspaceIdentity, TemplateVariant};
//!
//! let identity = ProjectWorkspaceIdentity::new("TC2602001", "Projeto Teste", "EMP").unwrap();
//! assert_eq!(identity.year(), "2026");
//!
//! let taxonomy = FolderTaxonomyBuilder::build(&identity, TemplateVariant::Full);
//! assert_eq!(taxonomy.len(), 32);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod identity;
mod path;
mod stage;
mod taxonomy;
mod variant;

pub use identity::{IdentityError, ProjectWorkspaceIdentity, MAX_ABBREVIATION_LEN};
pub use path::{FolderPath, PathError};
pub use stage::{LifecycleStage, ParseStageError, ParseStatusError, ProjectStatus};
pub use taxonomy::{FolderTaxonomyBuilder, TaxonomyEntry, MANIFEST_FILE_NAME};
pub use variant::{ParseVariantError, TemplateVariant};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
