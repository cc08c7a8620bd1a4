//! Folio Storage
//!
//! The capability contract the provisioning engine is written against, and
//! the two adapters that implement it.
//!
//! # Backends
//!
//! - [`LocalBackend`]: directories on the local filesystem
//! - [`GraphBackend`]: a Microsoft Graph drive, authenticated through
//!   [`TokenAuthenticator`] with OAuth2 client credentials
//!
//! # Example
//!
//! ```rust,no_run
//! use folio_model::FolderPath;
//! use folio_storage::{create_folder_chain, LocalBackend};
//!
//! # async fn example() -> Result<(), folio_storage::StorageError> {
//! let backend = LocalBackend::new("/srv/projects");
//! let path: FolderPath = "Projetos Prospectados/2026".parse().unwrap();
//! create_folder_chain(&backend, &path).await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod auth;
mod backend;
mod error;
mod graph;
mod local;

pub use auth::{
    with_auth_retry, AccessToken, ClientCredentialsSource, TokenAuthenticator, TokenSource,
    GRAPH_DEFAULT_SCOPE,
};
pub use backend::{create_folder_chain, DeleteOutcome, FolderOutcome, StorageBackend};
pub use error::{AuthError, StorageError};
pub use graph::{GraphBackend, GraphConfig, DEFAULT_GRAPH_BASE_URL};
pub use local::LocalBackend;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
