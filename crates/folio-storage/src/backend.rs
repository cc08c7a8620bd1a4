//! Storage backend capability contract
//!
//! The engine never talks to a filesystem or an HTTP API directly; it only
//! sees this trait. Implementations must honour the idempotency rules below
//! so that provisioning can be retried safely.

use crate::error::StorageError;
use folio_model::FolderPath;
use serde::Serialize;

/// Result of a folder creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FolderOutcome {
    /// Folder did not exist and was created
    Created,
    /// Folder was already there; nothing changed
    AlreadyExisted,
}

/// Result of a recursive delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeleteOutcome {
    /// Folder existed and was removed
    Deleted,
    /// Nothing to remove
    NotFound,
}

/// Folder and file operations on one storage root
///
/// All paths are relative to the backend's configured root.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short description for log lines (backend kind and root)
    fn describe(&self) -> String;

    /// Create a single folder whose parent already exists
    ///
    /// Must be idempotent: an existing folder yields
    /// [`FolderOutcome::AlreadyExisted`], never a renamed sibling.
    async fn create_folder(&self, path: &FolderPath) -> Result<FolderOutcome, StorageError>;

    /// Write a file, replacing any previous content
    async fn upload_file(&self, path: &FolderPath, contents: Vec<u8>) -> Result<(), StorageError>;

    /// Rename a folder to a new location
    ///
    /// Creates the destination's parent chain first. Fails with
    /// [`StorageError::NotFound`] if the source is missing and
    /// [`StorageError::AlreadyExists`] if the destination is occupied.
    async fn move_folder(&self, source: &FolderPath, destination: &FolderPath) -> Result<(), StorageError>;

    /// Recursively delete a folder; a missing folder is not an error
    async fn delete_folder(&self, path: &FolderPath) -> Result<DeleteOutcome, StorageError>;

    /// Whether a folder exists at `path`
    async fn folder_exists(&self, path: &FolderPath) -> Result<bool, StorageError>;
}

/// Create every missing ancestor of `path` (inclusive), shallowest first
///
/// # Errors
/// Returns the first backend failure.
pub async fn create_folder_chain(
    backend: &dyn StorageBackend,
    path: &FolderPath,
) -> Result<usize, StorageError> {
    let mut created = 0;
    for prefix in path.ancestors_inclusive() {
        if backend.create_folder(&prefix).await? == FolderOutcome::Created {
            created += 1;
        }
    }
    Ok(created)
}
