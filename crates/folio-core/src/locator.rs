//! Finding which stage directory holds a workspace
//!
//! Probes the backend every time; nothing is cached between calls.

use crate::error::LifecycleError;
use folio_model::{FolderPath, LifecycleStage, PathError, ProjectWorkspaceIdentity};
use folio_storage::StorageBackend;
use std::sync::Arc;

/// Resolves workspace locations across lifecycle stages
#[derive(Clone)]
pub struct LifecycleLocator {
    backend: Arc<dyn StorageBackend>,
}

impl LifecycleLocator {
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// `{stage directory}/{year}/{folder name}`
    ///
    /// # Errors
    /// Returns [`PathError`] if the identity yields an invalid segment.
    pub fn path_for(identity: &ProjectWorkspaceIdentity, stage: LifecycleStage) -> Result<FolderPath, PathError> {
        FolderPath::new([
            stage.directory_name().to_string(),
            identity.year(),
            identity.folder_name(),
        ])
    }

    /// Location in every stage, ordered Prospected, Active, Finished
    ///
    /// # Errors
    /// Returns [`PathError`] if the identity yields an invalid segment.
    pub fn candidates(identity: &ProjectWorkspaceIdentity) -> Result<Vec<(LifecycleStage, FolderPath)>, PathError> {
        LifecycleStage::ALL
            .into_iter()
            .map(|stage| Self::path_for(identity, stage).map(|path| (stage, path)))
            .collect()
    }

    /// First candidate that exists on the backend
    ///
    /// # Errors
    /// [`LifecycleError::WorkspaceNotFound`] if no stage holds the workspace,
    /// or the lookup failure.
    pub async fn first_existing(
        &self,
        identity: &ProjectWorkspaceIdentity,
    ) -> Result<(LifecycleStage, FolderPath), LifecycleError> {
        for (stage, path) in Self::candidates(identity)? {
            if self.backend.folder_exists(&path).await? {
                tracing::debug!(project = %identity.number(), stage = %stage, path = %path, "workspace located");
                return Ok((stage, path));
            }
        }
        Err(LifecycleError::WorkspaceNotFound {
            folder_name: identity.folder_name(),
        })
    }

    /// Every candidate that exists on the backend, in stage order
    ///
    /// # Errors
    /// Returns the first lookup failure.
    pub async fn all_existing(
        &self,
        identity: &ProjectWorkspaceIdentity,
    ) -> Result<Vec<(LifecycleStage, FolderPath)>, LifecycleError> {
        let mut found = Vec::new();
        for (stage, path) in Self::candidates(identity)? {
            if self.backend.folder_exists(&path).await? {
                found.push((stage, path));
            }
        }
        Ok(found)
    }
}

impl std::fmt::Debug for LifecycleLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleLocator")
            .field("backend", &self.backend.describe())
            .finish()
    }
}
