//! Local filesystem backend

use crate::backend::{DeleteOutcome, FolderOutcome, StorageBackend};
use crate::error::StorageError;
use folio_model::FolderPath;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Backend storing workspaces below a directory on the local disk
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create backend rooted at `root` (created lazily on first write)
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute filesystem path for a backend path
    #[must_use]
    pub fn resolve(&self, path: &FolderPath) -> PathBuf {
        path.iter().fold(self.root.clone(), |acc, seg| acc.join(seg))
    }

    async fn is_dir(&self, full: &Path) -> Result<bool, StorageError> {
        match tokio::fs::metadata(full).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io_error(full, e)),
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalBackend {
    fn describe(&self) -> String {
        format!("local:{}", self.root.display())
    }

    async fn create_folder(&self, path: &FolderPath) -> Result<FolderOutcome, StorageError> {
        let full = self.resolve(path);
        if path.len() <= 1 {
            tokio::fs::create_dir_all(&self.root)
                .await
                .map_err(|e| StorageError::io_error(&self.root, e))?;
        }

        // only the last segment; a missing parent is an error like on the remote backends
        match tokio::fs::create_dir(&full).await {
            Ok(()) => {
                tracing::debug!(path = %full.display(), "folder created");
                Ok(FolderOutcome::Created)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !self.is_dir(&full).await? {
                    return Err(StorageError::io_error(&full, e));
                }
                tracing::debug!(path = %path, "folder already exists");
                Ok(FolderOutcome::AlreadyExisted)
            }
            Err(e) => Err(StorageError::io_error(&full, e)),
        }
    }

    async fn upload_file(&self, path: &FolderPath, contents: Vec<u8>) -> Result<(), StorageError> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io_error(parent, e))?;
        }
        tokio::fs::write(&full, contents)
            .await
            .map_err(|e| StorageError::io_error(&full, e))?;
        tracing::debug!(path = %full.display(), "file written");
        Ok(())
    }

    async fn move_folder(&self, source: &FolderPath, destination: &FolderPath) -> Result<(), StorageError> {
        let from = self.resolve(source);
        let to = self.resolve(destination);

        if !self.is_dir(&from).await? {
            return Err(StorageError::NotFound(source.clone()));
        }
        if tokio::fs::try_exists(&to)
            .await
            .map_err(|e| StorageError::io_error(&to, e))?
        {
            return Err(StorageError::AlreadyExists(destination.clone()));
        }
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io_error(parent, e))?;
        }

        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| StorageError::io_error(&from, e))?;
        tracing::debug!(from = %from.display(), to = %to.display(), "folder moved");
        Ok(())
    }

    async fn delete_folder(&self, path: &FolderPath) -> Result<DeleteOutcome, StorageError> {
        let full = self.resolve(path);
        match tokio::fs::remove_dir_all(&full).await {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DeleteOutcome::NotFound),
            Err(e) => Err(StorageError::io_error(&full, e)),
        }
    }

    async fn folder_exists(&self, path: &FolderPath) -> Result<bool, StorageError> {
        self.is_dir(&self.resolve(path)).await
    }
}
