//! Per-call record of folders known to exist

use dashmap::DashSet;
use folio_model::FolderPath;

/// Folders confirmed to exist during one provisioning call
///
/// Shared by the call's workers; only successful creations (or folders found
/// already present) are recorded, so a failed path is retried by the next
/// call.
#[derive(Debug, Default)]
pub struct CreationCache {
    known: DashSet<FolderPath>,
}

impl CreationCache {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path` as existing; returns false if it was already recorded
    #[inline]
    pub fn mark(&self, path: FolderPath) -> bool {
        self.known.insert(path)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, path: &FolderPath) -> bool {
        self.known.contains(path)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.known.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}
