//! Reports returned by provisioning, relocation and removal

use folio_model::{FolderPath, LifecycleStage};
use serde::Serialize;

/// A taxonomy folder that could not be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderFailure {
    /// Full backend path of the folder
    pub path: FolderPath,
    /// Backend error message
    pub error: String,
}

/// A template document that could not be uploaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedFailure {
    /// Template file name in the library
    pub template: String,
    /// Destination inside the workspace
    pub destination: FolderPath,
    pub error: String,
}

/// Outcome of seeding starter documents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    /// Documents written
    pub seeded: Vec<FolderPath>,
    /// Template file names absent from the library
    pub missing: Vec<String>,
    /// Uploads that failed
    pub failed: Vec<SeedFailure>,
}

impl SeedReport {
    /// No upload failed (missing templates are tolerated)
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of a provisioning call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionResult {
    /// `{stage}/{year}/{folder name}`
    pub workspace_root: FolderPath,
    /// Folders created by this call (root chain included)
    pub created_count: usize,
    /// Folders that were already there
    pub already_existing_count: usize,
    /// Taxonomy folders that failed
    pub failed: Vec<FolderFailure>,
    /// Taxonomy folders never attempted because the deadline passed
    pub skipped: Vec<FolderPath>,
    /// Whether `README.txt` was uploaded
    pub manifest_written: bool,
    pub seed: SeedReport,
    pub deadline_exceeded: bool,
}

impl ProvisionResult {
    pub(crate) fn new(workspace_root: FolderPath) -> Self {
        Self {
            workspace_root,
            created_count: 0,
            already_existing_count: 0,
            failed: Vec::new(),
            skipped: Vec::new(),
            manifest_written: false,
            seed: SeedReport::default(),
            deadline_exceeded: false,
        }
    }

    /// Every folder exists, manifest written, no seeding upload failed
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
            && self.skipped.is_empty()
            && !self.deadline_exceeded
            && self.manifest_written
            && self.seed.is_clean()
    }
}

/// Outcome of a relocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// Workspace already lives in the requested stage; nothing changed
    AlreadyInPlace { path: FolderPath },
    /// Workspace subtree was moved
    Moved { from: FolderPath, to: FolderPath },
}

/// One removed workspace location
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedLocation {
    pub stage: LifecycleStage,
    pub path: FolderPath,
}

/// Outcome of a removal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    /// Locations removed, in stage order
    pub deleted: Vec<DeletedLocation>,
}
