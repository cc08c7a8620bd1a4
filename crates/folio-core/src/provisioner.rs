//! Workspace provisioning, relocation and removal
//!
//! Creation walks the taxonomy one depth level at a time. Folders of a level
//! are created concurrently on a bounded worker pool, and the next level only
//! starts once every folder of the current one has settled, so a folder's
//! parent always exists (or has definitively failed) before it is attempted.

use crate::cache::CreationCache;
use crate::error::{LifecycleError, ProvisionError};
use crate::locator::LifecycleLocator;
use crate::seeder::TemplateDocumentSeeder;
use crate::types::{DeleteReport, DeletedLocation, FolderFailure, MoveOutcome, ProvisionResult};
use folio_model::{
    FolderPath, FolderTaxonomyBuilder, LifecycleStage, ProjectWorkspaceIdentity, TemplateVariant,
    MANIFEST_FILE_NAME,
};
use folio_storage::{DeleteOutcome, FolderOutcome, StorageBackend, StorageError};
use futures::stream::{FuturesUnordered, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// Default number of concurrent folder creations
pub const DEFAULT_MAX_WORKERS: usize = 30;

/// Creates, relocates and removes project workspaces on one backend
#[derive(Clone)]
pub struct WorkspaceProvisioner {
    backend: Arc<dyn StorageBackend>,
    locator: LifecycleLocator,
    seeder: TemplateDocumentSeeder,
    max_workers: usize,
}

impl WorkspaceProvisioner {
    /// Create provisioner without a template library
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            locator: LifecycleLocator::new(backend.clone()),
            seeder: TemplateDocumentSeeder::new(backend.clone(), None),
            backend,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }

    /// With max concurrent folder creations (at least 1)
    #[inline]
    #[must_use]
    pub fn with_max_workers(mut self, max: usize) -> Self {
        self.max_workers = max.max(1);
        self
    }

    /// With template library directory used for seeding
    #[must_use]
    pub fn with_template_library(mut self, library: Option<PathBuf>) -> Self {
        self.seeder = TemplateDocumentSeeder::new(self.backend.clone(), library);
        self
    }

    #[inline]
    #[must_use]
    pub fn locator(&self) -> &LifecycleLocator {
        &self.locator
    }

    #[inline]
    #[must_use]
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Provision a new workspace under the Prospected stage
    ///
    /// # Errors
    /// - [`ProvisionError::RootCreation`] if the workspace root chain fails
    /// - [`ProvisionError::Authentication`] on any authentication failure
    ///
    /// Other folder, manifest and seeding failures are recorded in the result.
    pub async fn create(
        &self,
        identity: &ProjectWorkspaceIdentity,
        variant: TemplateVariant,
    ) -> Result<ProvisionResult, ProvisionError> {
        self.provision(identity, variant, None).await
    }

    /// Like [`create`](Self::create), but stop scheduling new levels once
    /// `deadline` has passed
    ///
    /// In-flight creations of the current level are always awaited. Levels
    /// never started are listed in [`ProvisionResult::skipped`], and the
    /// manifest and documents are not written.
    ///
    /// # Errors
    /// Same as [`create`](Self::create).
    pub async fn create_with_deadline(
        &self,
        identity: &ProjectWorkspaceIdentity,
        variant: TemplateVariant,
        deadline: Instant,
    ) -> Result<ProvisionResult, ProvisionError> {
        self.provision(identity, variant, Some(deadline)).await
    }

    async fn provision(
        &self,
        identity: &ProjectWorkspaceIdentity,
        variant: TemplateVariant,
        deadline: Option<Instant>,
    ) -> Result<ProvisionResult, ProvisionError> {
        let root = LifecycleLocator::path_for(identity, LifecycleStage::Prospected)?;
        let mut result = ProvisionResult::new(root.clone());
        let cache = Arc::new(CreationCache::new());

        tracing::info!(
            project = %identity.number(),
            path = %root,
            variant = %variant,
            backend = %self.backend.describe(),
            "provisioning workspace"
        );

        for prefix in root.ancestors_inclusive() {
            match self.backend.create_folder(&prefix).await {
                Ok(outcome) => {
                    tally(&mut result, outcome);
                    cache.mark(prefix);
                }
                Err(e) => {
                    tracing::error!(path = %prefix, error = %e, "failed to create workspace root");
                    return Err(ProvisionError::from_root_failure(prefix, e));
                }
            }
        }

        let entries = FolderTaxonomyBuilder::build(identity, variant);
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut levels = FolderTaxonomyBuilder::group_by_depth(&entries).into_iter();

        while let Some((depth, paths)) = levels.next() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                result.deadline_exceeded = true;
                result.skipped.extend(paths.iter().map(|p| root.join(p)));
                for (_, rest) in levels.by_ref() {
                    result.skipped.extend(rest.iter().map(|p| root.join(p)));
                }
                tracing::warn!(
                    project = %identity.number(),
                    depth,
                    skipped = result.skipped.len(),
                    "deadline exceeded, remaining levels not scheduled"
                );
                break;
            }
            self.create_level(depth, &root, paths, &cache, &semaphore, &mut result)
                .await?;
        }

        if result.deadline_exceeded {
            return Ok(result);
        }

        self.write_manifest(identity, &root, &entries, &mut result).await?;
        result.seed = self.seeder.seed(&root, identity, variant).await?;

        tracing::info!(
            project = %identity.number(),
            path = %root,
            created = result.created_count,
            already_existing = result.already_existing_count,
            failed = result.failed.len(),
            seeded = result.seed.seeded.len(),
            "workspace provisioned"
        );
        Ok(result)
    }

    /// Create one depth level concurrently and wait for all of it
    async fn create_level(
        &self,
        depth: usize,
        root: &FolderPath,
        paths: Vec<FolderPath>,
        cache: &Arc<CreationCache>,
        semaphore: &Arc<Semaphore>,
        result: &mut ProvisionResult,
    ) -> Result<(), ProvisionError> {
        tracing::debug!(depth, folders = paths.len(), "creating taxonomy level");
        let mut tasks = FuturesUnordered::new();

        for relative in paths {
            let full = root.join(&relative);
            if cache.contains(&full) {
                tracing::debug!(path = %full, "folder already created in this call");
                continue;
            }
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                result.failed.push(FolderFailure {
                    path: full,
                    error: "worker pool closed".to_string(),
                });
                continue;
            };

            let backend = self.backend.clone();
            let cache = cache.clone();
            let path = full.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                let outcome = backend.create_folder(&path).await;
                if outcome.is_ok() {
                    cache.mark(path);
                }
                outcome
            });
            tasks.push(async move { (full, handle.await) });
        }

        let mut auth_failure: Option<(FolderPath, StorageError)> = None;
        while let Some((path, joined)) = tasks.next().await {
            match joined {
                Ok(Ok(outcome)) => {
                    if outcome == FolderOutcome::Created {
                        tracing::info!(path = %path, "folder created");
                    }
                    tally(result, outcome);
                }
                Ok(Err(e)) if e.is_auth_failure() => {
                    tracing::error!(path = %path, error = %e, "authentication failed");
                    auth_failure.get_or_insert((path, e));
                }
                Ok(Err(e)) => {
                    tracing::warn!(path = %path, error = %e, "failed to create folder");
                    result.failed.push(FolderFailure {
                        path,
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "folder creation task failed");
                    result.failed.push(FolderFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        match auth_failure {
            Some((path, source)) => Err(ProvisionError::Authentication { path, source }),
            None => Ok(()),
        }
    }

    async fn write_manifest(
        &self,
        identity: &ProjectWorkspaceIdentity,
        root: &FolderPath,
        entries: &[folio_model::TaxonomyEntry],
        result: &mut ProvisionResult,
    ) -> Result<(), ProvisionError> {
        let path = root.child(MANIFEST_FILE_NAME)?;
        let manifest = FolderTaxonomyBuilder::render_manifest(identity, entries);

        match self.backend.upload_file(&path, manifest.into_bytes()).await {
            Ok(()) => {
                tracing::info!(path = %path, "manifest written");
                result.manifest_written = true;
                Ok(())
            }
            Err(e) if e.is_auth_failure() => {
                tracing::error!(path = %path, error = %e, "authentication failed");
                Err(ProvisionError::Authentication { path, source: e })
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "failed to write manifest");
                Ok(())
            }
        }
    }

    /// Move a workspace to `to_stage`
    ///
    /// A workspace already in `to_stage` is left untouched.
    ///
    /// # Errors
    /// [`LifecycleError::WorkspaceNotFound`] if no stage holds the workspace,
    /// or the backend failure.
    pub async fn move_to(
        &self,
        identity: &ProjectWorkspaceIdentity,
        to_stage: LifecycleStage,
    ) -> Result<MoveOutcome, LifecycleError> {
        let (stage, current) = self.locator.first_existing(identity).await?;
        if stage == to_stage {
            tracing::info!(project = %identity.number(), stage = %stage, "workspace already in place");
            return Ok(MoveOutcome::AlreadyInPlace { path: current });
        }

        let destination = LifecycleLocator::path_for(identity, to_stage)?;
        self.backend.move_folder(&current, &destination).await.map_err(|e| {
            tracing::error!(from = %current, to = %destination, error = %e, "failed to move workspace");
            e
        })?;
        tracing::info!(
            project = %identity.number(),
            from = %current,
            to = %destination,
            "workspace moved"
        );
        Ok(MoveOutcome::Moved {
            from: current,
            to: destination,
        })
    }

    /// Remove the workspace from every stage that holds it
    ///
    /// Callers are responsible for only deleting workspaces whose stage
    /// [permits it](LifecycleStage::permits_deletion).
    ///
    /// # Errors
    /// [`LifecycleError::WorkspaceNotFound`] if no stage holds the workspace,
    /// or the backend failure.
    pub async fn delete(&self, identity: &ProjectWorkspaceIdentity) -> Result<DeleteReport, LifecycleError> {
        let existing = self.locator.all_existing(identity).await?;
        if existing.is_empty() {
            return Err(LifecycleError::WorkspaceNotFound {
                folder_name: identity.folder_name(),
            });
        }

        let mut report = DeleteReport::default();
        for (stage, path) in existing {
            match self.backend.delete_folder(&path).await? {
                DeleteOutcome::Deleted => {
                    tracing::info!(project = %identity.number(), path = %path, "workspace deleted");
                    report.deleted.push(DeletedLocation { stage, path });
                }
                DeleteOutcome::NotFound => {
                    tracing::debug!(path = %path, "workspace vanished before deletion");
                }
            }
        }
        Ok(report)
    }
}

fn tally(result: &mut ProvisionResult, outcome: FolderOutcome) {
    match outcome {
        FolderOutcome::Created => result.created_count += 1,
        FolderOutcome::AlreadyExisted => result.already_existing_count += 1,
    }
}

impl std::fmt::Debug for WorkspaceProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceProvisioner")
            .field("backend", &self.backend.describe())
            .field("max_workers", &self.max_workers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_test_utils::{sample_identity, Failure, MemoryBackend};
    use std::time::Duration;

    const ROOT: &str = "Projetos Prospectados/2026/TC2602001 - EMP - Projeto Teste";

    fn provisioner(backend: &Arc<MemoryBackend>) -> WorkspaceProvisioner {
        WorkspaceProvisioner::new(backend.clone())
    }

    #[tokio::test]
    async fn create_counts_root_chain_and_taxonomy() {
        let backend = Arc::new(MemoryBackend::new());
        let result = provisioner(&backend)
            .create(&sample_identity(), TemplateVariant::Full)
            .await
            .unwrap();

        assert_eq!(result.workspace_root.to_string(), ROOT);
        assert_eq!(result.created_count, 3 + 32);
        assert_eq!(result.already_existing_count, 0);
        assert!(result.manifest_written);
        assert!(result.failed.is_empty());
    }

    #[tokio::test]
    async fn existing_stage_dirs_count_as_already_existing() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_folder("Projetos Prospectados/2026");

        let result = provisioner(&backend)
            .create(&sample_identity(), TemplateVariant::Full)
            .await
            .unwrap();

        assert_eq!(result.already_existing_count, 2);
        assert_eq!(result.created_count, 33);
    }

    #[tokio::test]
    async fn concurrency_is_bounded_by_max_workers() {
        let backend = Arc::new(MemoryBackend::new().with_latency(Duration::from_millis(5)));
        provisioner(&backend)
            .with_max_workers(4)
            .create(&sample_identity(), TemplateVariant::Full)
            .await
            .unwrap();

        assert!(backend.peak_concurrency() <= 4);
        assert!(backend.peak_concurrency() >= 1);
    }

    #[tokio::test]
    async fn failed_parent_fails_children_without_aborting() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_on(&format!("{ROOT}/03-GESTAO"), Failure::Server);

        let result = provisioner(&backend)
            .create(&sample_identity(), TemplateVariant::Full)
            .await
            .unwrap();

        // 03-GESTAO, its four children and three grandchildren
        assert_eq!(result.failed.len(), 8);
        assert!(backend.has_folder(&format!("{ROOT}/02-DESENVOLVIMENTO/2.10-SOFTWARES")));
        assert!(result.manifest_written);
        assert!(!result.is_complete());
    }

    #[tokio::test]
    async fn root_failure_is_fatal() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_on("Projetos Prospectados/2026", Failure::Server);

        let err = provisioner(&backend)
            .create(&sample_identity(), TemplateVariant::Full)
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::RootCreation { .. }));
        assert!(backend.files().is_empty());
    }

    #[tokio::test]
    async fn auth_failure_in_level_is_fatal() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_on(&format!("{ROOT}/01-PROPOSTA"), Failure::Unauthorized);

        let err = provisioner(&backend)
            .create(&sample_identity(), TemplateVariant::Full)
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::Authentication { .. }));
        // the rest of the level still settled
        assert!(backend.has_folder(&format!("{ROOT}/03-GESTAO")));
        assert!(!backend.has_folder(&format!("{ROOT}/03-GESTAO/3.1-PEDIDO_COMPRA")));
    }

    #[tokio::test]
    async fn auth_failure_while_seeding_is_fatal() {
        let library = folio_test_utils::full_template_library();
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_on(&format!("{ROOT}/01-PROPOSTA/TC2602001-0.docx"), Failure::Unauthorized);

        let err = provisioner(&backend)
            .with_template_library(Some(library.path().to_path_buf()))
            .create(&sample_identity(), TemplateVariant::Full)
            .await
            .unwrap_err();

        match err {
            ProvisionError::Authentication { path, .. } => {
                assert_eq!(path.to_string(), format!("{ROOT}/01-PROPOSTA/TC2602001-0.docx"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn passed_deadline_skips_every_level() {
        let backend = Arc::new(MemoryBackend::new());
        let result = provisioner(&backend)
            .create_with_deadline(&sample_identity(), TemplateVariant::Full, Instant::now())
            .await
            .unwrap();

        assert!(result.deadline_exceeded);
        assert_eq!(result.skipped.len(), 32);
        assert_eq!(result.created_count, 3);
        assert!(!result.manifest_written);
        assert!(backend.files().is_empty());
    }

    #[tokio::test]
    async fn move_to_same_stage_is_noop() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_folder(ROOT);

        let outcome = provisioner(&backend)
            .move_to(&sample_identity(), LifecycleStage::Prospected)
            .await
            .unwrap();

        assert!(matches!(outcome, MoveOutcome::AlreadyInPlace { .. }));
        assert_eq!(backend.mutation_count(), 0);
    }

    #[tokio::test]
    async fn move_missing_workspace_fails() {
        let backend = Arc::new(MemoryBackend::new());
        let err = provisioner(&backend)
            .move_to(&sample_identity(), LifecycleStage::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::WorkspaceNotFound { .. }));
    }

    #[tokio::test]
    async fn delete_removes_every_copy() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert_folder(ROOT);
        backend.insert_folder("Projetos Finalizados/2026/TC2602001 - EMP - Projeto Teste");

        let report = provisioner(&backend).delete(&sample_identity()).await.unwrap();

        assert_eq!(report.deleted.len(), 2);
        assert_eq!(report.deleted[0].stage, LifecycleStage::Prospected);
        assert_eq!(report.deleted[1].stage, LifecycleStage::Finished);
    }

    #[tokio::test]
    async fn delete_missing_workspace_fails() {
        let backend = Arc::new(MemoryBackend::new());
        let err = provisioner(&backend).delete(&sample_identity()).await.unwrap_err();
        assert!(matches!(err, LifecycleError::WorkspaceNotFound { .. }));
    }
}
