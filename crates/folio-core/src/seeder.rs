//! Starter documents copied into a new workspace
//!
//! Templates come from a directory on the local disk (the template library)
//! and land in the workspace's proposal folder. Seeding is best effort: a
//! missing template or a failed upload is reported, not raised. Rejected
//! credentials are the exception and abort seeding.

use crate::error::ProvisionError;
use crate::types::{SeedFailure, SeedReport};
use folio_model::{FolderPath, ProjectWorkspaceIdentity, TemplateVariant};
use folio_storage::StorageBackend;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

/// Folder receiving the seeded documents
pub const PROPOSAL_FOLDER: &str = "01-PROPOSTA";

const PROPOSAL_DOC: &str = "TCxxxxxx-0.docx";
const SIMPLIFIED_DOC: &str = "TCxxxxxx-0_Simplificada.docx";
const VISIT_REPORT: &str = "Relatorio de Visita_V0.docx";
const PROPOSAL_SHEET: &str = "TCxxxxxx-0.xlsm";

/// One template copy: library file name and destination file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedItem {
    pub template: &'static str,
    pub destination: String,
}

/// Copies template documents into provisioned workspaces
#[derive(Clone)]
pub struct TemplateDocumentSeeder {
    backend: Arc<dyn StorageBackend>,
    library: Option<PathBuf>,
}

impl TemplateDocumentSeeder {
    /// Create seeder; `library` of `None` disables seeding
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>, library: Option<PathBuf>) -> Self {
        Self { backend, library }
    }

    /// Documents to copy for a variant, spreadsheet last
    #[must_use]
    pub fn plan(identity: &ProjectWorkspaceIdentity, variant: TemplateVariant) -> Vec<SeedItem> {
        let proposal = format!("{}-0.docx", identity.number());
        let mut items = match variant {
            TemplateVariant::Full => vec![SeedItem {
                template: PROPOSAL_DOC,
                destination: proposal,
            }],
            TemplateVariant::Simplified => vec![SeedItem {
                template: SIMPLIFIED_DOC,
                destination: proposal,
            }],
            TemplateVariant::Visit => vec![
                SeedItem {
                    template: VISIT_REPORT,
                    destination: "RelatorioVisita.docx".to_string(),
                },
                SeedItem {
                    template: SIMPLIFIED_DOC,
                    destination: proposal,
                },
            ],
        };
        items.push(SeedItem {
            template: PROPOSAL_SHEET,
            destination: format!("{}-0.xlsm", identity.number()),
        });
        items
    }

    /// Copy the variant's documents below `workspace_root`
    ///
    /// # Errors
    /// [`ProvisionError::Authentication`] if the backend rejects an upload's
    /// credentials. Documents seeded before that stay in place.
    pub async fn seed(
        &self,
        workspace_root: &FolderPath,
        identity: &ProjectWorkspaceIdentity,
        variant: TemplateVariant,
    ) -> Result<SeedReport, ProvisionError> {
        let mut report = SeedReport::default();
        let Some(library) = &self.library else {
            tracing::warn!(project = %identity.number(), "no template library configured, documents not seeded");
            return Ok(report);
        };
        if !tokio::fs::metadata(library).await.is_ok_and(|m| m.is_dir()) {
            tracing::warn!(library = %library.display(), "template library not found, documents not seeded");
            return Ok(report);
        }

        for item in Self::plan(identity, variant) {
            let destination = match workspace_root
                .child(PROPOSAL_FOLDER)
                .and_then(|dir| dir.child(item.destination.as_str()))
            {
                Ok(path) => path,
                Err(e) => {
                    report.failed.push(SeedFailure {
                        template: item.template.to_string(),
                        destination: workspace_root.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let source = library.join(item.template);
            let contents = match tokio::fs::read(&source).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::warn!(template = %source.display(), "template not found");
                    report.missing.push(item.template.to_string());
                    continue;
                }
                Err(e) => {
                    tracing::warn!(template = %source.display(), error = %e, "failed to read template");
                    report.failed.push(SeedFailure {
                        template: item.template.to_string(),
                        destination,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            match self.backend.upload_file(&destination, contents).await {
                Ok(()) => {
                    tracing::info!(path = %destination, "template document seeded");
                    report.seeded.push(destination);
                }
                Err(e) if e.is_auth_failure() => {
                    tracing::error!(path = %destination, error = %e, "authentication failed");
                    return Err(ProvisionError::Authentication {
                        path: destination,
                        source: e,
                    });
                }
                Err(e) => {
                    tracing::warn!(path = %destination, error = %e, "failed to seed template document");
                    report.failed.push(SeedFailure {
                        template: item.template.to_string(),
                        destination,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }
}

impl std::fmt::Debug for TemplateDocumentSeeder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateDocumentSeeder")
            .field("backend", &self.backend.describe())
            .field("library", &self.library)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_test_utils::{full_template_library, sample_identity, template_library, Failure, MemoryBackend};
    use pretty_assertions::assert_eq;

    const ROOT: &str = "Projetos Prospectados/2026/TC2602001 - EMP - Projeto Teste";

    fn root() -> FolderPath {
        ROOT.parse().unwrap()
    }

    #[test]
    fn visit_plan_includes_report_and_simplified_proposal() {
        let plan = TemplateDocumentSeeder::plan(&sample_identity(), TemplateVariant::Visit);
        let pairs: Vec<_> = plan.iter().map(|i| (i.template, i.destination.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                ("Relatorio de Visita_V0.docx", "RelatorioVisita.docx"),
                ("TCxxxxxx-0_Simplificada.docx", "TC2602001-0.docx"),
                ("TCxxxxxx-0.xlsm", "TC2602001-0.xlsm"),
            ]
        );
    }

    #[tokio::test]
    async fn full_variant_seeds_proposal_and_sheet() {
        let library = full_template_library();
        let backend = Arc::new(MemoryBackend::new());
        let seeder = TemplateDocumentSeeder::new(backend.clone(), Some(library.path().to_path_buf()));

        let report = seeder.seed(&root(), &sample_identity(), TemplateVariant::Full).await.unwrap();

        assert_eq!(report.seeded.len(), 2);
        assert!(report.missing.is_empty());
        let doc = backend.file(&format!("{ROOT}/01-PROPOSTA/TC2602001-0.docx")).unwrap();
        assert_eq!(doc, b"TCxxxxxx-0.docx");
        assert!(backend.file(&format!("{ROOT}/01-PROPOSTA/TC2602001-0.xlsm")).is_some());
    }

    #[tokio::test]
    async fn simplified_variant_uses_simplified_template() {
        let library = full_template_library();
        let backend = Arc::new(MemoryBackend::new());
        let seeder = TemplateDocumentSeeder::new(backend.clone(), Some(library.path().to_path_buf()));

        seeder.seed(&root(), &sample_identity(), TemplateVariant::Simplified).await.unwrap();

        let doc = backend.file(&format!("{ROOT}/01-PROPOSTA/TC2602001-0.docx")).unwrap();
        assert_eq!(doc, b"TCxxxxxx-0_Simplificada.docx");
    }

    #[tokio::test]
    async fn missing_templates_are_reported_not_raised() {
        let library = template_library(&["TCxxxxxx-0.xlsm"]);
        let backend = Arc::new(MemoryBackend::new());
        let seeder = TemplateDocumentSeeder::new(backend.clone(), Some(library.path().to_path_buf()));

        let report = seeder.seed(&root(), &sample_identity(), TemplateVariant::Visit).await.unwrap();

        assert_eq!(report.missing, vec!["Relatorio de Visita_V0.docx", "TCxxxxxx-0_Simplificada.docx"]);
        assert_eq!(report.seeded.len(), 1);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn upload_failure_is_recorded() {
        let library = full_template_library();
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_on(&format!("{ROOT}/01-PROPOSTA/TC2602001-0.docx"), Failure::Server);
        let seeder = TemplateDocumentSeeder::new(backend.clone(), Some(library.path().to_path_buf()));

        let report = seeder.seed(&root(), &sample_identity(), TemplateVariant::Full).await.unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].template, "TCxxxxxx-0.docx");
        assert_eq!(report.seeded.len(), 1);
    }

    #[tokio::test]
    async fn rejected_credentials_abort_seeding() {
        let library = full_template_library();
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_on(&format!("{ROOT}/01-PROPOSTA/TC2602001-0.docx"), Failure::Unauthorized);
        let seeder = TemplateDocumentSeeder::new(backend.clone(), Some(library.path().to_path_buf()));

        let err = seeder
            .seed(&root(), &sample_identity(), TemplateVariant::Full)
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::Authentication { .. }));
        assert!(backend.file(&format!("{ROOT}/01-PROPOSTA/TC2602001-0.xlsm")).is_none());
    }

    #[tokio::test]
    async fn unconfigured_library_seeds_nothing() {
        let backend = Arc::new(MemoryBackend::new());
        let seeder = TemplateDocumentSeeder::new(backend.clone(), None);

        let report = seeder.seed(&root(), &sample_identity(), TemplateVariant::Full).await.unwrap();

        assert_eq!(report, SeedReport::default());
        assert_eq!(backend.mutation_count(), 0);
    }
}
