//! Canonical workspace folder taxonomy
//!
//! Every project workspace carries the same tree. The tree is a static asset:
//! it does not depend on the project or the template variant, and it is
//! listed parent-before-child so it can be created level by level.

use crate::identity::ProjectWorkspaceIdentity;
use crate::path::FolderPath;
use crate::variant::TemplateVariant;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Name of the manifest file written at the workspace root
pub const MANIFEST_FILE_NAME: &str = "README.txt";

/// Static folder list: (relative path, description)
const TAXONOMY: &[(&str, &str)] = &[
    ("01-PROPOSTA", "Documentação comercial e orçamentos"),
    ("02-DESENVOLVIMENTO", "Desenvolvimento técnico do projeto"),
    ("03-GESTAO", "Gestão e controle do projeto"),
    ("01-PROPOSTA/1.1-INFO_CLIENTE", "Informações do cliente"),
    ("01-PROPOSTA/1.2-FOTOS", "Fotos e imagens da proposta"),
    ("01-PROPOSTA/1.3-DOCUMENTOS", "Documentos da proposta"),
    ("01-PROPOSTA/1.4-ORÇAMENTOS", "Orçamentos e cotações"),
    ("02-DESENVOLVIMENTO/2.1-INFO_CLIENTE", "Informações técnicas do cliente"),
    ("02-DESENVOLVIMENTO/2.2-DOCUMENTOS", "Documentação técnica"),
    ("02-DESENVOLVIMENTO/2.2-DOCUMENTOS/2.2.1-DESCRITIVOS", "Descritivos técnicos"),
    ("02-DESENVOLVIMENTO/2.2-DOCUMENTOS/2.2.2-LISTA_MATERIAIS", "Listas de materiais"),
    ("02-DESENVOLVIMENTO/2.2-DOCUMENTOS/2.2.3-MANUAIS_EQUIPAMENTOS", "Manuais de equipamentos"),
    ("02-DESENVOLVIMENTO/2.2-DOCUMENTOS/2.2.4-FLUXOGRAMAS", "Fluxogramas do processo"),
    ("02-DESENVOLVIMENTO/2.2-DOCUMENTOS/2.2.5-MANUAIS_PROJETO", "Manuais do projeto"),
    ("02-DESENVOLVIMENTO/2.3-PROJETO_ELETRICO", "Projeto elétrico"),
    ("02-DESENVOLVIMENTO/2.3-PROJETO_ELETRICO/2.3.1-DIAGRAMA", "Diagramas elétricos"),
    ("02-DESENVOLVIMENTO/2.3-PROJETO_ELETRICO/2.3.2-LAYOUT", "Layouts elétricos"),
    ("02-DESENVOLVIMENTO/2.3-PROJETO_ELETRICO/2.3.3-MEMORIA_CALCULO", "Memórias de cálculo"),
    ("02-DESENVOLVIMENTO/2.4-PROJETO_MECANICO", "Projeto mecânico"),
    ("02-DESENVOLVIMENTO/2.5-CLP", "Programação de CLP"),
    ("02-DESENVOLVIMENTO/2.6-IHM", "Interface Homem-Máquina"),
    ("02-DESENVOLVIMENTO/2.7-SUPERVISORIO", "Sistema supervisório"),
    ("02-DESENVOLVIMENTO/2.8-FOTOS", "Fotos do desenvolvimento"),
    ("02-DESENVOLVIMENTO/2.9-COMUNICACAO", "Comunicações e protocolos"),
    ("02-DESENVOLVIMENTO/2.10-SOFTWARES", "Softwares utilizados"),
    ("03-GESTAO/3.1-PEDIDO_COMPRA", "Pedidos de compra"),
    ("03-GESTAO/3.2-CRONOGRAMA", "Cronogramas do projeto"),
    ("03-GESTAO/3.3-DESPESAS", "Despesas do projeto"),
    ("03-GESTAO/3.3-DESPESAS/3.3.1-ORÇAMENTOS", "Orçamentos de despesas"),
    ("03-GESTAO/3.3-DESPESAS/3.3.2-PEDIDOS_COMPRA", "Pedidos de compra"),
    ("03-GESTAO/3.3-DESPESAS/3.3.3-NOTAS_FISCAIS", "Notas fiscais"),
    ("03-GESTAO/3.4-NOTAS_FATURAMENTO", "Notas de faturamento"),
];

/// One folder of the taxonomy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyEntry {
    /// Path relative to the workspace root
    pub path: FolderPath,
    /// Human description, used in the manifest
    pub description: &'static str,
}

impl TaxonomyEntry {
    /// Depth relative to the workspace root (top-level folders are 0)
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.depth()
    }
}

/// Builds the canonical folder list for a workspace
#[derive(Debug, Clone, Copy, Default)]
pub struct FolderTaxonomyBuilder;

impl FolderTaxonomyBuilder {
    /// Ordered folder list for a workspace
    ///
    /// The list is the same for every identity and variant; the variant only
    /// matters to document seeding.
    #[must_use]
    pub fn build(_identity: &ProjectWorkspaceIdentity, _variant: TemplateVariant) -> Vec<TaxonomyEntry> {
        Self::entries()
    }

    /// The static taxonomy, parent-before-child
    #[must_use]
    pub fn entries() -> Vec<TaxonomyEntry> {
        TAXONOMY
            .iter()
            .filter_map(|&(path, description)| match path.parse::<FolderPath>() {
                Ok(path) => Some(TaxonomyEntry { path, description }),
                Err(e) => {
                    tracing::error!(path = %path, error = %e, "invalid taxonomy entry");
                    None
                }
            })
            .collect()
    }

    /// Bucket entries by depth, shallowest level first
    #[must_use]
    pub fn group_by_depth(entries: &[TaxonomyEntry]) -> BTreeMap<usize, Vec<FolderPath>> {
        let mut levels: BTreeMap<usize, Vec<FolderPath>> = BTreeMap::new();
        for entry in entries {
            levels.entry(entry.depth()).or_default().push(entry.path.clone());
        }
        levels
    }

    /// Render the manifest text describing the workspace tree
    #[must_use]
    pub fn render_manifest(identity: &ProjectWorkspaceIdentity, entries: &[TaxonomyEntry]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Projeto: {}", identity.folder_name());
        let _ = writeln!(out, "Número: {}", identity.number());
        let _ = writeln!(out, "Cliente: {}", identity.client_abbreviation());
        let _ = writeln!(out, "Gerado automaticamente na criação do projeto");
        let _ = writeln!(out);
        let _ = writeln!(out, "Estrutura de Pastas:");
        let _ = writeln!(out, "====================");

        for top in entries.iter().filter(|e| e.path.len() == 1) {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}/ - {}", top.path, top.description);
            render_children(&mut out, entries, &top.path, "");
        }
        out
    }
}

fn render_children(out: &mut String, entries: &[TaxonomyEntry], parent: &FolderPath, indent: &str) {
    let children: Vec<&TaxonomyEntry> = entries
        .iter()
        .filter(|e| e.path.parent().as_ref() == Some(parent))
        .collect();

    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        let branch = if last { "└── " } else { "├── " };
        let name = child.path.last().unwrap_or_default();
        let _ = writeln!(out, "{indent}{branch}{name} - {}", child.description);

        let next_indent = format!("{indent}{}", if last { "    " } else { "│   " });
        render_children(out, entries, &child.path, &next_indent);
    }
}
