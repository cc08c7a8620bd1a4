//! Lifecycle stages and the business statuses that drive them

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Which top-level base directory holds a project's workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LifecycleStage {
    /// Quoted / prospected projects
    Prospected,
    /// Projects under execution
    Active,
    /// Completed projects
    Finished,
}

impl LifecycleStage {
    /// All stages, in probing order
    pub const ALL: [Self; 3] = [Self::Prospected, Self::Active, Self::Finished];

    /// Base directory name for this stage
    #[inline]
    #[must_use]
    pub const fn directory_name(self) -> &'static str {
        match self {
            Self::Prospected => "Projetos Prospectados",
            Self::Active => "Projetos Ativos",
            Self::Finished => "Projetos Finalizados",
        }
    }

    /// Whether the business rules allow deleting a workspace in this stage
    ///
    /// The engine itself never checks this; callers do.
    #[inline]
    #[must_use]
    pub const fn permits_deletion(self) -> bool {
        matches!(self, Self::Prospected)
    }
}

impl Display for LifecycleStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.directory_name())
    }
}

impl FromStr for LifecycleStage {
    type Err = ParseStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        match lowered.as_str() {
            "prospected" | "prospectados" | "projetos prospectados" => Ok(Self::Prospected),
            "active" | "ativos" | "projetos ativos" => Ok(Self::Active),
            "finished" | "finalizados" | "projetos finalizados" => Ok(Self::Finished),
            _ => Err(ParseStageError(s.to_string())),
        }
    }
}

/// Unknown stage name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lifecycle stage: {0:?}")]
pub struct ParseStageError(pub String);

/// Business status of a project as tracked by the ERP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectStatus {
    /// Preparing a quote
    #[serde(rename = "Orçando")]
    Quoting,
    /// Quote sent to the client
    #[serde(rename = "Orçamento Enviado")]
    QuoteSent,
    /// Client declined
    #[serde(rename = "Declinado")]
    Declined,
    /// Under execution
    #[serde(rename = "Em Execução")]
    InExecution,
    /// Waiting for the purchase order
    #[serde(rename = "Aguardando pedido de compra")]
    AwaitingPurchaseOrder,
    /// Feasibility test running
    #[serde(rename = "Teste de Viabilidade")]
    FeasibilityTest,
    /// Finished
    #[serde(rename = "Concluído")]
    Completed,
}

impl ProjectStatus {
    /// Every status, in ERP order
    pub const ALL: [Self; 7] = [
        Self::Quoting,
        Self::QuoteSent,
        Self::Declined,
        Self::InExecution,
        Self::AwaitingPurchaseOrder,
        Self::FeasibilityTest,
        Self::Completed,
    ];

    /// Stage directory a project with this status belongs in
    #[must_use]
    pub const fn stage(self) -> LifecycleStage {
        match self {
            Self::InExecution => LifecycleStage::Active,
            Self::Completed => LifecycleStage::Finished,
            Self::Quoting
            | Self::QuoteSent
            | Self::Declined
            | Self::AwaitingPurchaseOrder
            | Self::FeasibilityTest => LifecycleStage::Prospected,
        }
    }

    /// Label used by the ERP
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Quoting => "Orçando",
            Self::QuoteSent => "Orçamento Enviado",
            Self::Declined => "Declinado",
            Self::InExecution => "Em Execução",
            Self::AwaitingPurchaseOrder => "Aguardando pedido de compra",
            Self::FeasibilityTest => "Teste de Viabilidade",
            Self::Completed => "Concluído",
        }
    }
}

impl Display for ProjectStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unknown ERP status label
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown project status: {0:?}")]
pub struct ParseStatusError(pub String);

impl FromStr for ProjectStatus {
    type Err = ParseStatusError;

    /// Parse an ERP label, ignoring case and surrounding whitespace
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.label().to_lowercase() == wanted)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}
