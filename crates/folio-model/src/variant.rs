//! Template variants selecting the starter documents of a workspace

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Which set of starter documents is seeded into a new workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TemplateVariant {
    /// Full commercial proposal
    #[default]
    Full,
    /// Simplified proposal
    Simplified,
    /// Technical visit report plus a simplified proposal
    Visit,
}

impl TemplateVariant {
    /// Parse a variant name, falling back to [`TemplateVariant::Full`]
    ///
    /// Unknown names are accepted so that a bad value coming from the
    /// business layer still yields a provisioned workspace with the default
    /// document set.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            tracing::warn!(variant = %s, "unknown template variant, using the default document set");
            Self::default()
        })
    }
}

impl Display for TemplateVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Full => "Full",
            Self::Simplified => "Simplified",
            Self::Visit => "Visit",
        };
        f.write_str(s)
    }
}

impl FromStr for TemplateVariant {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" | "completa" => Ok(Self::Full),
            "simplified" | "simplificada" => Ok(Self::Simplified),
            "visit" | "visita" => Ok(Self::Visit),
            _ => Err(ParseVariantError(s.to_string())),
        }
    }
}

/// Unknown variant name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown template variant: {0:?}")]
pub struct ParseVariantError(pub String);
