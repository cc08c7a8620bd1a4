//! Project workspace identity
//!
//! A project is identified by its number (`PREFIX + YY + MM + sequence`, e.g.
//! `TC2602001`), a human name and the client's abbreviation. The workspace
//! year is derived from the number, never stored.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Maximum length of a client abbreviation
pub const MAX_ABBREVIATION_LEN: usize = 3;

/// Identity of one project workspace
///
/// `number` is globally unique and must not change once a workspace exists
/// for it; every location the engine computes is derived from these fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawIdentity")]
pub struct ProjectWorkspaceIdentity {
    number: String,
    name: String,
    client_abbreviation: String,
}

#[derive(Deserialize)]
struct RawIdentity {
    number: String,
    name: String,
    client_abbreviation: String,
}

impl TryFrom<RawIdentity> for ProjectWorkspaceIdentity {
    type Error = IdentityError;

    fn try_from(raw: RawIdentity) -> Result<Self, Self::Error> {
        Self::new(raw.number, raw.name, raw.client_abbreviation)
    }
}

impl ProjectWorkspaceIdentity {
    /// Create a validated identity
    ///
    /// Surrounding whitespace is trimmed from every field.
    ///
    /// # Errors
    /// - `IdentityError::InvalidNumber` if characters 3-4 of the number are not digits
    /// - `IdentityError::InvalidAbbreviation` if the abbreviation is empty or too long
    /// - `IdentityError::EmptyName` if the name is blank
    /// - `IdentityError::PathSeparator` if any field contains `/` or `\`
    pub fn new(
        number: impl Into<String>,
        name: impl Into<String>,
        client_abbreviation: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let number = number.into().trim().to_string();
        let name = name.into().trim().to_string();
        let client_abbreviation = client_abbreviation.into().trim().to_string();

        for (field, value) in [
            ("number", &number),
            ("name", &name),
            ("client_abbreviation", &client_abbreviation),
        ] {
            if value.contains(['/', '\\']) {
                return Err(IdentityError::PathSeparator {
                    field,
                    value: value.clone(),
                });
            }
        }

        let year_digits: Vec<char> = number.chars().skip(2).take(2).collect();
        if year_digits.len() != 2 || !year_digits.iter().all(char::is_ascii_digit) {
            return Err(IdentityError::InvalidNumber(number));
        }

        let abbrev_len = client_abbreviation.chars().count();
        if abbrev_len == 0 || abbrev_len > MAX_ABBREVIATION_LEN {
            return Err(IdentityError::InvalidAbbreviation(client_abbreviation));
        }

        if name.is_empty() {
            return Err(IdentityError::EmptyName);
        }

        Ok(Self {
            number,
            name,
            client_abbreviation,
        })
    }

    /// Project number
    #[inline]
    #[must_use]
    pub fn number(&self) -> &str {
        &self.number
    }

    /// Project name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Client abbreviation
    #[inline]
    #[must_use]
    pub fn client_abbreviation(&self) -> &str {
        &self.client_abbreviation
    }

    /// Four-digit year encoded in the project number
    ///
    /// `TC2602001` → `2026`.
    #[must_use]
    pub fn year(&self) -> String {
        let yy: String = self.number.chars().skip(2).take(2).collect();
        format!("20{yy}")
    }

    /// Name of the workspace root folder: `NUMBER - ABBREV - NAME`
    #[must_use]
    pub fn folder_name(&self) -> String {
        format!("{} - {} - {}", self.number, self.client_abbreviation, self.name)
    }
}

impl Display for ProjectWorkspaceIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.folder_name())
    }
}

/// Identity validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// Number does not carry a two-digit year at positions 3-4
    #[error("invalid project number '{0}': expected PREFIX + YY + MM + sequence")]
    InvalidNumber(String),

    /// Abbreviation empty or longer than three characters
    #[error("invalid client abbreviation '{0}': expected 1 to 3 characters")]
    InvalidAbbreviation(String),

    /// Blank name
    #[error("project name must not be empty")]
    EmptyName,

    /// A field would escape its folder segment
    #[error("{field} contains a path separator: {value:?}")]
    PathSeparator { field: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_is_derived_from_number() {
        let id = ProjectWorkspaceIdentity::new("TC2602001", "Projeto Teste", "EMP").unwrap();
        assert_eq!(id.year(), "2026");

        let id = ProjectWorkspaceIdentity::new("TC2502999", "Outro", "AB").unwrap();
        assert_eq!(id.year(), "2025");
    }

    #[test]
    fn folder_name_format() {
        let id = ProjectWorkspaceIdentity::new("TC2602001", "Projeto Teste", "EMP").unwrap();
        assert_eq!(id.folder_name(), "TC2602001 - EMP - Projeto Teste");
        assert_eq!(id.to_string(), id.folder_name());
    }

    #[test]
    fn fields_are_trimmed() {
        let id = ProjectWorkspaceIdentity::new(" TC2602001 ", " Nome ", " EM ").unwrap();
        assert_eq!(id.number(), "TC2602001");
        assert_eq!(id.name(), "Nome");
        assert_eq!(id.client_abbreviation(), "EM");
    }

    #[test]
    fn rejects_bad_number() {
        assert!(matches!(
            ProjectWorkspaceIdentity::new("TCXX02001", "n", "E"),
            Err(IdentityError::InvalidNumber(_))
        ));
        assert!(matches!(
            ProjectWorkspaceIdentity::new("TC2", "n", "E"),
            Err(IdentityError::InvalidNumber(_))
        ));
    }

    #[test]
    fn rejects_long_abbreviation() {
        assert!(matches!(
            ProjectWorkspaceIdentity::new("TC2602001", "n", "EMPR"),
            Err(IdentityError::InvalidAbbreviation(_))
        ));
        assert!(matches!(
            ProjectWorkspaceIdentity::new("TC2602001", "n", ""),
            Err(IdentityError::InvalidAbbreviation(_))
        ));
    }

    #[test]
    fn rejects_separators_and_blank_name() {
        assert!(matches!(
            ProjectWorkspaceIdentity::new("TC2602001", "a/b", "EMP"),
            Err(IdentityError::PathSeparator { field: "name", .. })
        ));
        assert!(matches!(
            ProjectWorkspaceIdentity::new("TC2602001", "   ", "EMP"),
            Err(IdentityError::EmptyName)
        ));
    }
}
