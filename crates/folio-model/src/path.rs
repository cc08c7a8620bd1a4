//! Folder paths for addressing inside a storage backend
//!
//! Provides [`FolderPath`], an ordered list of path segments that every
//! backend translates into its own addressing scheme (filesystem path, Graph
//! drive path).

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Path of a folder or file, relative to a backend root
///
/// Segments are kept verbatim (spaces and non-ASCII letters are fine); only
/// separators, control characters and the `.`/`..` segments are rejected.
///
/// # Examples
/// - `["01-PROPOSTA", "1.1-INFO_CLIENTE"]` → `01-PROPOSTA/1.1-INFO_CLIENTE`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FolderPath(Vec<String>);

impl FolderPath {
    /// Create path from already validated segments
    ///
    /// # Errors
    /// Returns [`PathError`] if any segment is empty or invalid.
    pub fn new<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments = segments
            .into_iter()
            .map(|s| {
                let s = s.into();
                validate_segment(&s)?;
                Ok(s)
            })
            .collect::<Result<Vec<_>, PathError>>()?;
        Ok(Self(segments))
    }

    /// Empty path (backend root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Depth relative to the path's own first segment (`segments - 1`)
    ///
    /// Top-level folders have depth 0. The root path also reports 0.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Get last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Append a segment, returning new path
    ///
    /// # Errors
    /// Returns [`PathError`] if the segment is invalid.
    pub fn child(&self, segment: impl Into<String>) -> Result<Self, PathError> {
        let segment = segment.into();
        validate_segment(&segment)?;
        let mut new = self.clone();
        new.0.push(segment);
        Ok(new)
    }

    /// Concatenate another path below this one
    #[inline]
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut new = self.clone();
        new.0.extend(other.0.iter().cloned());
        new
    }

    /// Every non-empty prefix of this path, shortest first
    ///
    /// `a/b/c` yields `a`, `a/b`, `a/b/c`.
    pub fn ancestors_inclusive(&self) -> impl Iterator<Item = Self> + '_ {
        (1..=self.0.len()).map(move |n| Self(self.0[..n].to_vec()))
    }

    /// Check if this path is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Get relative path from ancestor
    ///
    /// # Errors
    /// Returns error if `self` is not a descendant of `ancestor`
    pub fn relative_to(&self, ancestor: &Self) -> Result<Self, PathError> {
        if !ancestor.is_prefix_of(self) {
            return Err(PathError::NotDescendant {
                path: self.to_string(),
                ancestor: ancestor.to_string(),
            });
        }
        Ok(Self(self.0[ancestor.0.len()..].to_vec()))
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

fn validate_segment(segment: &str) -> Result<(), PathError> {
    if segment.is_empty() {
        return Err(PathError::EmptySegment);
    }
    if segment == "." || segment == ".."
        || segment.contains(['/', '\\'])
        || segment.chars().any(char::is_control)
    {
        return Err(PathError::InvalidSegment(segment.to_string()));
    }
    Ok(())
}

impl Display for FolderPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl FromStr for FolderPath {
    type Err = PathError;

    /// Parse `/`- or `\`-separated text; leading and trailing separators are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_matches(|c| c == '/' || c == '\\');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        Self::new(trimmed.split(|c| c == '/' || c == '\\'))
    }
}

impl TryFrom<String> for FolderPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FolderPath> for String {
    fn from(path: FolderPath) -> Self {
        path.to_string()
    }
}

impl Default for FolderPath {
    fn default() -> Self {
        Self::root()
    }
}

/// Errors related to folder paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Separator, control character or relative marker in a segment
    #[error("invalid path segment: {0:?}")]
    InvalidSegment(String),

    /// Not a descendant path
    #[error("path '{path}' is not a descendant of '{ancestor}'")]
    NotDescendant { path: String, ancestor: String },
}
