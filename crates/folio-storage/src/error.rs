//! Error types for storage backends
//!
//! Separates the failures that must abort an operation (authentication)
//! from the ones callers may record and continue past.

use folio_model::FolderPath;
use std::path::PathBuf;

/// Errors raised by a [`StorageBackend`](crate::StorageBackend)
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Backend rejected the bearer token (HTTP 401)
    #[error("unauthorized request for '{path}'")]
    Unauthorized { path: FolderPath },

    /// Token could not be acquired or refreshed
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),

    /// Source path does not exist
    #[error("not found: '{0}'")]
    NotFound(FolderPath),

    /// Destination already occupied
    #[error("already exists: '{0}'")]
    AlreadyExists(FolderPath),

    /// Unexpected HTTP response
    #[error("http {status} for '{path}': {body}")]
    Http {
        status: u16,
        path: FolderPath,
        body: String,
    },

    /// Filesystem error
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Network / protocol failure below HTTP
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Path cannot be expressed on this backend
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

impl StorageError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this failure comes from authentication and must abort the operation
    #[inline]
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::Authentication(_))
    }
}

/// Token acquisition errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Identity provider refused the credentials
    #[error("token endpoint returned {status}: {description}")]
    Rejected { status: u16, description: String },

    /// Response did not contain a usable token
    #[error("malformed token response: {0}")]
    MalformedResponse(String),

    /// Could not reach the identity provider
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_are_classified() {
        let unauthorized = StorageError::Unauthorized {
            path: FolderPath::root(),
        };
        assert!(unauthorized.is_auth_failure());

        let auth = StorageError::from(AuthError::MalformedResponse("no token".into()));
        assert!(auth.is_auth_failure());

        let not_found = StorageError::NotFound(FolderPath::root());
        assert!(!not_found.is_auth_failure());
    }

    #[test]
    fn error_display() {
        let err = StorageError::Http {
            status: 500,
            path: "a/b".parse().unwrap(),
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "http 500 for 'a/b': boom");
    }
}
