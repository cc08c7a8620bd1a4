//! Engine configuration
//!
//! Loaded from a TOML file, then overridden by `FOLIO_*` environment
//! variables. The configured backend is built explicitly and handed to the
//! provisioner; an incomplete configuration is an error, never a silently
//! disabled backend.

use crate::error::ConfigError;
use crate::provisioner::{WorkspaceProvisioner, DEFAULT_MAX_WORKERS};
use folio_model::FolderPath;
use folio_storage::{
    ClientCredentialsSource, GraphBackend, GraphConfig, LocalBackend, StorageBackend, TokenAuthenticator,
    DEFAULT_GRAPH_BASE_URL,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Default identity provider authority
pub const DEFAULT_AUTHORITY_BASE_URL: &str = "https://login.microsoftonline.com";

/// Which backend the engine talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Cloud,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "cloud" | "graph" | "onedrive" => Ok(Self::Cloud),
            other => Err(ConfigError::Invalid {
                key: "storage.backend",
                reason: format!("unknown backend '{other}'"),
            }),
        }
    }
}

/// `[storage]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub backend: BackendKind,
    /// Concurrent folder creations per level
    pub max_workers: usize,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: BackendKind::Local,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

/// `[local]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSection {
    pub root: Option<PathBuf>,
}

/// `[cloud]` section
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudSection {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Drive owner
    pub user_email: Option<String>,
    /// Folder below the drive root holding the stage directories
    pub root_folder: String,
    pub graph_base_url: String,
    pub authority_base_url: String,
}

impl Default for CloudSection {
    fn default() -> Self {
        Self {
            tenant_id: None,
            client_id: None,
            client_secret: None,
            user_email: None,
            root_folder: String::new(),
            graph_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            authority_base_url: DEFAULT_AUTHORITY_BASE_URL.to_string(),
        }
    }
}

impl fmt::Debug for CloudSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudSection")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("user_email", &self.user_email)
            .field("root_folder", &self.root_folder)
            .field("graph_base_url", &self.graph_base_url)
            .field("authority_base_url", &self.authority_base_url)
            .finish()
    }
}

/// `[templates]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesSection {
    /// Template library directory; seeding is skipped when unset
    pub path: Option<PathBuf>,
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub storage: StorageSection,
    pub local: LocalSection,
    pub cloud: CloudSection,
    pub templates: TemplatesSection,
}

impl EngineConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] on malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Apply `FOLIO_*` variables from the process environment
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] for unparsable values.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any `key -> value` lookup
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] for unparsable values.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("FOLIO_BACKEND") {
            self.storage.backend = v.parse()?;
        }
        if let Some(v) = lookup("FOLIO_MAX_WORKERS") {
            self.storage.max_workers = v.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "storage.max_workers",
                reason: format!("{e}"),
            })?;
        }
        if let Some(v) = lookup("FOLIO_LOCAL_ROOT") {
            self.local.root = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("FOLIO_TEMPLATES_PATH") {
            self.templates.path = Some(PathBuf::from(v));
        }

        let cloud = &mut self.cloud;
        for (key, slot) in [
            ("FOLIO_TENANT_ID", &mut cloud.tenant_id),
            ("FOLIO_CLIENT_ID", &mut cloud.client_id),
            ("FOLIO_CLIENT_SECRET", &mut cloud.client_secret),
            ("FOLIO_USER_EMAIL", &mut cloud.user_email),
        ] {
            if let Some(v) = lookup(key) {
                *slot = Some(v);
            }
        }
        if let Some(v) = lookup("FOLIO_ROOT_FOLDER") {
            cloud.root_folder = v;
        }
        if let Some(v) = lookup("FOLIO_GRAPH_BASE_URL") {
            cloud.graph_base_url = v;
        }
        if let Some(v) = lookup("FOLIO_AUTHORITY_BASE_URL") {
            cloud.authority_base_url = v;
        }
        Ok(())
    }

    /// Build the configured storage backend
    ///
    /// # Errors
    /// [`ConfigError::Missing`] when a required value is absent,
    /// [`ConfigError::Invalid`] or [`ConfigError::Backend`] when unusable.
    pub fn build_backend(&self) -> Result<Arc<dyn StorageBackend>, ConfigError> {
        match self.storage.backend {
            BackendKind::Local => {
                let root = self.local.root.clone().ok_or(ConfigError::Missing("local.root"))?;
                tracing::info!(root = %root.display(), "using local storage backend");
                Ok(Arc::new(LocalBackend::new(root)))
            }
            BackendKind::Cloud => {
                let cloud = &self.cloud;
                let tenant_id = required(cloud.tenant_id.as_deref(), "cloud.tenant_id")?;
                let client_id = required(cloud.client_id.as_deref(), "cloud.client_id")?;
                let client_secret = required(cloud.client_secret.as_deref(), "cloud.client_secret")?;
                let user = required(cloud.user_email.as_deref(), "cloud.user_email")?;
                let root_folder: FolderPath = cloud.root_folder.parse().map_err(|e| ConfigError::Invalid {
                    key: "cloud.root_folder",
                    reason: format!("{e}"),
                })?;

                let http = reqwest::Client::new();
                let source = ClientCredentialsSource::new(
                    http.clone(),
                    &cloud.authority_base_url,
                    tenant_id,
                    client_id,
                    client_secret,
                );
                let auth = Arc::new(TokenAuthenticator::new(Arc::new(source)));
                let config = GraphConfig {
                    base_url: cloud.graph_base_url.clone(),
                    user: user.to_string(),
                    root_folder,
                };
                let backend = GraphBackend::new(config, auth, http)?;
                tracing::info!(backend = %backend.describe(), "using cloud storage backend");
                Ok(Arc::new(backend))
            }
        }
    }

    /// Build a provisioner over the configured backend
    ///
    /// # Errors
    /// Same as [`build_backend`](Self::build_backend), plus
    /// [`ConfigError::Invalid`] for a zero worker count.
    pub fn build_provisioner(&self) -> Result<WorkspaceProvisioner, ConfigError> {
        if self.storage.max_workers == 0 {
            return Err(ConfigError::Invalid {
                key: "storage.max_workers",
                reason: "must be at least 1".into(),
            });
        }
        Ok(WorkspaceProvisioner::new(self.build_backend()?)
            .with_max_workers(self.storage.max_workers)
            .with_template_library(self.templates.path.clone()))
    }
}

fn required<'a>(value: Option<&'a str>, key: &'static str) -> Result<&'a str, ConfigError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(key))
}
