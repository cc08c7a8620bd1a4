//! OAuth bearer tokens for the cloud backend
//!
//! [`TokenAuthenticator`] caches one [`AccessToken`] shared by every request
//! of a backend instance. Refresh is single-flight: concurrent callers that
//! find the token missing or expired queue on the same lock and only the
//! first one hits the identity provider.

use crate::error::{AuthError, StorageError};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Scope requested for Microsoft Graph application permissions
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Bearer token and its expiry
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Create token expiring at an absolute time
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Create token valid for `lifetime_secs` from now
    #[must_use]
    pub fn valid_for(value: impl Into<String>, lifetime_secs: i64) -> Self {
        Self::new(value, Utc::now() + Duration::seconds(lifetime_secs))
    }

    /// Raw bearer value
    #[inline]
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Expiry instant
    #[inline]
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the token is expired, or will be within `skew`
    #[inline]
    #[must_use]
    pub fn is_expired(&self, skew: Duration) -> bool {
        Utc::now() + skew >= self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Something that can mint a fresh access token
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    /// Acquire a new token from the identity provider
    async fn fetch_token(&self) -> Result<AccessToken, AuthError>;
}

/// OAuth2 client-credentials flow against an Azure AD style token endpoint
pub struct ClientCredentialsSource {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
}

impl ClientCredentialsSource {
    /// Create source for `{authority_base}/{tenant_id}/oauth2/v2.0/token`
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        authority_base: &str,
        tenant_id: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: format!(
                "{}/{}/oauth2/v2.0/token",
                authority_base.trim_end_matches('/'),
                tenant_id
            ),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: GRAPH_DEFAULT_SCOPE.to_string(),
        }
    }

    /// Token endpoint URL
    #[inline]
    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

impl fmt::Debug for ClientCredentialsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentialsSource")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize, Default)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

#[async_trait::async_trait]
impl TokenSource for ClientCredentialsSource {
    async fn fetch_token(&self) -> Result<AccessToken, AuthError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];
        let response = self.http.post(&self.token_url).form(&params).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body: TokenErrorResponse = response.json().await.unwrap_or_default();
            let description = if body.error_description.is_empty() {
                body.error
            } else {
                body.error_description
            };
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                description,
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        if body.access_token.is_empty() {
            return Err(AuthError::MalformedResponse("empty access_token".into()));
        }
        Ok(AccessToken::valid_for(body.access_token, body.expires_in))
    }
}

/// Shared, lazily refreshed bearer token
pub struct TokenAuthenticator {
    source: Arc<dyn TokenSource>,
    cached: Mutex<Option<AccessToken>>,
    skew: Duration,
    refreshes: AtomicU64,
}

impl TokenAuthenticator {
    /// Default margin before expiry at which a token is treated as expired
    pub const DEFAULT_SKEW_SECS: i64 = 60;

    /// Create authenticator over a token source
    #[must_use]
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
            skew: Duration::seconds(Self::DEFAULT_SKEW_SECS),
            refreshes: AtomicU64::new(0),
        }
    }

    /// With custom expiry margin
    #[must_use]
    pub fn with_skew(mut self, skew: Duration) -> Self {
        self.skew = skew;
        self
    }

    /// Current token, refreshing it if absent or expired
    ///
    /// # Errors
    /// Returns [`AuthError`] if a refresh was needed and failed.
    pub async fn get_token(&self) -> Result<AccessToken, AuthError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.is_expired(self.skew) {
                return Ok(token.clone());
            }
            tracing::debug!(expires_at = %token.expires_at(), "access token expired");
        }

        let token = self.source.fetch_token().await.map_err(|e| {
            tracing::error!(error = %e, "failed to acquire access token");
            e
        })?;
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        tracing::info!(expires_at = %token.expires_at(), "access token acquired");
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token if it is still `stale`
    ///
    /// A token refreshed meanwhile by another caller is kept.
    pub async fn invalidate(&self, stale: &AccessToken) {
        let mut cached = self.cached.lock().await;
        if cached.as_ref().is_some_and(|t| t.value() == stale.value()) {
            *cached = None;
        }
    }

    /// Number of tokens fetched from the source so far
    #[inline]
    #[must_use]
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("skew", &self.skew)
            .field("refreshes", &self.refresh_count())
            .finish_non_exhaustive()
    }
}

/// Run an authenticated request, retrying once after a 401
///
/// `op` receives the token to send. If it fails with
/// [`StorageError::Unauthorized`], the token is invalidated, a fresh one is
/// obtained and `op` runs exactly one more time; its result is final.
///
/// # Errors
/// Token acquisition failures and the final `op` failure.
pub async fn with_auth_retry<T, F, Fut>(auth: &TokenAuthenticator, mut op: F) -> Result<T, StorageError>
where
    F: FnMut(AccessToken) -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let token = auth.get_token().await?;
    match op(token.clone()).await {
        Err(StorageError::Unauthorized { path }) => {
            tracing::warn!(path = %path, "request unauthorized, refreshing token and retrying once");
            auth.invalidate(&token).await;
            let fresh = auth.get_token().await?;
            op(fresh).await
        }
        other => other,
    }
}
