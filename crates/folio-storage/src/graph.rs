//! Microsoft Graph drive backend
//!
//! Addresses items by path below a user's drive root:
//! `{base}/users/{user}/drive/root:/{root_folder}/{path}:/{action}`.
//! Every request carries a bearer token from the shared
//! [`TokenAuthenticator`] and is retried once after a 401.

use crate::auth::{with_auth_retry, TokenAuthenticator};
use crate::backend::{create_folder_chain, DeleteOutcome, FolderOutcome, StorageBackend};
use crate::error::StorageError;
use folio_model::FolderPath;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde_json::json;
use std::sync::Arc;

/// Default Graph API endpoint
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Where the backend writes inside the drive
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// API base URL, e.g. [`DEFAULT_GRAPH_BASE_URL`]
    pub base_url: String,
    /// User principal name or id owning the drive
    pub user: String,
    /// Folder below the drive root that acts as this backend's root
    pub root_folder: FolderPath,
}

impl GraphConfig {
    /// Config for `user`'s drive with the default endpoint
    #[must_use]
    pub fn new(user: impl Into<String>, root_folder: FolderPath) -> Self {
        Self {
            base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            user: user.into(),
            root_folder,
        }
    }
}

/// Backend speaking the Graph drive REST API
pub struct GraphBackend {
    http: reqwest::Client,
    auth: Arc<TokenAuthenticator>,
    base_url: Url,
    user: String,
    root_folder: FolderPath,
}

impl GraphBackend {
    /// Create backend
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidPath`] if the base URL cannot be parsed.
    pub fn new(
        config: GraphConfig,
        auth: Arc<TokenAuthenticator>,
        http: reqwest::Client,
    ) -> Result<Self, StorageError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| StorageError::InvalidPath {
            path: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(StorageError::InvalidPath {
                path: config.base_url,
                reason: "not a base URL".into(),
            });
        }
        Ok(Self {
            http,
            auth,
            base_url,
            user: config.user,
            root_folder: config.root_folder,
        })
    }

    /// Drive path of a backend path (root folder prepended)
    fn full_path(&self, path: &FolderPath) -> FolderPath {
        self.root_folder.join(path)
    }

    /// URL of a drive item addressed by its full path, with optional action suffix
    fn item_url(&self, full: &FolderPath, action: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["users", self.user.as_str(), "drive"]);

            match full.segments().split_last() {
                None => {
                    segments.push("root");
                }
                Some((last, init)) => {
                    segments.push("root:");
                    segments.extend(init.iter().map(String::as_str));
                    if action.is_some() {
                        segments.push(&format!("{last}:"));
                    } else {
                        segments.push(last);
                    }
                }
            }
            if let Some(action) = action {
                segments.push(action);
            }
        }
        url
    }

    /// `parentReference.path` value for a full drive path
    fn parent_reference(full: &FolderPath) -> String {
        if full.is_empty() {
            "/drive/root".to_string()
        } else {
            format!("/drive/root:/{full}")
        }
    }

    /// Send an authenticated request, mapping 401 for the retry wrapper
    async fn send<B>(&self, path: &FolderPath, build: B) -> Result<Response, StorageError>
    where
        B: Fn(&reqwest::Client) -> RequestBuilder,
    {
        with_auth_retry(&self.auth, |token| {
            let request = build(&self.http).bearer_auth(token.value());
            async move {
                let response = request.send().await?;
                if response.status() == StatusCode::UNAUTHORIZED {
                    return Err(StorageError::Unauthorized { path: path.clone() });
                }
                Ok(response)
            }
        })
        .await
    }

    async fn unexpected(path: &FolderPath, response: Response) -> StorageError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        StorageError::Http {
            status,
            path: path.clone(),
            body,
        }
    }
}

impl std::fmt::Debug for GraphBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBackend")
            .field("base_url", &self.base_url.as_str())
            .field("user", &self.user)
            .field("root_folder", &self.root_folder)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl StorageBackend for GraphBackend {
    fn describe(&self) -> String {
        format!("graph:{}/{}", self.user, self.root_folder)
    }

    async fn create_folder(&self, path: &FolderPath) -> Result<FolderOutcome, StorageError> {
        let full = self.full_path(path);
        let Some(name) = full.last().map(str::to_string) else {
            return Ok(FolderOutcome::AlreadyExisted);
        };
        let parent = full.parent().unwrap_or_default();
        let url = self.item_url(&parent, Some("children"));
        let body = json!({
            "name": name,
            "folder": {},
            "@microsoft.graph.conflictBehavior": "fail",
        });

        let response = self.send(path, |http| http.post(url.clone()).json(&body)).await?;
        match response.status() {
            status if status.is_success() => {
                tracing::debug!(path = %full, "folder created");
                Ok(FolderOutcome::Created)
            }
            StatusCode::CONFLICT => {
                tracing::debug!(path = %full, "folder already exists");
                Ok(FolderOutcome::AlreadyExisted)
            }
            _ => Err(Self::unexpected(path, response).await),
        }
    }

    async fn upload_file(&self, path: &FolderPath, contents: Vec<u8>) -> Result<(), StorageError> {
        let full = self.full_path(path);
        let url = self.item_url(&full, Some("content"));
        let response = self
            .send(path, |http| {
                http.put(url.clone())
                    .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                    .body(contents.clone())
            })
            .await?;
        if response.status().is_success() {
            tracing::debug!(path = %full, "file uploaded");
            Ok(())
        } else {
            Err(Self::unexpected(path, response).await)
        }
    }

    async fn move_folder(&self, source: &FolderPath, destination: &FolderPath) -> Result<(), StorageError> {
        let Some(dest_name) = destination.last().map(str::to_string) else {
            return Err(StorageError::InvalidPath {
                path: destination.to_string(),
                reason: "destination cannot be the backend root".into(),
            });
        };
        let dest_parent = destination.parent().unwrap_or_default();
        create_folder_chain(self, &dest_parent).await?;

        let url = self.item_url(&self.full_path(source), None);
        let body = json!({
            "parentReference": { "path": Self::parent_reference(&self.full_path(&dest_parent)) },
            "name": dest_name,
        });

        let response = self.send(source, |http| http.patch(url.clone()).json(&body)).await?;
        match response.status() {
            status if status.is_success() => {
                tracing::debug!(from = %source, to = %destination, "folder moved");
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(source.clone())),
            StatusCode::CONFLICT => Err(StorageError::AlreadyExists(destination.clone())),
            _ => Err(Self::unexpected(source, response).await),
        }
    }

    async fn delete_folder(&self, path: &FolderPath) -> Result<DeleteOutcome, StorageError> {
        let url = self.item_url(&self.full_path(path), None);
        let response = self.send(path, |http| http.delete(url.clone())).await?;
        match response.status() {
            status if status.is_success() => Ok(DeleteOutcome::Deleted),
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
            _ => Err(Self::unexpected(path, response).await),
        }
    }

    async fn folder_exists(&self, path: &FolderPath) -> Result<bool, StorageError> {
        let url = self.item_url(&self.full_path(path), None);
        let response = self.send(path, |http| http.get(url.clone())).await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::unexpected(path, response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AccessToken, MockTokenSource};
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    /// One request as received by the stub server
    #[derive(Debug)]
    struct Received {
        request_line: String,
        authorization: Option<String>,
        body: String,
    }

    impl Received {
        fn json(&self) -> serde_json::Value {
            serde_json::from_str(&self.body).unwrap()
        }
    }

    /// Answer each connection with the next canned `(status, body)` and
    /// hand back what was received
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, tokio::task::JoinHandle<Vec<Received>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1.0", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut received = Vec::new();
            for (status, body) in responses {
                let (stream, _) = listener.accept().await.unwrap();
                let mut reader = BufReader::new(stream);

                let mut request_line = String::new();
                reader.read_line(&mut request_line).await.unwrap();
                let mut authorization = None;
                let mut content_length = 0;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).await.unwrap();
                    let line = line.trim_end();
                    if line.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        if name.eq_ignore_ascii_case("authorization") {
                            authorization = Some(value.trim().to_string());
                        } else if name.eq_ignore_ascii_case("content-length") {
                            content_length = value.trim().parse().unwrap();
                        }
                    }
                }
                let mut payload = vec![0; content_length];
                reader.read_exact(&mut payload).await.unwrap();

                let response = format!(
                    "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let stream = reader.get_mut();
                stream.write_all(response.as_bytes()).await.unwrap();
                let _ = stream.shutdown().await;

                received.push(Received {
                    request_line: request_line.trim_end().to_string(),
                    authorization,
                    body: String::from_utf8(payload).unwrap(),
                });
            }
            received
        });
        (base_url, handle)
    }

    /// Authenticator handing out `token-1`, `token-2`, ...
    fn numbered_tokens() -> Arc<TokenAuthenticator> {
        let mut source = MockTokenSource::new();
        let mut issued = 0;
        source.expect_fetch_token().returning(move || {
            issued += 1;
            Ok(AccessToken::valid_for(format!("token-{issued}"), 3600))
        });
        Arc::new(TokenAuthenticator::new(Arc::new(source)))
    }

    fn stub_backend(base_url: &str, root: &str, auth: Arc<TokenAuthenticator>) -> GraphBackend {
        let config = GraphConfig {
            base_url: base_url.to_string(),
            user: "ops@example.com".to_string(),
            root_folder: p(root),
        };
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        GraphBackend::new(config, auth, http).unwrap()
    }

    fn p(s: &str) -> FolderPath {
        s.parse().unwrap()
    }

    fn backend(base_url: &str, root: &str) -> GraphBackend {
        let auth = Arc::new(TokenAuthenticator::new(Arc::new(MockTokenSource::new())));
        let config = GraphConfig {
            base_url: base_url.to_string(),
            user: "ops@example.com".to_string(),
            root_folder: p(root),
        };
        GraphBackend::new(config, auth, reqwest::Client::new()).unwrap()
    }

    #[test]
    fn children_url_for_nested_folder() {
        let b = backend(DEFAULT_GRAPH_BASE_URL, "Projetos");
        let url = b.item_url(&b.full_path(&p("Projetos Ativos/2026")), Some("children"));
        assert_eq!(
            url.as_str(),
            "https://graph.microsoft.com/v1.0/users/ops@example.com/drive/root:/Projetos/Projetos%20Ativos/2026:/children"
        );
    }

    #[test]
    fn children_url_for_drive_root() {
        let b = backend("https://graph.microsoft.com/v1.0/", "");
        let url = b.item_url(&FolderPath::root(), Some("children"));
        assert_eq!(
            url.as_str(),
            "https://graph.microsoft.com/v1.0/users/ops@example.com/drive/root/children"
        );
    }

    #[test]
    fn item_url_without_action_has_no_trailing_colon() {
        let b = backend(DEFAULT_GRAPH_BASE_URL, "");
        let url = b.item_url(&p("Projetos Finalizados/2025"), None);
        assert_eq!(
            url.as_str(),
            "https://graph.microsoft.com/v1.0/users/ops@example.com/drive/root:/Projetos%20Finalizados/2025"
        );
    }

    #[test]
    fn url_escapes_reserved_characters() {
        let b = backend(DEFAULT_GRAPH_BASE_URL, "");
        let url = b.item_url(&p("a#b/c?d"), Some("content"));
        assert!(url.as_str().ends_with("/root:/a%23b/c%3Fd:/content"));
    }

    #[test]
    fn parent_reference_paths() {
        assert_eq!(GraphBackend::parent_reference(&FolderPath::root()), "/drive/root");
        assert_eq!(
            GraphBackend::parent_reference(&p("Projetos/Projetos Ativos/2026")),
            "/drive/root:/Projetos/Projetos Ativos/2026"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let auth = Arc::new(TokenAuthenticator::new(Arc::new(MockTokenSource::new())));
        let config = GraphConfig {
            base_url: "not a url".into(),
            user: "u".into(),
            root_folder: FolderPath::root(),
        };
        let result = GraphBackend::new(config, auth, reqwest::Client::new());
        assert!(matches!(result, Err(StorageError::InvalidPath { .. })));
    }

    #[test]
    fn describe_names_user_and_root() {
        let b = backend(DEFAULT_GRAPH_BASE_URL, "Projetos");
        assert_eq!(b.describe(), "graph:ops@example.com/Projetos");
    }

    #[tokio::test]
    async fn create_asks_to_fail_on_conflict() {
        let (base_url, server) = serve(vec![(201, r#"{"id":"1"}"#)]).await;
        let b = stub_backend(&base_url, "Projetos", numbered_tokens());

        let outcome = b.create_folder(&p("Projetos Ativos")).await.unwrap();

        assert_eq!(outcome, FolderOutcome::Created);
        let received = server.await.unwrap();
        assert!(received[0].request_line.starts_with("POST "));
        assert!(received[0].request_line.contains("/drive/root:/Projetos:/children"));
        assert_eq!(received[0].authorization.as_deref(), Some("Bearer token-1"));
        let body = received[0].json();
        assert_eq!(body["name"], "Projetos Ativos");
        assert_eq!(body["@microsoft.graph.conflictBehavior"], "fail");
    }

    #[tokio::test]
    async fn conflict_means_folder_already_existed() {
        let (base_url, server) = serve(vec![(409, r#"{"error":{"code":"nameAlreadyExists"}}"#)]).await;
        let b = stub_backend(&base_url, "", numbered_tokens());

        let outcome = b.create_folder(&p("Projetos Ativos/2026")).await.unwrap();

        assert_eq!(outcome, FolderOutcome::AlreadyExisted);
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unexpected_status_is_an_http_error() {
        let (base_url, _server) = serve(vec![(500, "boom")]).await;
        let b = stub_backend(&base_url, "", numbered_tokens());

        let err = b.create_folder(&p("Projetos Ativos")).await.unwrap_err();

        assert!(matches!(err, StorageError::Http { status: 500, ref body, .. } if body == "boom"));
    }

    #[tokio::test]
    async fn delete_of_missing_item_is_not_found() {
        let (base_url, server) = serve(vec![(404, r#"{"error":{"code":"itemNotFound"}}"#)]).await;
        let b = stub_backend(&base_url, "", numbered_tokens());

        let outcome = b.delete_folder(&p("Projetos Prospectados/2026/X")).await.unwrap();

        assert_eq!(outcome, DeleteOutcome::NotFound);
        assert!(server.await.unwrap()[0].request_line.starts_with("DELETE "));
    }

    #[tokio::test]
    async fn folder_exists_follows_status() {
        let (base_url, _server) = serve(vec![(200, r#"{"id":"1"}"#), (404, "")]).await;
        let b = stub_backend(&base_url, "", numbered_tokens());

        assert!(b.folder_exists(&p("Projetos Ativos")).await.unwrap());
        assert!(!b.folder_exists(&p("Projetos Finalizados")).await.unwrap());
    }

    #[tokio::test]
    async fn unauthorized_request_is_retried_with_one_refresh() {
        let (base_url, server) = serve(vec![(401, ""), (201, r#"{"id":"1"}"#)]).await;
        let auth = numbered_tokens();
        let b = stub_backend(&base_url, "", auth.clone());

        let outcome = b.create_folder(&p("Projetos Ativos")).await.unwrap();

        assert_eq!(outcome, FolderOutcome::Created);
        assert_eq!(auth.refresh_count(), 2);
        let received = server.await.unwrap();
        assert_eq!(received[0].authorization.as_deref(), Some("Bearer token-1"));
        assert_eq!(received[1].authorization.as_deref(), Some("Bearer token-2"));
    }

    #[tokio::test]
    async fn second_unauthorized_is_an_auth_failure() {
        let (base_url, _server) = serve(vec![(401, ""), (401, "")]).await;
        let auth = numbered_tokens();
        let b = stub_backend(&base_url, "", auth.clone());

        let err = b.create_folder(&p("Projetos Ativos")).await.unwrap_err();

        assert!(err.is_auth_failure());
        assert_eq!(auth.refresh_count(), 2);
    }

    #[tokio::test]
    async fn move_creates_parents_then_patches_parent_reference() {
        let (base_url, server) = serve(vec![(409, ""), (201, r#"{"id":"2"}"#), (200, r#"{"id":"3"}"#)]).await;
        let b = stub_backend(&base_url, "", numbered_tokens());

        b.move_folder(&p("Projetos Prospectados/2026/X"), &p("Projetos Ativos/2026/X"))
            .await
            .unwrap();

        let received = server.await.unwrap();
        assert_eq!(received[0].json()["name"], "Projetos Ativos");
        assert_eq!(received[1].json()["name"], "2026");
        assert!(received[2].request_line.starts_with("PATCH "));
        assert!(received[2]
            .request_line
            .contains("/drive/root:/Projetos%20Prospectados/2026/X "));
        let body = received[2].json();
        assert_eq!(body["parentReference"]["path"], "/drive/root:/Projetos Ativos/2026");
        assert_eq!(body["name"], "X");
    }
}
