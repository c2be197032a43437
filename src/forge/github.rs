//! forge::github
//!
//! GitHub implementation of the Git Data surface over the REST API.
//!
//! # Design
//!
//! Every call goes through one `send` helper, which attaches the
//! bearer token and API version headers, reads the whole body, and
//! classifies it as a [`ResponseBody`]. Non-success statuses become
//! [`RemoteError::NotFound`] (404) or [`RemoteError::Status`] carrying the
//! remote's `message` and the untouched body for operators.
//!
//! # Rate Limiting
//!
//! No automatic retry is performed. A 403/429 from rate limiting surfaces
//! as `RemoteError::Status` like any other failure.
//!
//! # Example
//!
//! ```ignore
//! use bundlepush::core::config::ClientConfig;
//! use bundlepush::core::types::OwnerKind;
//! use bundlepush::forge::{github::GitHubClient, GitData};
//!
//! let client = GitHubClient::new(ClientConfig::new("ghp_xxx", "octocat", OwnerKind::User));
//! let head = client.get_branch_head("hello-world", "main").await?;
//! ```

use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use async_trait::async_trait;

use super::traits::{
    CreateRepository, GitData, Lookup, RemoteCommit, RemoteError, RemoteRepository, ResponseBody,
};
use crate::core::config::ClientConfig;
use crate::core::types::{OwnerKind, TreeEntry};

/// GitHub REST client for the Git Data API.
pub struct GitHubClient {
    /// HTTP client for making requests
    client: Client,
    config: ClientConfig,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("config", &self.config)
            .finish()
    }
}

impl GitHubClient {
    /// Create a client from an explicit configuration.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, RemoteError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.config.token))
            .map_err(|_| RemoteError::Request("token contains invalid header characters".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.config.user_agent)
                .map_err(|_| RemoteError::Request("invalid user agent".into()))?,
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_str(&self.config.api_version)
                .map_err(|_| RemoteError::Request("invalid API version".into()))?,
        );
        Ok(headers)
    }

    /// Build a URL from path segments. Each segment is percent-encoded,
    /// so a branch like `feature/x` stays one segment (`feature%2Fx`).
    fn url(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&self.config.api_base)
            .map_err(|e| RemoteError::Request(format!("invalid API base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::Request("API base URL cannot have a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, repo: &str, rest: &[&str]) -> Result<Url, RemoteError> {
        let mut segments = vec!["repos", self.config.owner.as_str(), repo];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    /// Send a request and classify the response.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<ResponseBody, RemoteError> {
        tracing::debug!(%method, %url, "github request");

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .headers(self.headers()?);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = response.status();
        let required_permissions = response
            .headers()
            .get("X-Accepted-GitHub-Permissions")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let decoded = ResponseBody::decode(&text);

        if status.is_success() {
            return Ok(decoded);
        }

        let mut message = decoded
            .message()
            .map(str::to_string)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| "GitHub API error".to_string());

        tracing::debug!(%method, %url, status = status.as_u16(), %message, "github error");

        Err(match status {
            StatusCode::NOT_FOUND => RemoteError::NotFound {
                message,
                body: decoded,
            },
            _ => {
                if status == StatusCode::FORBIDDEN {
                    if let Some(perms) = required_permissions {
                        message.push_str(&format!(" [required: {}]", perms));
                    }
                }
                RemoteError::Status {
                    status: status.as_u16(),
                    message,
                    body: decoded,
                }
            }
        })
    }

    /// Send a request and decode a JSON response into `T`.
    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, RemoteError> {
        match self.send(method, url, body).await? {
            ResponseBody::Json(value) => serde_json::from_value(value)
                .map_err(|e| RemoteError::Decode(format!("failed to parse response: {}", e))),
            ResponseBody::Empty => Err(RemoteError::Decode("expected JSON, got empty body".into())),
            ResponseBody::Text(_) => Err(RemoteError::Decode("expected JSON, got text".into())),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RemoteError> {
        self.send_json::<(), T>(Method::GET, url, None).await
    }
}

#[async_trait]
impl GitData for GitHubClient {
    fn name(&self) -> &'static str {
        "github"
    }

    fn owner(&self) -> &str {
        &self.config.owner
    }

    async fn get_repository(&self, repo: &str) -> Result<Lookup<RemoteRepository>, RemoteError> {
        let url = self.repo_url(repo, &[])?;
        Lookup::from_fetch(self.get_json(url).await)
    }

    async fn create_repository(
        &self,
        owner_kind: OwnerKind,
        request: CreateRepository,
    ) -> Result<RemoteRepository, RemoteError> {
        let url = match owner_kind {
            OwnerKind::Org => self.url(&["orgs", self.config.owner.as_str(), "repos"])?,
            OwnerKind::User => self.url(&["user", "repos"])?,
        };
        self.send_json(Method::POST, url, Some(&request)).await
    }

    async fn set_visibility(&self, repo: &str, private: bool) -> Result<(), RemoteError> {
        let url = self.repo_url(repo, &[])?;
        self.send(Method::PATCH, url, Some(&VisibilityBody { private }))
            .await?;
        Ok(())
    }

    async fn get_branch_head(
        &self,
        repo: &str,
        branch: &str,
    ) -> Result<Lookup<String>, RemoteError> {
        let url = self.repo_url(repo, &["git", "ref", "heads", branch])?;
        let reference: Result<GitHubRef, _> = self.get_json(url).await;
        Lookup::from_fetch(reference.map(|r| r.object.sha))
    }

    async fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> Result<(), RemoteError> {
        let url = self.repo_url(repo, &["git", "refs"])?;
        let body = CreateRefBody {
            ref_name: format!("refs/heads/{}", branch),
            sha,
        };
        self.send(Method::POST, url, Some(&body)).await?;
        Ok(())
    }

    async fn get_commit(&self, repo: &str, sha: &str) -> Result<RemoteCommit, RemoteError> {
        let url = self.repo_url(repo, &["git", "commits", sha])?;
        let commit: GitHubCommit = self.get_json(url).await?;
        Ok(RemoteCommit {
            sha: commit.sha,
            tree_sha: commit.tree.sha,
        })
    }

    async fn create_blob(&self, repo: &str, content: &[u8]) -> Result<String, RemoteError> {
        let url = self.repo_url(repo, &["git", "blobs"])?;
        let body = CreateBlobBody {
            content: base64::engine::general_purpose::STANDARD.encode(content),
            encoding: "base64",
        };
        let created: GitHubSha = self.send_json(Method::POST, url, Some(&body)).await?;
        Ok(created.sha)
    }

    async fn create_tree(
        &self,
        repo: &str,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String, RemoteError> {
        let url = self.repo_url(repo, &["git", "trees"])?;
        let body = CreateTreeBody {
            base_tree,
            tree: entries,
        };
        let created: GitHubSha = self.send_json(Method::POST, url, Some(&body)).await?;
        Ok(created.sha)
    }

    async fn create_commit(
        &self,
        repo: &str,
        message: &str,
        tree: &str,
        parent: &str,
    ) -> Result<String, RemoteError> {
        let url = self.repo_url(repo, &["git", "commits"])?;
        let body = CreateCommitBody {
            message,
            tree,
            parents: [parent],
        };
        let created: GitHubSha = self.send_json(Method::POST, url, Some(&body)).await?;
        Ok(created.sha)
    }

    async fn update_ref(&self, repo: &str, branch: &str, sha: &str) -> Result<(), RemoteError> {
        let url = self.repo_url(repo, &["git", "refs", "heads", branch])?;
        let body = UpdateRefBody { sha, force: true };
        self.send(Method::PATCH, url, Some(&body)).await?;
        Ok(())
    }
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

/// Request body for a visibility change.
#[derive(Serialize)]
struct VisibilityBody {
    private: bool,
}

/// Request body for creating a ref.
#[derive(Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: &'a str,
}

/// Request body for creating a blob.
#[derive(Serialize)]
struct CreateBlobBody {
    content: String,
    encoding: &'static str,
}

/// Request body for creating a tree.
#[derive(Serialize)]
struct CreateTreeBody<'a> {
    base_tree: &'a str,
    tree: &'a [TreeEntry],
}

/// Request body for creating a commit.
#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a str,
    parents: [&'a str; 1],
}

/// Request body for moving a ref.
#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a str,
    force: bool,
}

/// Any response that only matters for its `sha`.
#[derive(Deserialize)]
struct GitHubSha {
    sha: String,
}

/// GitHub ref response format.
#[derive(Deserialize)]
struct GitHubRef {
    object: GitHubSha,
}

/// GitHub commit response format.
#[derive(Deserialize)]
struct GitHubCommit {
    sha: String,
    tree: GitHubSha,
}
