//! forge::traits
//!
//! The remote Git Data surface consumed by the deployment pipeline.
//!
//! # Design
//!
//! The `GitData` trait is async because every operation is a network call.
//! Existence probes return [`Lookup`] instead of surfacing a not-found
//! error, so callers handle absence as an ordinary branch.
//!
//! # Example
//!
//! ```ignore
//! use bundlepush::forge::{GitData, Lookup};
//!
//! async fn head_of(remote: &dyn GitData, repo: &str) -> Result<Option<String>, RemoteError> {
//!     match remote.get_branch_head(repo, "main").await? {
//!         Lookup::Found(sha) => Ok(Some(sha)),
//!         Lookup::Absent => Ok(None),
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{OwnerKind, TreeEntry};

/// A decoded response body.
///
/// Remote bodies are classified once, at decode time, instead of being
/// guessed at by each caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    /// No body at all
    Empty,
    /// A well-formed JSON document
    Json(serde_json::Value),
    /// Anything else, kept verbatim
    Text(String),
}

impl ResponseBody {
    /// Classify raw response text.
    pub fn decode(text: &str) -> Self {
        if text.trim().is_empty() {
            return ResponseBody::Empty;
        }
        match serde_json::from_str(text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(text.to_string()),
        }
    }

    /// The remote's `message` field, if the body is JSON and carries one.
    pub fn message(&self) -> Option<&str> {
        match self {
            ResponseBody::Json(value) => value.get("message").and_then(|m| m.as_str()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseBody::Empty)
    }
}

/// Errors from remote Git Data operations.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// The requested resource does not exist (HTTP 404).
    #[error("not found: {message}")]
    NotFound { message: String, body: ResponseBody },

    /// The remote answered with any other non-success status.
    #[error("API error: {status} - {message}")]
    Status {
        status: u16,
        message: String,
        body: ResponseBody,
    },

    /// A success response did not match the expected schema.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The request could not be built (bad URL or header value).
    #[error("invalid request: {0}")]
    Request(String),

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),
}

impl RemoteError {
    /// HTTP status carried by this error, if the remote answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::NotFound { .. } => Some(404),
            RemoteError::Status { status, .. } => Some(*status),
            RemoteError::Decode(_) | RemoteError::Request(_) | RemoteError::Network(_) => None,
        }
    }

    /// Remote-provided body, if any.
    pub fn body(&self) -> Option<&ResponseBody> {
        match self {
            RemoteError::NotFound { body, .. } | RemoteError::Status { body, .. } => Some(body),
            RemoteError::Decode(_) | RemoteError::Request(_) | RemoteError::Network(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

/// Outcome of an existence probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    Absent,
}

impl<T> Lookup<T> {
    /// Turn a fetch result into a lookup, mapping not-found to [`Lookup::Absent`].
    ///
    /// Every other error is passed through unchanged.
    pub fn from_fetch(result: Result<T, RemoteError>) -> Result<Self, RemoteError> {
        match result {
            Ok(value) => Ok(Lookup::Found(value)),
            Err(e) if e.is_not_found() => Ok(Lookup::Absent),
            Err(e) => Err(e),
        }
    }
}

/// Repository state as reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteRepository {
    pub name: String,
    pub private: bool,
    pub default_branch: String,
}

/// Request to create a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateRepository {
    pub name: String,
    pub private: bool,
    /// Initialize with a first commit so the default branch exists.
    pub auto_init: bool,
}

/// The parts of a commit object the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommit {
    pub sha: String,
    pub tree_sha: String,
}

/// The Git Data operations a deployment needs from a remote host.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so blob uploads can run
/// concurrently against one shared client.
///
/// # Error Handling
///
/// Lookups (`get_repository`, `get_branch_head`) report absence through
/// [`Lookup::Absent`]. Every other method reports a 404 as
/// [`RemoteError::NotFound`].
#[async_trait]
pub trait GitData: Send + Sync {
    /// Host name for logging (e.g., "github").
    fn name(&self) -> &'static str;

    /// Account that owns every repository this client addresses.
    fn owner(&self) -> &str;

    /// Read a repository's visibility and default branch.
    async fn get_repository(&self, repo: &str) -> Result<Lookup<RemoteRepository>, RemoteError>;

    /// Create a repository under the owner.
    ///
    /// `owner_kind` picks the creation endpoint.
    async fn create_repository(
        &self,
        owner_kind: OwnerKind,
        request: CreateRepository,
    ) -> Result<RemoteRepository, RemoteError>;

    /// Change a repository's visibility and nothing else.
    async fn set_visibility(&self, repo: &str, private: bool) -> Result<(), RemoteError>;

    /// Read the commit sha a branch points at.
    async fn get_branch_head(&self, repo: &str, branch: &str)
        -> Result<Lookup<String>, RemoteError>;

    /// Create `refs/heads/{branch}` pointing at `sha`.
    async fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> Result<(), RemoteError>;

    /// Read a commit object.
    async fn get_commit(&self, repo: &str, sha: &str) -> Result<RemoteCommit, RemoteError>;

    /// Upload file content, returning the blob sha.
    async fn create_blob(&self, repo: &str, content: &[u8]) -> Result<String, RemoteError>;

    /// Create a tree by overlaying `entries` onto `base_tree`, returning its sha.
    async fn create_tree(
        &self,
        repo: &str,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String, RemoteError>;

    /// Create a single-parent commit, returning its sha.
    async fn create_commit(
        &self,
        repo: &str,
        message: &str,
        tree: &str,
        parent: &str,
    ) -> Result<String, RemoteError>;

    /// Force `refs/heads/{branch}` to `sha`.
    async fn update_ref(&self, repo: &str, branch: &str, sha: &str) -> Result<(), RemoteError>;
}
