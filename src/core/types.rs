//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`RepoName`] - Validated repository name
//! - [`BranchName`] - Validated Git branch name
//! - [`OwnerKind`] / [`Visibility`] - Repository ownership and visibility
//! - [`RepositoryConfig`] - Target repository for one deployment
//! - [`FileEntry`] / [`Warning`] - Extracted archive members and advisories
//! - [`TreeEntry`] / [`CommitObject`] / [`Branch`] - Remote object shapes
//! - [`DeploymentResult`] - Final pipeline output
//!
//! # Validation
//!
//! Names enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use bundlepush::core::types::{BranchName, RepoName};
//!
//! let repo = RepoName::new("my-site").unwrap();
//! let branch = BranchName::new("feature/landing").unwrap();
//! assert_eq!(repo.as_str(), "my-site");
//! assert_eq!(branch.as_str(), "feature/landing");
//!
//! assert!(RepoName::new("bad name").is_err());
//! assert!(BranchName::new("invalid..name").is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid repository name: {0}")]
    InvalidRepoName(String),

    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid owner kind '{0}', must be one of: user, org")]
    InvalidOwnerKind(String),
}

/// Maximum repository name length accepted by GitHub.
const MAX_REPO_NAME_LEN: usize = 100;

/// A validated repository name.
///
/// Repository names are non-empty, at most 100 characters, and consist of
/// ASCII alphanumerics plus `-`, `_` and `.`. The names `.` and `..` are
/// reserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoName(String);

impl RepoName {
    /// Create a new validated repository name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepoName` if the name is empty, too long,
    /// reserved, or contains characters outside `[A-Za-z0-9._-]`.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypeError::InvalidRepoName(
                "repository name cannot be empty".into(),
            ));
        }
        if name.len() > MAX_REPO_NAME_LEN {
            return Err(TypeError::InvalidRepoName(format!(
                "repository name exceeds {MAX_REPO_NAME_LEN} characters"
            )));
        }
        if name == "." || name == ".." {
            return Err(TypeError::InvalidRepoName(format!(
                "'{name}' is reserved"
            )));
        }
        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(TypeError::InvalidRepoName(format!(
                "repository name cannot contain '{c}'"
            )));
        }
        Ok(Self(name))
    }

    /// Get the repository name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RepoName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RepoName> for String {
    fn from(name: RepoName) -> Self {
        name.0
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
///
/// # Example
///
/// ```
/// use bundlepush::core::types::BranchName;
///
/// assert!(BranchName::new("main").is_ok());
/// assert!(BranchName::new("release/2024-q1").is_ok());
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new(".hidden").is_err());
/// assert!(BranchName::new("branch.lock").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let invalid = |reason: &str| Err(TypeError::InvalidBranchName(reason.to_string()));

        if name.is_empty() {
            return invalid("branch name cannot be empty");
        }
        if name == "@" {
            return invalid("branch name cannot be '@' (reserved)");
        }
        if name.starts_with('.') || name.starts_with('-') || name.starts_with('/') {
            return invalid("branch name cannot start with '.', '-' or '/'");
        }
        if name.ends_with(".lock") || name.ends_with('/') || name.ends_with('.') {
            return invalid("branch name cannot end with '.lock', '/' or '.'");
        }
        for bad in ["..", "@{", "//"] {
            if name.contains(bad) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{bad}'"
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name
            .chars()
            .find(|c| INVALID_CHARS.contains(c) || c.is_ascii_control())
        {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot contain {c:?}"
            )));
        }

        for component in name.split('/') {
            if component.starts_with('.') {
                return invalid("path component cannot start with '.'");
            }
            if component.ends_with(".lock") {
                return invalid("path component cannot end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of account that owns the target repository.
///
/// Selects the repository-creation endpoint; nothing else depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    /// Personal account (`POST /user/repos`)
    #[default]
    User,
    /// Organization (`POST /orgs/{org}/repos`)
    Org,
}

impl std::str::FromStr for OwnerKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "personal" => Ok(OwnerKind::User),
            "org" | "organization" => Ok(OwnerKind::Org),
            other => Err(TypeError::InvalidOwnerKind(other.to_string())),
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerKind::User => write!(f, "user"),
            OwnerKind::Org => write!(f, "org"),
        }
    }
}

/// Repository visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    /// Map the API's `private` flag to a visibility.
    pub fn from_private(private: bool) -> Self {
        if private {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }

    pub fn is_private(self) -> bool {
        self == Visibility::Private
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

/// Target repository for one deployment.
///
/// Built from caller input plus the client's owner identity; immutable for
/// the lifetime of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub name: RepoName,
    pub owner_account: String,
    pub owner_kind: OwnerKind,
    pub visibility: Visibility,
}

/// A branch and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub name: BranchName,
    pub head_commit_sha: String,
}

/// A commit object created on the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitObject {
    /// Sha assigned by the remote
    pub sha: String,
    pub tree_sha: String,
    /// Single parent; deployments never produce merge commits
    pub parent_sha: String,
    pub message: String,
}

/// Git file mode for a regular, non-executable file.
pub const REGULAR_FILE_MODE: &str = "100644";

/// One path in a tree overlay, pointing at an uploaded blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub sha: String,
}

impl TreeEntry {
    /// A regular-file entry for `path` backed by blob `sha`.
    pub fn file(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: REGULAR_FILE_MODE,
            kind: "blob",
            sha: sha.into(),
        }
    }
}

/// A retained archive member.
///
/// `path` is relative, forward-slash separated, non-empty, and never under `.git/`.
#[derive(Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub content: Vec<u8>,
}

// Contents can be large; print the size only.
impl fmt::Debug for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileEntry")
            .field("path", &self.path)
            .field("len", &self.content.len())
            .finish()
    }
}

/// Advisory annotation on a deployed path. Never blocks a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub path: String,
    pub reason: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sensitive-looking file ({}): {}", self.reason, self.path)
    }
}

/// Outcome of a successful deployment.
///
/// Serializes to the JSON shape returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    pub ok: bool,
    pub owner_account: String,
    pub repo_name: String,
    pub branch_name: String,
    pub file_count: usize,
    pub new_commit_sha: String,
    pub warnings: Vec<Warning>,
}
