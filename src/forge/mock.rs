//! forge::mock
//!
//! In-memory Git Data host for deterministic testing.
//!
//! # Design
//!
//! `MockRemote` keeps repositories, refs, and content-addressed blobs,
//! trees and commits in memory. It records every call so tests can assert
//! on ordering and counts, and it can be configured to fail a chosen
//! operation.
//!
//! Object ids are SHA-256 digests of the object content truncated to 40 hex
//! characters: identical content gets an identical id, like on a real host.
//!
//! # Example
//!
//! ```
//! use bundlepush::forge::mock::MockRemote;
//! use bundlepush::forge::{GitData, Lookup};
//!
//! # tokio_test::block_on(async {
//! let remote = MockRemote::new("octocat").with_repository("demo", false);
//!
//! let head = remote.get_branch_head("demo", "main").await.unwrap();
//! assert!(matches!(head, Lookup::Found(_)));
//!
//! let missing = remote.get_branch_head("demo", "feature").await.unwrap();
//! assert_eq!(missing, Lookup::Absent);
//! # });
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::traits::{
    CreateRepository, GitData, Lookup, RemoteCommit, RemoteError, RemoteRepository, ResponseBody,
};
use crate::core::types::{OwnerKind, TreeEntry};

/// Mock Git Data host for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockRemote {
    owner: Arc<str>,
    inner: Arc<Mutex<MockRemoteInner>>,
}

#[derive(Debug)]
struct MockRemoteInner {
    repos: HashMap<String, MockRepo>,
    fail_on: Option<FailOn>,
    blobs_created: usize,
    operations: Vec<MockOperation>,
}

/// A commit stored by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCommit {
    pub tree: String,
    pub parents: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
struct MockRepo {
    private: bool,
    default_branch: String,
    refs: HashMap<String, String>,
    blobs: HashMap<String, Vec<u8>>,
    /// Flattened trees: path -> blob sha
    trees: HashMap<String, BTreeMap<String, String>>,
    commits: HashMap<String, MockCommit>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    GetRepository(RemoteError),
    CreateRepository(RemoteError),
    SetVisibility(RemoteError),
    GetBranchHead(RemoteError),
    CreateBranch(RemoteError),
    GetCommit(RemoteError),
    CreateBlob(RemoteError),
    /// Let `n` blob uploads succeed, then fail the rest.
    CreateBlobAfter(usize, RemoteError),
    CreateTree(RemoteError),
    CreateCommit(RemoteError),
    UpdateRef(RemoteError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetRepository {
        repo: String,
    },
    CreateRepository {
        owner_kind: OwnerKind,
        name: String,
        private: bool,
        auto_init: bool,
    },
    SetVisibility {
        repo: String,
        private: bool,
    },
    GetBranchHead {
        repo: String,
        branch: String,
    },
    CreateBranch {
        repo: String,
        branch: String,
        sha: String,
    },
    GetCommit {
        repo: String,
        sha: String,
    },
    CreateBlob {
        repo: String,
        len: usize,
    },
    CreateTree {
        repo: String,
        base_tree: String,
        paths: Vec<String>,
    },
    CreateCommit {
        repo: String,
        tree: String,
        parent: String,
        message: String,
    },
    UpdateRef {
        repo: String,
        branch: String,
        sha: String,
    },
}

impl MockOperation {
    /// Whether this call changes remote state.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            MockOperation::GetRepository { .. }
                | MockOperation::GetBranchHead { .. }
                | MockOperation::GetCommit { .. }
        )
    }

    /// Whether this call creates a blob, tree or commit object.
    pub fn is_object_write(&self) -> bool {
        matches!(
            self,
            MockOperation::CreateBlob { .. }
                | MockOperation::CreateTree { .. }
                | MockOperation::CreateCommit { .. }
        )
    }
}

/// Content-addressed id for a mock object.
fn object_id(kind: &str, content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{} {}\0", kind, content.len()).as_bytes());
    hasher.update(content);
    let mut id = hex::encode(hasher.finalize());
    id.truncate(40);
    id
}

fn tree_id(entries: &BTreeMap<String, String>) -> String {
    let mut content = Vec::new();
    for (path, sha) in entries {
        content.extend_from_slice(path.as_bytes());
        content.push(0);
        content.extend_from_slice(sha.as_bytes());
        content.push(b'\n');
    }
    object_id("tree", &content)
}

fn commit_id(commit: &MockCommit) -> String {
    let content = format!(
        "tree {}\nparents {}\n\n{}",
        commit.tree,
        commit.parents.join(" "),
        commit.message
    );
    object_id("commit", content.as_bytes())
}

fn not_found(what: impl Into<String>) -> RemoteError {
    RemoteError::NotFound {
        message: what.into(),
        body: ResponseBody::Json(serde_json::json!({ "message": "Not Found" })),
    }
}

fn unprocessable(message: &str) -> RemoteError {
    RemoteError::Status {
        status: 422,
        message: message.to_string(),
        body: ResponseBody::Json(serde_json::json!({ "message": message })),
    }
}

impl MockRepo {
    /// An auto-initialized repository: one README commit on `main`.
    fn initialized(private: bool) -> Self {
        let mut repo = MockRepo {
            private,
            default_branch: "main".to_string(),
            ..Default::default()
        };

        let readme = b"# Repository\n".to_vec();
        let blob = object_id("blob", &readme);
        repo.blobs.insert(blob.clone(), readme);

        let mut tree = BTreeMap::new();
        tree.insert("README.md".to_string(), blob);
        let tree_sha = tree_id(&tree);
        repo.trees.insert(tree_sha.clone(), tree);

        let commit = MockCommit {
            tree: tree_sha,
            parents: vec![],
            message: "Initial commit".to_string(),
        };
        let commit_sha = commit_id(&commit);
        repo.commits.insert(commit_sha.clone(), commit);
        repo.refs.insert("main".to_string(), commit_sha);
        repo
    }

    fn summary(&self, name: &str) -> RemoteRepository {
        RemoteRepository {
            name: name.to_string(),
            private: self.private,
            default_branch: self.default_branch.clone(),
        }
    }
}

impl MockRemote {
    /// Create an empty mock host for `owner`.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: Arc::from(owner.into()),
            inner: Arc::new(Mutex::new(MockRemoteInner {
                repos: HashMap::new(),
                fail_on: None,
                blobs_created: 0,
                operations: Vec::new(),
            })),
        }
    }

    /// Add an auto-initialized repository with one commit on `main`.
    pub fn with_repository(self, name: &str, private: bool) -> Self {
        self.state()
            .repos
            .insert(name.to_string(), MockRepo::initialized(private));
        self
    }

    /// Change the default branch of an existing repository, renaming its ref.
    pub fn with_default_branch(self, repo: &str, branch: &str) -> Self {
        {
            let mut inner = self.state();
            if let Some(r) = inner.repos.get_mut(repo) {
                let old = std::mem::replace(&mut r.default_branch, branch.to_string());
                if let Some(sha) = r.refs.remove(&old) {
                    r.refs.insert(branch.to_string(), sha);
                }
            }
        }
        self
    }

    /// Configure the mock to fail on a specific operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.state().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.state().fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.state().operations.clear();
    }

    /// Current head of a branch (for test verification).
    pub fn branch_head(&self, repo: &str, branch: &str) -> Option<String> {
        self.state()
            .repos
            .get(repo)
            .and_then(|r| r.refs.get(branch).cloned())
    }

    /// Move a branch without recording an operation (simulates another writer).
    pub fn set_branch_head(&self, repo: &str, branch: &str, sha: &str) {
        if let Some(r) = self.state().repos.get_mut(repo) {
            r.refs.insert(branch.to_string(), sha.to_string());
        }
    }

    /// Whether a repository is private, if it exists.
    pub fn is_private(&self, repo: &str) -> Option<bool> {
        self.state().repos.get(repo).map(|r| r.private)
    }

    pub fn repository_count(&self) -> usize {
        self.state().repos.len()
    }

    /// A stored commit (for test verification).
    pub fn commit(&self, repo: &str, sha: &str) -> Option<MockCommit> {
        self.state()
            .repos
            .get(repo)
            .and_then(|r| r.commits.get(sha).cloned())
    }

    /// Files reachable from a commit: path -> content.
    pub fn files_at(&self, repo: &str, commit_sha: &str) -> Option<BTreeMap<String, Vec<u8>>> {
        let inner = self.state();
        let r = inner.repos.get(repo)?;
        let commit = r.commits.get(commit_sha)?;
        let tree = r.trees.get(&commit.tree)?;
        tree.iter()
            .map(|(path, blob)| r.blobs.get(blob).map(|c| (path.clone(), c.clone())))
            .collect()
    }

    /// Number of stored blobs in a repository.
    pub fn blob_count(&self, repo: &str) -> usize {
        self.state().repos.get(repo).map_or(0, |r| r.blobs.len())
    }

    fn state(&self) -> MutexGuard<'_, MockRemoteInner> {
        self.inner.lock().expect("mock remote state poisoned")
    }

    /// Record an operation and return the configured failure for it, if any.
    fn record(&self, op: MockOperation) -> Result<(), RemoteError> {
        let mut inner = self.state();
        let failure = match (&inner.fail_on, &op) {
            (Some(FailOn::GetRepository(e)), MockOperation::GetRepository { .. })
            | (Some(FailOn::CreateRepository(e)), MockOperation::CreateRepository { .. })
            | (Some(FailOn::SetVisibility(e)), MockOperation::SetVisibility { .. })
            | (Some(FailOn::GetBranchHead(e)), MockOperation::GetBranchHead { .. })
            | (Some(FailOn::CreateBranch(e)), MockOperation::CreateBranch { .. })
            | (Some(FailOn::GetCommit(e)), MockOperation::GetCommit { .. })
            | (Some(FailOn::CreateBlob(e)), MockOperation::CreateBlob { .. })
            | (Some(FailOn::CreateTree(e)), MockOperation::CreateTree { .. })
            | (Some(FailOn::CreateCommit(e)), MockOperation::CreateCommit { .. })
            | (Some(FailOn::UpdateRef(e)), MockOperation::UpdateRef { .. }) => Some(e.clone()),
            (Some(FailOn::CreateBlobAfter(n, e)), MockOperation::CreateBlob { .. })
                if inner.blobs_created >= *n =>
            {
                Some(e.clone())
            }
            _ => None,
        };
        inner.operations.push(op);
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Run `f` against an existing repository.
    fn with_repo<T>(
        &self,
        repo: &str,
        f: impl FnOnce(&mut MockRepo) -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        let mut inner = self.state();
        let r = inner
            .repos
            .get_mut(repo)
            .ok_or_else(|| not_found(format!("repository {}/{}", self.owner, repo)))?;
        f(r)
    }
}

#[async_trait]
impl GitData for MockRemote {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn owner(&self) -> &str {
        &self.owner
    }

    async fn get_repository(&self, repo: &str) -> Result<Lookup<RemoteRepository>, RemoteError> {
        self.record(MockOperation::GetRepository {
            repo: repo.to_string(),
        })?;
        Lookup::from_fetch(self.with_repo(repo, |r| Ok(r.summary(repo))))
    }

    async fn create_repository(
        &self,
        owner_kind: OwnerKind,
        request: CreateRepository,
    ) -> Result<RemoteRepository, RemoteError> {
        self.record(MockOperation::CreateRepository {
            owner_kind,
            name: request.name.clone(),
            private: request.private,
            auto_init: request.auto_init,
        })?;

        let mut inner = self.state();
        if inner.repos.contains_key(&request.name) {
            return Err(unprocessable("name already exists on this account"));
        }
        let repo = if request.auto_init {
            MockRepo::initialized(request.private)
        } else {
            MockRepo {
                private: request.private,
                default_branch: "main".to_string(),
                ..Default::default()
            }
        };
        let summary = repo.summary(&request.name);
        inner.repos.insert(request.name, repo);
        Ok(summary)
    }

    async fn set_visibility(&self, repo: &str, private: bool) -> Result<(), RemoteError> {
        self.record(MockOperation::SetVisibility {
            repo: repo.to_string(),
            private,
        })?;
        self.with_repo(repo, |r| {
            r.private = private;
            Ok(())
        })
    }

    async fn get_branch_head(
        &self,
        repo: &str,
        branch: &str,
    ) -> Result<Lookup<String>, RemoteError> {
        self.record(MockOperation::GetBranchHead {
            repo: repo.to_string(),
            branch: branch.to_string(),
        })?;
        let head = self.with_repo(repo, |r| {
            r.refs
                .get(branch)
                .cloned()
                .ok_or_else(|| not_found(format!("ref heads/{}", branch)))
        });
        Lookup::from_fetch(head)
    }

    async fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> Result<(), RemoteError> {
        self.record(MockOperation::CreateBranch {
            repo: repo.to_string(),
            branch: branch.to_string(),
            sha: sha.to_string(),
        })?;
        self.with_repo(repo, |r| {
            if r.refs.contains_key(branch) {
                return Err(unprocessable("Reference already exists"));
            }
            if !r.commits.contains_key(sha) {
                return Err(unprocessable("Object does not exist"));
            }
            r.refs.insert(branch.to_string(), sha.to_string());
            Ok(())
        })
    }

    async fn get_commit(&self, repo: &str, sha: &str) -> Result<RemoteCommit, RemoteError> {
        self.record(MockOperation::GetCommit {
            repo: repo.to_string(),
            sha: sha.to_string(),
        })?;
        self.with_repo(repo, |r| {
            r.commits
                .get(sha)
                .map(|c| RemoteCommit {
                    sha: sha.to_string(),
                    tree_sha: c.tree.clone(),
                })
                .ok_or_else(|| not_found(format!("commit {}", sha)))
        })
    }

    async fn create_blob(&self, repo: &str, content: &[u8]) -> Result<String, RemoteError> {
        self.record(MockOperation::CreateBlob {
            repo: repo.to_string(),
            len: content.len(),
        })?;
        let sha = self.with_repo(repo, |r| {
            let sha = object_id("blob", content);
            r.blobs.insert(sha.clone(), content.to_vec());
            Ok(sha)
        })?;
        self.state().blobs_created += 1;
        Ok(sha)
    }

    async fn create_tree(
        &self,
        repo: &str,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String, RemoteError> {
        self.record(MockOperation::CreateTree {
            repo: repo.to_string(),
            base_tree: base_tree.to_string(),
            paths: entries.iter().map(|e| e.path.clone()).collect(),
        })?;
        self.with_repo(repo, |r| {
            let mut tree = r
                .trees
                .get(base_tree)
                .cloned()
                .ok_or_else(|| unprocessable("base_tree is not a valid tree"))?;
            for entry in entries {
                if !r.blobs.contains_key(&entry.sha) {
                    return Err(unprocessable("tree.sha is not a valid blob"));
                }
                tree.insert(entry.path.clone(), entry.sha.clone());
            }
            let sha = tree_id(&tree);
            r.trees.insert(sha.clone(), tree);
            Ok(sha)
        })
    }

    async fn create_commit(
        &self,
        repo: &str,
        message: &str,
        tree: &str,
        parent: &str,
    ) -> Result<String, RemoteError> {
        self.record(MockOperation::CreateCommit {
            repo: repo.to_string(),
            tree: tree.to_string(),
            parent: parent.to_string(),
            message: message.to_string(),
        })?;
        self.with_repo(repo, |r| {
            if !r.trees.contains_key(tree) {
                return Err(unprocessable("Tree SHA does not exist"));
            }
            if !r.commits.contains_key(parent) {
                return Err(unprocessable("Parent SHA does not exist or is not a commit object"));
            }
            let commit = MockCommit {
                tree: tree.to_string(),
                parents: vec![parent.to_string()],
                message: message.to_string(),
            };
            let sha = commit_id(&commit);
            r.commits.insert(sha.clone(), commit);
            Ok(sha)
        })
    }

    async fn update_ref(&self, repo: &str, branch: &str, sha: &str) -> Result<(), RemoteError> {
        self.record(MockOperation::UpdateRef {
            repo: repo.to_string(),
            branch: branch.to_string(),
            sha: sha.to_string(),
        })?;
        self.with_repo(repo, |r| {
            if !r.refs.contains_key(branch) {
                return Err(unprocessable("Reference does not exist"));
            }
            if !r.commits.contains_key(sha) {
                return Err(unprocessable("Object does not exist"));
            }
            r.refs.insert(branch.to_string(), sha.to_string());
            Ok(())
        })
    }
}
