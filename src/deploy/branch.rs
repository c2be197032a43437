//! deploy::branch
//!
//! Finds the commit a deployment builds on, creating the target branch from
//! the repository's default branch when it does not exist yet.
//!
//! # States
//!
//! ```text
//! Probe ── found ──────────────────────────────────────────► Resolved
//!   │
//!   └─ absent ─► ReadDefault ─► Fork (create ref) ─► Reprobe ─► Resolved
//! ```
//!
//! The re-probe after creation returns whatever the remote now holds. Any
//! failure to create the ref is returned as the remote reported it.

use super::DeployError;
use crate::core::types::{Branch, BranchName, RepoName};
use crate::forge::{GitData, Lookup};

/// Resolves a branch name to its head commit.
pub struct BranchResolver<'a> {
    remote: &'a dyn GitData,
}

impl<'a> BranchResolver<'a> {
    pub fn new(remote: &'a dyn GitData) -> Self {
        Self { remote }
    }

    /// Head of `branch`, creating the branch from the default branch if needed.
    ///
    /// # Errors
    ///
    /// `Upstream` if the repository, its default branch, or the freshly
    /// created branch cannot be read, or if creating the branch fails.
    pub async fn resolve(&self, repo: &RepoName, branch: &BranchName) -> Result<Branch, DeployError> {
        if let Lookup::Found(sha) = self.remote.get_branch_head(repo.as_str(), branch.as_str()).await? {
            tracing::debug!(%repo, %branch, %sha, "branch exists");
            return Ok(Branch {
                name: branch.clone(),
                head_commit_sha: sha,
            });
        }

        let default_branch = match self.remote.get_repository(repo.as_str()).await? {
            Lookup::Found(r) => r.default_branch,
            Lookup::Absent => {
                return Err(DeployError::upstream(
                    404,
                    format!("repository {} not found", repo),
                ))
            }
        };
        let fork_point = match self
            .remote
            .get_branch_head(repo.as_str(), &default_branch)
            .await?
        {
            Lookup::Found(sha) => sha,
            Lookup::Absent => {
                return Err(DeployError::upstream(
                    404,
                    format!("default branch '{}' has no commits", default_branch),
                ))
            }
        };

        tracing::info!(%repo, %branch, from = %default_branch, sha = %fork_point, "creating branch");
        self.remote
            .create_branch(repo.as_str(), branch.as_str(), &fork_point)
            .await?;

        match self.remote.get_branch_head(repo.as_str(), branch.as_str()).await? {
            Lookup::Found(sha) => Ok(Branch {
                name: branch.clone(),
                head_commit_sha: sha,
            }),
            Lookup::Absent => Err(DeployError::upstream(
                404,
                format!("branch '{}' missing after creation", branch),
            )),
        }
    }
}
