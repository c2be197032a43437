//! deploy::refs
//!
//! Moves a branch to a new commit.

use super::DeployError;
use crate::core::types::{BranchName, RepoName};
use crate::forge::GitData;

/// Points a branch at a commit.
///
/// The update is forced: whatever the branch pointed at is replaced, even if
/// the new commit does not descend from it. The most recent deployment wins.
pub struct RefUpdater<'a> {
    remote: &'a dyn GitData,
}

impl<'a> RefUpdater<'a> {
    pub fn new(remote: &'a dyn GitData) -> Self {
        Self { remote }
    }

    pub async fn update(
        &self,
        repo: &RepoName,
        branch: &BranchName,
        commit_sha: &str,
    ) -> Result<(), DeployError> {
        self.remote
            .update_ref(repo.as_str(), branch.as_str(), commit_sha)
            .await?;
        tracing::info!(%repo, %branch, sha = commit_sha, "branch updated");
        Ok(())
    }
}
