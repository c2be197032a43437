//! deploy
//!
//! The bundle-to-commit pipeline.
//!
//! # Stages
//!
//! 1. [`provision`]: the repository exists with the requested visibility
//! 2. [`archive`]: the uploaded bundle becomes normalized file entries
//! 3. [`branch`]: the target branch resolves to a base commit
//! 4. [`upload`]: blobs, a tree overlaying the base, and one commit
//! 5. [`refs`]: the branch is forced to the new commit
//!
//! Each stage completes before the next begins. A failing stage ends the
//! run; nothing already written is rolled back. The branch only moves in
//! the final stage, so it never points at a partial deployment.

pub mod archive;
pub mod branch;
mod error;
pub mod provision;
pub mod refs;
pub mod upload;

pub use archive::{ArchiveExtractor, Extracted};
pub use branch::BranchResolver;
pub use error::{DeployError, ErrorEnvelope, ErrorKind};
pub use provision::{Provisioned, RepoProvisioner};
pub use refs::RefUpdater;
pub use upload::ObjectUploader;

use crate::core::config::DeploySettings;
use crate::core::types::{
    BranchName, DeploymentResult, OwnerKind, RepoName, RepositoryConfig, Visibility,
};
use crate::forge::GitData;

/// Build the target repository for `repo`, owned by the remote's account.
pub fn repository_for(
    remote: &dyn GitData,
    owner_kind: OwnerKind,
    repo: &str,
    private: bool,
) -> Result<RepositoryConfig, DeployError> {
    if repo.trim().is_empty() {
        return Err(DeployError::Validation("Missing repo".into()));
    }
    Ok(RepositoryConfig {
        name: RepoName::new(repo.trim())?,
        owner_account: remote.owner().to_string(),
        owner_kind,
        visibility: Visibility::from_private(private),
    })
}

/// Runs one deployment end to end.
pub struct DeploymentPipeline<'a> {
    remote: &'a dyn GitData,
    settings: DeploySettings,
}

impl<'a> DeploymentPipeline<'a> {
    pub fn new(remote: &'a dyn GitData, settings: DeploySettings) -> Self {
        Self { remote, settings }
    }

    /// Deploy `archive` to `branch` of the configured repository.
    ///
    /// On success the branch points at a new commit whose only parent is the
    /// branch's previous head (or the default branch head, for a new branch)
    /// and whose tree is that parent's tree overlaid with the archive's files.
    pub async fn run(
        &self,
        config: &RepositoryConfig,
        branch: &BranchName,
        archive: &[u8],
    ) -> Result<DeploymentResult, DeployError> {
        tracing::info!(
            remote = self.remote.name(),
            owner = %config.owner_account,
            repo = %config.name,
            %branch,
            bytes = archive.len(),
            "deployment started"
        );

        RepoProvisioner::new(self.remote).ensure(config).await?;

        let extracted = ArchiveExtractor::new(self.settings.max_files).extract(archive)?;

        let base = BranchResolver::new(self.remote)
            .resolve(&config.name, branch)
            .await?;

        let commit = ObjectUploader::new(
            self.remote,
            self.settings.blob_concurrency,
            self.settings.commit_message.clone(),
        )
        .upload(&config.name, &base.head_commit_sha, &extracted.entries)
        .await?;

        RefUpdater::new(self.remote)
            .update(&config.name, branch, &commit.sha)
            .await?;

        tracing::info!(
            repo = %config.name,
            %branch,
            commit = %commit.sha,
            files = extracted.entries.len(),
            warnings = extracted.warnings.len(),
            "deployment finished"
        );

        Ok(DeploymentResult {
            ok: true,
            owner_account: config.owner_account.clone(),
            repo_name: config.name.to_string(),
            branch_name: branch.to_string(),
            file_count: extracted.entries.len(),
            new_commit_sha: commit.sha,
            warnings: extracted.warnings,
        })
    }

    /// Provision the repository without deploying anything.
    ///
    /// The branch is not created here; the first deployment to it does that.
    pub async fn provision(&self, config: &RepositoryConfig) -> Result<Provisioned, DeployError> {
        RepoProvisioner::new(self.remote).ensure(config).await
    }
}
