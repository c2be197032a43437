//! deploy::provision
//!
//! Makes the target repository exist with the requested visibility.

use super::DeployError;
use crate::core::types::{RepositoryConfig, Visibility};
use crate::forge::{CreateRepository, GitData, Lookup};

/// What [`RepoProvisioner::ensure`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    /// The repository was created, initialized with a first commit.
    Created,
    /// The repository existed with the other visibility and was switched.
    VisibilityChanged { from: Visibility, to: Visibility },
    /// The repository already matched.
    Unchanged,
}

/// Ensures a repository exists and matches the requested visibility.
pub struct RepoProvisioner<'a> {
    remote: &'a dyn GitData,
}

impl<'a> RepoProvisioner<'a> {
    pub fn new(remote: &'a dyn GitData) -> Self {
        Self { remote }
    }

    /// Create the repository if missing, otherwise sync its visibility.
    ///
    /// A newly created repository is auto-initialized so its default branch
    /// has a commit to build on. An existing repository is only touched when
    /// its visibility differs, and only the visibility is changed.
    pub async fn ensure(&self, config: &RepositoryConfig) -> Result<Provisioned, DeployError> {
        let repo = config.name.as_str();
        let wanted = config.visibility;

        match self.remote.get_repository(repo).await? {
            Lookup::Absent => {
                tracing::info!(
                    owner = %config.owner_account,
                    repo,
                    kind = %config.owner_kind,
                    private = wanted.is_private(),
                    "creating repository"
                );
                self.remote
                    .create_repository(
                        config.owner_kind,
                        CreateRepository {
                            name: repo.to_string(),
                            private: wanted.is_private(),
                            auto_init: true,
                        },
                    )
                    .await?;
                Ok(Provisioned::Created)
            }
            Lookup::Found(existing) if existing.private != wanted.is_private() => {
                let from = Visibility::from_private(existing.private);
                tracing::info!(repo, %from, to = %wanted, "changing repository visibility");
                self.remote
                    .set_visibility(repo, wanted.is_private())
                    .await?;
                Ok(Provisioned::VisibilityChanged { from, to: wanted })
            }
            Lookup::Found(_) => {
                tracing::debug!(repo, "repository already provisioned");
                Ok(Provisioned::Unchanged)
            }
        }
    }
}
