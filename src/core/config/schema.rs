//! core::config::schema
//!
//! Configuration file schema.
//!
//! # Example
//!
//! ```toml
//! [github]
//! owner = "my-org"
//! owner_type = "org"
//! api_base = "https://github.example.com/api/v3"
//!
//! [deploy]
//! max_files = 500
//! blob_concurrency = 8
//! commit_message = "Deploy static site"
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing so a bad file fails at load time,
//! not halfway through a deployment.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::{BranchName, OwnerKind};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Remote host and identity settings
    pub github: Option<GitHubSection>,

    /// Pipeline defaults
    pub deploy: Option<DeploySection>,
}

/// `[github]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubSection {
    /// Access token. Prefer `GITHUB_TOKEN` over storing it on disk.
    pub token: Option<String>,

    /// Account or organization that owns deployed repositories
    pub owner: Option<String>,

    /// `user` or `org`
    pub owner_type: Option<OwnerKind>,

    /// REST API base URL (GitHub Enterprise)
    pub api_base: Option<String>,

    /// Value of the `X-GitHub-Api-Version` header
    pub api_version: Option<String>,
}

/// `[deploy]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DeploySection {
    /// Maximum number of files accepted from one archive
    pub max_files: Option<usize>,

    /// Number of blob uploads kept in flight
    pub blob_concurrency: Option<usize>,

    /// Commit message prefix; a timestamp is appended
    pub commit_message: Option<String>,

    /// Branch used when none is given
    pub default_branch: Option<String>,

    /// Whether newly provisioned repositories are private
    pub private: Option<bool>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(github) = &self.github {
            if let Some(base) = &github.api_base {
                if !(base.starts_with("https://") || base.starts_with("http://")) {
                    return Err(ConfigError::InvalidValue(format!(
                        "api_base must be an http(s) URL, got '{}'",
                        base
                    )));
                }
            }
            if matches!(&github.owner, Some(owner) if owner.trim().is_empty()) {
                return Err(ConfigError::InvalidValue("owner cannot be empty".into()));
            }
        }

        if let Some(deploy) = &self.deploy {
            if deploy.max_files == Some(0) {
                return Err(ConfigError::InvalidValue(
                    "max_files must be at least 1".into(),
                ));
            }
            if deploy.blob_concurrency == Some(0) {
                return Err(ConfigError::InvalidValue(
                    "blob_concurrency must be at least 1".into(),
                ));
            }
            if let Some(branch) = &deploy.default_branch {
                BranchName::new(branch.as_str()).map_err(|e| {
                    ConfigError::InvalidValue(format!("invalid default_branch: {}", e))
                })?;
            }
        }

        Ok(())
    }
}
