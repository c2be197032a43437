//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. Environment variables
//! 4. CLI flags (not handled here)
//!
//! # Config File Locations
//!
//! Searched in order:
//! 1. An explicit path (`--config`)
//! 2. `$BUNDLEPUSH_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/bundlepush/config.toml`
//! 4. `~/.bundlepush/config.toml`
//!
//! # Environment
//!
//! - `GITHUB_TOKEN` - access token (required)
//! - `GITHUB_OWNER` - owning account or organization (required)
//! - `GITHUB_OWNER_TYPE` - `user` (default) or `org`
//! - `GITHUB_API_URL` - REST API base URL
//!
//! # Example
//!
//! ```no_run
//! use bundlepush::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! let client = config.client_config().unwrap();
//! println!("Deploying as {} ({})", client.owner, client.owner_kind);
//! println!("File limit: {}", config.deploy_settings().max_files);
//! ```

pub mod schema;

pub use schema::{DeploySection, FileConfig, GitHubSection};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{BranchName, OwnerKind, TypeError};

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default `X-GitHub-Api-Version` header value.
pub const DEFAULT_API_VERSION: &str = "2022-11-28";

/// Default cap on files per deployment.
pub const DEFAULT_MAX_FILES: usize = 1200;

/// Default number of concurrent blob uploads.
pub const DEFAULT_BLOB_CONCURRENCY: usize = 4;

/// Default commit message prefix.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Deploy from bundlepush";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("{0} not set")]
    Missing(&'static str),

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

impl From<TypeError> for ConfigError {
    fn from(e: TypeError) -> Self {
        ConfigError::InvalidValue(e.to_string())
    }
}

/// Everything a remote client needs, resolved once and passed explicitly.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base: String,
    pub token: String,
    pub owner: String,
    pub owner_kind: OwnerKind,
    pub api_version: String,
    pub user_agent: String,
}

impl ClientConfig {
    /// Client config for `owner` against the public GitHub API.
    pub fn new(token: impl Into<String>, owner: impl Into<String>, owner_kind: OwnerKind) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token: token.into(),
            owner: owner.into(),
            owner_kind,
            api_version: DEFAULT_API_VERSION.to_string(),
            user_agent: concat!("bundlepush/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Override the API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base", &self.api_base)
            .field("has_token", &!self.token.is_empty())
            .field("owner", &self.owner)
            .field("owner_kind", &self.owner_kind)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Pipeline tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySettings {
    pub max_files: usize,
    pub blob_concurrency: usize,
    pub commit_message: String,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            blob_concurrency: DEFAULT_BLOB_CONCURRENCY,
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
        }
    }
}

/// Environment values relevant to configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct EnvOverrides {
    token: Option<String>,
    owner: Option<String>,
    owner_type: Option<String>,
    api_base: Option<String>,
}

impl EnvOverrides {
    fn read(env: &dyn Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        Self {
            token: get("GITHUB_TOKEN"),
            owner: get("GITHUB_OWNER"),
            owner_type: get("GITHUB_OWNER_TYPE"),
            api_base: get("GITHUB_API_URL"),
        }
    }
}

/// Merged configuration from file and environment.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed config file (defaults if none was found)
    pub file: FileConfig,
    /// Path the file was loaded from
    path: Option<PathBuf>,
    env: EnvOverrides,
}

impl Config {
    /// Load configuration from the process environment and default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or parsed.
    /// A missing config file is not an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(explicit, &|key: &str| match std::env::var(key) {
            Ok(value) => Some(value),
            Err(_) if key == "HOME" => dirs::home_dir().map(|h| h.display().to_string()),
            Err(_) => None,
        })
    }

    /// Load configuration with a custom environment reader.
    ///
    /// Every lookup, `HOME` included, goes through `env`.
    pub fn load_with_env(
        explicit: Option<&Path>,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => Self::locate(env),
        };

        let file = match &path {
            Some(p) => Self::read_file(p)?,
            None => FileConfig::default(),
        };
        file.validate()?;

        Ok(Self {
            file,
            path,
            env: EnvOverrides::read(env),
        })
    }

    /// Find the first existing config file.
    fn locate(env: &dyn Fn(&str) -> Option<String>) -> Option<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(p) = env("BUNDLEPUSH_CONFIG") {
            candidates.push(PathBuf::from(p));
        }
        if let Some(xdg) = env("XDG_CONFIG_HOME") {
            candidates.push(PathBuf::from(xdg).join("bundlepush/config.toml"));
        }
        if let Some(home) = env("HOME") {
            candidates.push(PathBuf::from(home).join(".bundlepush/config.toml"));
        }
        candidates.into_iter().find(|p| p.exists())
    }

    fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Path of the loaded config file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn github(&self) -> Option<&GitHubSection> {
        self.file.github.as_ref()
    }

    fn deploy(&self) -> Option<&DeploySection> {
        self.file.deploy.as_ref()
    }

    /// Resolve the remote client configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no token or owner is configured,
    /// and `ConfigError::InvalidValue` for an unknown owner type.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let github = self.github();

        let token = self
            .env
            .token
            .clone()
            .or_else(|| github.and_then(|g| g.token.clone()))
            .ok_or(ConfigError::Missing("GITHUB_TOKEN"))?;

        let owner = self
            .env
            .owner
            .clone()
            .or_else(|| github.and_then(|g| g.owner.clone()))
            .ok_or(ConfigError::Missing("GITHUB_OWNER"))?;

        let owner_kind = match &self.env.owner_type {
            Some(raw) => raw.parse::<OwnerKind>()?,
            None => github.and_then(|g| g.owner_type).unwrap_or_default(),
        };

        let mut client = ClientConfig::new(token, owner, owner_kind);
        if let Some(base) = self
            .env
            .api_base
            .clone()
            .or_else(|| github.and_then(|g| g.api_base.clone()))
        {
            client = client.with_api_base(base);
        }
        if let Some(version) = github.and_then(|g| g.api_version.clone()) {
            client.api_version = version;
        }
        Ok(client)
    }

    /// Resolve pipeline settings, applying defaults.
    pub fn deploy_settings(&self) -> DeploySettings {
        let defaults = DeploySettings::default();
        let deploy = self.deploy();
        DeploySettings {
            max_files: deploy
                .and_then(|d| d.max_files)
                .unwrap_or(defaults.max_files),
            blob_concurrency: deploy
                .and_then(|d| d.blob_concurrency)
                .unwrap_or(defaults.blob_concurrency),
            commit_message: deploy
                .and_then(|d| d.commit_message.clone())
                .unwrap_or(defaults.commit_message),
        }
    }

    /// Branch deployed to when none is given. Defaults to `main`.
    pub fn default_branch(&self) -> Result<BranchName, ConfigError> {
        let name = self
            .deploy()
            .and_then(|d| d.default_branch.as_deref())
            .unwrap_or("main");
        Ok(BranchName::new(name)?)
    }

    /// Whether repositories are private when not specified. Defaults to `true`.
    pub fn default_private(&self) -> bool {
        self.deploy().and_then(|d| d.private).unwrap_or(true)
    }
}
