//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Resolves configuration and the target repository
//! 2. Runs the pipeline against a [`GitHubClient`]
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! Every command talks to the network, so handlers are synchronous wrappers
//! that build a tokio runtime and block on an async implementation.

mod deploy;
mod provision;

pub use deploy::deploy;
pub use provision::provision;

use anyhow::Result;

use super::args::{Command, TargetArgs};
use super::Context;
use crate::core::config::{Config, DeploySettings};
use crate::core::types::{BranchName, RepositoryConfig};
use crate::deploy::{repository_for, DeployError};
use crate::forge::GitHubClient;
use crate::ui::output;

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Deploy { archive, target } => deploy(ctx, &archive, &target),
        Command::Provision { target } => provision(ctx, &target),
    }
}

/// Everything a handler needs before touching the network.
pub(crate) struct Prepared {
    pub client: GitHubClient,
    pub repository: RepositoryConfig,
    pub branch: BranchName,
    pub settings: DeploySettings,
}

/// Load configuration and validate the target.
///
/// Explicit flags win over config-file defaults.
pub(crate) fn prepare(ctx: &Context, target: &TargetArgs) -> Result<Prepared, DeployError> {
    let config = Config::load(ctx.config.as_deref())?;
    if let Some(path) = config.path() {
        tracing::debug!(path = %path.display(), "loaded config file");
    }

    let client = GitHubClient::new(config.client_config()?);
    let private = target.private.unwrap_or_else(|| config.default_private());
    let repository = repository_for(&client, client.config().owner_kind, &target.repo, private)?;
    let branch = match target.branch.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => BranchName::new(name)?,
        _ => config.default_branch()?,
    };

    Ok(Prepared {
        client,
        repository,
        branch,
        settings: config.deploy_settings(),
    })
}

/// Print a failure in the requested format and hand it back; `main` derives
/// the exit status from its kind.
pub(crate) fn report_failure(err: DeployError, json: bool) -> anyhow::Error {
    if json {
        match serde_json::to_string_pretty(&err.envelope()) {
            Ok(body) => println!("{}", body),
            Err(e) => output::error(format!("failed to encode error: {}", e)),
        }
    }
    tracing::debug!(kind = %err.kind(), status = err.status_code(), "command failed");
    anyhow::Error::new(err)
}
