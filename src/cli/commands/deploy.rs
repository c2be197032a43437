//! cli::commands::deploy
//!
//! Deploy a zip archive to a branch.
//!
//! # Example
//!
//! ```bash
//! bundlepush deploy dist.zip --repo my-site --branch gh-pages
//! ```

use std::io::Read;
use std::path::Path;

use anyhow::Result;

use super::{prepare, report_failure};
use crate::cli::args::TargetArgs;
use crate::cli::Context;
use crate::core::types::DeploymentResult;
use crate::deploy::{DeployError, DeploymentPipeline};
use crate::ui::output;

/// Run the deploy command.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn deploy(ctx: &Context, archive: &Path, target: &TargetArgs) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    match rt.block_on(deploy_async(ctx, archive, target)) {
        Ok(result) => {
            print_result(ctx, &result, target.json)?;
            Ok(())
        }
        Err(err) => Err(report_failure(err, target.json)),
    }
}

async fn deploy_async(
    ctx: &Context,
    archive: &Path,
    target: &TargetArgs,
) -> Result<DeploymentResult, DeployError> {
    let prepared = prepare(ctx, target)?;
    let bytes = read_archive(archive)?;
    output::debug(
        format!("read {} bytes from {}", bytes.len(), archive.display()),
        ctx.verbosity(),
    );

    DeploymentPipeline::new(&prepared.client, prepared.settings)
        .run(&prepared.repository, &prepared.branch, &bytes)
        .await
}

/// Read the archive from a file, or stdin for `-`.
fn read_archive(path: &Path) -> Result<Vec<u8>, DeployError> {
    let unreadable =
        |e: std::io::Error| DeployError::Validation(format!("cannot read {}: {}", path.display(), e));

    if path == Path::new("-") {
        let mut bytes = Vec::new();
        std::io::stdin().read_to_end(&mut bytes).map_err(unreadable)?;
        Ok(bytes)
    } else {
        std::fs::read(path).map_err(unreadable)
    }
}

fn print_result(ctx: &Context, result: &DeploymentResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    let verbosity = ctx.verbosity();
    for warning in &result.warnings {
        output::warn(warning, verbosity);
    }
    output::success(
        format!(
            "Deployed {} file{} to {}/{}@{}",
            result.file_count,
            if result.file_count == 1 { "" } else { "s" },
            result.owner_account,
            result.repo_name,
            result.branch_name
        ),
        verbosity,
    );
    output::print(format!("  commit {}", result.new_commit_sha), verbosity);
    Ok(())
}
