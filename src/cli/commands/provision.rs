//! cli::commands::provision
//!
//! Create a repository or sync its visibility without deploying.

use anyhow::Result;
use serde::Serialize;

use super::{prepare, report_failure};
use crate::cli::args::TargetArgs;
use crate::cli::Context;
use crate::deploy::{DeployError, DeploymentPipeline, Provisioned};
use crate::ui::output;

/// JSON shape printed on success.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProvisionReport {
    ok: bool,
    owner_account: String,
    repo_name: String,
    branch_name: String,
    make_private: bool,
    #[serde(skip)]
    outcome: Provisioned,
}

/// Run the provision command.
pub fn provision(ctx: &Context, target: &TargetArgs) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    match rt.block_on(provision_async(ctx, target)) {
        Ok(report) => {
            if target.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let what = match report.outcome {
                    Provisioned::Created => "created",
                    Provisioned::VisibilityChanged { .. } => "visibility updated",
                    Provisioned::Unchanged => "already up to date",
                };
                let visibility = if report.make_private { "private" } else { "public" };
                output::success(
                    format!(
                        "{}/{} ({}): {}",
                        report.owner_account, report.repo_name, visibility, what
                    ),
                    ctx.verbosity(),
                );
            }
            Ok(())
        }
        Err(err) => Err(report_failure(err, target.json)),
    }
}

async fn provision_async(ctx: &Context, target: &TargetArgs) -> Result<ProvisionReport, DeployError> {
    let prepared = prepare(ctx, target)?;
    let outcome = DeploymentPipeline::new(&prepared.client, prepared.settings)
        .provision(&prepared.repository)
        .await?;

    Ok(ProvisionReport {
        ok: true,
        owner_account: prepared.repository.owner_account.clone(),
        repo_name: prepared.repository.name.to_string(),
        branch_name: prepared.branch.to_string(),
        make_private: prepared.repository.visibility.is_private(),
        outcome,
    })
}
