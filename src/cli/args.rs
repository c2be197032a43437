//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Read configuration from this file
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// bundlepush - Push a file bundle to GitHub as a single commit
#[derive(Parser, Debug)]
#[command(name = "bundlepush")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (overrides $BUNDLEPUSH_CONFIG and default locations)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Target repository options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Repository name under the configured owner
    #[arg(long)]
    pub repo: String,

    /// Branch to deploy to [default: main, or `deploy.default_branch`]
    #[arg(long)]
    pub branch: Option<String>,

    /// Repository visibility [default: true, or `deploy.private`]
    #[arg(long, value_name = "BOOL")]
    pub private: Option<bool>,

    /// Print machine-readable JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Deploy a zip archive as one commit on a branch
    #[command(
        long_about = "Deploy a zip archive as one commit on a branch.\n\n\
            The repository is created if it does not exist and its visibility is \
            brought in line with --private. Files in the archive are written on top \
            of the branch's current tree; files not in the archive are kept. The \
            branch is created from the default branch when missing and is always \
            moved to the new commit.",
        after_help = "\
EXAMPLES:
    # Deploy a build to main of a private repository
    bundlepush deploy dist.zip --repo my-site

    # Deploy to a preview branch of a public repository
    bundlepush deploy dist.zip --repo my-site --branch preview --private false

    # Read the archive from stdin and print JSON
    cat dist.zip | bundlepush deploy - --repo my-site --json"
    )]
    Deploy {
        /// Zip archive to deploy (`-` reads stdin)
        archive: PathBuf,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Create the repository or sync its visibility, without deploying
    Provision {
        #[command(flatten)]
        target: TargetArgs,
    },
}
