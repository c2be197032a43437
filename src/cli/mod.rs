//! cli
//!
//! Command-line interface layer for bundlepush.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the log subscriber
//! - Delegate to command handlers
//!
//! The CLI layer is thin. Remote work happens in [`crate::deploy`]; handlers
//! only load configuration, build the client, and format results.

pub mod args;
pub mod commands;

pub use args::Cli;

use std::path::PathBuf;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::deploy::DeployError;
use crate::ui::output::Verbosity;

/// Flags shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Explicit config file.
    pub config: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
}

impl Context {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let ctx = Context {
        config: cli.config.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
    };

    commands::dispatch(cli.command, &ctx)
}

/// Exit status for a failed run: one per [`crate::deploy::ErrorKind`], 1 otherwise.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<DeployError>()
        .map(|e| e.kind().exit_code())
        .unwrap_or(1)
}

/// Logs go to stderr so stdout stays parseable with `--json`.
///
/// `--debug` turns on this crate's debug events; otherwise `RUST_LOG` applies,
/// falling back to warnings only.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("warn,bundlepush=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
