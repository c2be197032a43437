//! ui
//!
//! User-facing terminal output.
//!
//! All human-readable output goes through [`output`] so `--quiet` and
//! `--debug` are honored in one place. Logs are separate and go through
//! `tracing`.

pub mod output;
