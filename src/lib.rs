//! bundlepush - Push a file bundle to a GitHub repository as a single commit
//!
//! bundlepush takes a zip archive and publishes its files to a branch of a
//! GitHub repository using the Git Data API: blobs, one tree overlaying the
//! branch's current tree, one commit, and a forced ref update. No local
//! clone or git binary is involved.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to deploy)
//! - [`deploy`] - Provision → Extract → Resolve branch → Upload → Move ref
//! - [`forge`] - The remote Git Data surface and its GitHub implementation
//! - [`core`] - Domain types and configuration
//! - [`ui`] - User-facing output
//!
//! # Guarantees
//!
//! 1. A branch only ever moves to a fully built commit
//! 2. Each deployment commit has exactly one parent: the branch's prior head
//! 3. Files absent from the archive are carried over from the parent tree
//! 4. Archives over the file limit are rejected before any object is written

pub mod cli;
pub mod core;
pub mod deploy;
pub mod forge;
pub mod ui;
