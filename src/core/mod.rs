//! core
//!
//! Domain types and configuration.
//!
//! # Modules
//!
//! - [`types`] - Validated names and the deployment data model
//! - [`config`] - Configuration schema, loading and environment overrides

pub mod config;
pub mod types;
