//! forge
//!
//! Access to a remote Git host's low-level object API.
//!
//! # Modules
//!
//! - `traits`: the [`GitData`] trait and its request/response types
//! - [`github`]: GitHub REST implementation
//! - [`mock`]: in-memory implementation for deterministic testing
//!
//! The deployment pipeline only sees `&dyn GitData`, so the GitHub client
//! and the mock are interchangeable.

pub mod github;
pub mod mock;
mod traits;

pub use github::GitHubClient;
pub use traits::*;
