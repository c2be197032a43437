//! deploy::upload
//!
//! Turns file entries into a single commit on top of a base commit.
//!
//! Blobs are uploaded with bounded concurrency. The tree is created only
//! after every blob upload has succeeded, and it overlays the base commit's
//! tree, so paths the archive does not mention are carried over unchanged.
//! A failure after some blobs were written leaves those blobs orphaned on
//! the remote; no ref is touched at this stage.

use chrono::{DateTime, SecondsFormat, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};

use super::DeployError;
use crate::core::types::{CommitObject, FileEntry, RepoName, TreeEntry};
use crate::forge::{GitData, RemoteError};

/// Creates blobs, a tree, and a commit.
pub struct ObjectUploader<'a> {
    remote: &'a dyn GitData,
    concurrency: usize,
    message_prefix: String,
}

impl<'a> ObjectUploader<'a> {
    pub fn new(remote: &'a dyn GitData, concurrency: usize, message_prefix: impl Into<String>) -> Self {
        Self {
            remote,
            concurrency: concurrency.max(1),
            message_prefix: message_prefix.into(),
        }
    }

    /// Upload `entries` and commit them with `base_commit_sha` as sole parent.
    pub async fn upload(
        &self,
        repo: &RepoName,
        base_commit_sha: &str,
        entries: &[FileEntry],
    ) -> Result<CommitObject, DeployError> {
        self.upload_at(repo, base_commit_sha, entries, Utc::now()).await
    }

    pub(crate) async fn upload_at(
        &self,
        repo: &RepoName,
        base_commit_sha: &str,
        entries: &[FileEntry],
        now: DateTime<Utc>,
    ) -> Result<CommitObject, DeployError> {
        let repo = repo.as_str();
        let base = self.remote.get_commit(repo, base_commit_sha).await?;

        tracing::info!(repo, files = entries.len(), concurrency = self.concurrency, "uploading blobs");
        let mut tree_entries: Vec<TreeEntry> = stream::iter(entries)
            .map(|entry| async move {
                let sha = self.remote.create_blob(repo, &entry.content).await?;
                tracing::debug!(path = %entry.path, %sha, "blob created");
                Ok::<_, RemoteError>(TreeEntry::file(entry.path.as_str(), sha))
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;
        tree_entries.sort_by(|a, b| a.path.cmp(&b.path));

        let tree_sha = self
            .remote
            .create_tree(repo, &base.tree_sha, &tree_entries)
            .await?;
        let message = deployment_message(&self.message_prefix, now);
        let sha = self
            .remote
            .create_commit(repo, &message, &tree_sha, base_commit_sha)
            .await?;
        tracing::info!(repo, commit = %sha, tree = %tree_sha, "commit created");

        Ok(CommitObject {
            sha,
            tree_sha,
            parent_sha: base_commit_sha.to_string(),
            message,
        })
    }
}

/// Commit message: the configured prefix plus a UTC timestamp.
///
/// # Example
///
/// ```
/// use bundlepush::deploy::upload::deployment_message;
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
/// assert_eq!(
///     deployment_message("Deploy from bundlepush", at),
///     "Deploy from bundlepush (2024-05-01T12:30:00.000Z)"
/// );
/// ```
pub fn deployment_message(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{} ({})", prefix, now.to_rfc3339_opts(SecondsFormat::Millis, true))
}
