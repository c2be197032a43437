//! deploy::archive
//!
//! Decodes an in-memory zip archive into the files to deploy.
//!
//! # Rules
//!
//! - Directory members are skipped.
//! - Paths are normalized: `\` becomes `/`, leading slashes are stripped.
//! - Empty paths and anything under `.git/` are dropped.
//! - Two members normalizing to the same path are rejected.
//! - Sensitive-looking paths produce a [`Warning`] but are still deployed.
//!
//! The file-count limit is checked from the central directory before any
//! member is decompressed.

use std::collections::HashSet;
use std::io::{Cursor, Read};

use zip::ZipArchive;

use super::DeployError;
use crate::core::types::{FileEntry, Warning};

/// Files and advisories extracted from one archive.
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub entries: Vec<FileEntry>,
    pub warnings: Vec<Warning>,
}

/// Pure archive decoder with a file-count bound.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveExtractor {
    max_files: usize,
}

impl ArchiveExtractor {
    pub fn new(max_files: usize) -> Self {
        Self { max_files }
    }

    /// Decode `raw` into normalized file entries.
    ///
    /// # Errors
    ///
    /// - `Validation` if the bytes are empty or not a readable archive,
    ///   if no file survives filtering, or if two members share a path
    /// - `LimitExceeded` if more than `max_files` files survive filtering
    pub fn extract(&self, raw: &[u8]) -> Result<Extracted, DeployError> {
        if raw.is_empty() {
            return Err(DeployError::Validation("archive is empty".into()));
        }

        let mut archive = ZipArchive::new(Cursor::new(raw))
            .map_err(|e| DeployError::Validation(format!("archive could not be read: {}", e)))?;

        let mut retained: Vec<(usize, String)> = Vec::new();
        let mut seen = HashSet::new();
        for index in 0..archive.len() {
            let member = archive.by_index_raw(index).map_err(|e| {
                DeployError::Validation(format!("archive could not be read: {}", e))
            })?;
            if member.is_dir() {
                continue;
            }
            let Some(path) = normalize_path(member.name()) else {
                continue;
            };
            if !seen.insert(path.clone()) {
                return Err(DeployError::Validation(format!(
                    "duplicate path in archive: {}",
                    path
                )));
            }
            retained.push((index, path));
        }

        if retained.is_empty() {
            return Err(DeployError::Validation("archive contains no files".into()));
        }
        if retained.len() > self.max_files {
            return Err(DeployError::LimitExceeded {
                count: retained.len(),
                limit: self.max_files,
            });
        }

        let mut extracted = Extracted::default();
        for (index, path) in retained {
            let mut member = archive.by_index(index).map_err(|e| {
                DeployError::Validation(format!("failed to read '{}': {}", path, e))
            })?;
            // The declared size comes from the archive itself; let the buffer grow from what is read.
            let mut content = Vec::new();
            member.read_to_end(&mut content).map_err(|e| {
                DeployError::Validation(format!("failed to read '{}': {}", path, e))
            })?;

            if let Some(reason) = sensitive_reason(&path) {
                tracing::warn!(%path, reason, "sensitive-looking file in archive");
                extracted.warnings.push(Warning {
                    path: path.clone(),
                    reason: reason.to_string(),
                });
            }
            extracted.entries.push(FileEntry { path, content });
        }

        tracing::debug!(
            files = extracted.entries.len(),
            warnings = extracted.warnings.len(),
            "archive extracted"
        );
        Ok(extracted)
    }
}

/// Normalize an archive member name into a deployable path.
///
/// Returns `None` for members that are not deployed: empty names,
/// directories spelled with a trailing separator, and `.git/` contents.
///
/// # Example
///
/// ```
/// use bundlepush::deploy::archive::normalize_path;
///
/// assert_eq!(normalize_path("\\site\\index.html").as_deref(), Some("site/index.html"));
/// assert_eq!(normalize_path("//a.txt").as_deref(), Some("a.txt"));
/// assert_eq!(normalize_path(".git/config"), None);
/// assert_eq!(normalize_path("/"), None);
/// ```
pub fn normalize_path(raw: &str) -> Option<String> {
    let path = raw.replace('\\', "/");
    let path = path.trim_start_matches('/');
    if path.is_empty() || path.ends_with('/') || path.starts_with(".git/") {
        return None;
    }
    Some(path.to_string())
}

/// Why a path looks like it holds secrets, if it does.
pub fn sensitive_reason(path: &str) -> Option<&'static str> {
    let lower = path.to_ascii_lowercase();
    if lower == ".env" || lower.ends_with("/.env") {
        Some("environment file")
    } else if lower.contains("id_rsa") {
        Some("SSH private key")
    } else if lower.contains("private_key") {
        Some("private key")
    } else if lower.contains("serviceaccount") {
        Some("service account credentials")
    } else if lower.ends_with(".p12") {
        Some("PKCS#12 keystore")
    } else {
        None
    }
}
