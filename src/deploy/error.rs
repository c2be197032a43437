//! deploy::error
//!
//! Error taxonomy for deployments.
//!
//! Every failure carries a [`ErrorKind`] so callers branch on the kind, not on
//! message text. Upstream failures keep the remote's status and body so
//! operators can diagnose permission and scope problems.

use serde::Serialize;
use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::types::TypeError;
use crate::forge::{RemoteError, ResponseBody};

/// Broad failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Authorization,
    Validation,
    LimitExceeded,
    Upstream,
}

impl ErrorKind {
    /// Process exit status for a command that failed with this kind.
    ///
    /// 1 is left for unclassified failures and 2 for usage errors.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Configuration => 3,
            ErrorKind::Authorization => 4,
            ErrorKind::Validation => 5,
            ErrorKind::LimitExceeded => 6,
            ErrorKind::Upstream => 7,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Validation => "validation",
            ErrorKind::LimitExceeded => "limit_exceeded",
            ErrorKind::Upstream => "upstream",
        };
        f.write_str(name)
    }
}

/// Errors from a deployment or provisioning run.
#[derive(Debug, Clone, Error)]
pub enum DeployError {
    /// Missing credentials or owner identity.
    #[error("{0}")]
    Configuration(String),

    /// Request-level credential mismatch.
    #[error("Unauthorized: {0}")]
    Authorization(String),

    /// Bad repository/branch name or unusable archive.
    #[error("{0}")]
    Validation(String),

    /// Too many files in one archive.
    #[error("Too many files ({count}). Limit {limit}.")]
    LimitExceeded { count: usize, limit: usize },

    /// Any other failure reported by, or talking to, the remote.
    #[error("{message}")]
    Upstream {
        /// Remote HTTP status; `None` when the remote never answered
        status: Option<u16>,
        message: String,
        detail: Option<ResponseBody>,
    },
}

impl DeployError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeployError::Configuration(_) => ErrorKind::Configuration,
            DeployError::Authorization(_) => ErrorKind::Authorization,
            DeployError::Validation(_) => ErrorKind::Validation,
            DeployError::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            DeployError::Upstream { .. } => ErrorKind::Upstream,
        }
    }

    /// HTTP-equivalent status for this failure.
    ///
    /// Upstream errors reuse the remote's status; transport failures map to 502.
    pub fn status_code(&self) -> u16 {
        match self {
            DeployError::Configuration(_) => 500,
            DeployError::Authorization(_) => 401,
            DeployError::Validation(_) => 400,
            DeployError::LimitExceeded { .. } => 413,
            DeployError::Upstream { status, .. } => status.unwrap_or(502),
        }
    }

    /// Remote-provided detail, forwarded unmodified.
    pub fn details(&self) -> Option<&ResponseBody> {
        match self {
            DeployError::Upstream { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }

    /// Build an upstream error that did not come from a remote response.
    pub(crate) fn upstream(status: u16, message: impl Into<String>) -> Self {
        DeployError::Upstream {
            status: Some(status),
            message: message.into(),
            detail: None,
        }
    }

    /// JSON payload for the caller.
    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: self.to_string(),
            kind: self.kind(),
            status: self.status_code(),
            details: self.details().filter(|d| !d.is_empty()).cloned(),
        }
    }
}

impl From<RemoteError> for DeployError {
    fn from(e: RemoteError) -> Self {
        let status = e.status();
        let detail = e.body().cloned();
        let message = match e {
            RemoteError::NotFound { message, .. } | RemoteError::Status { message, .. } => message,
            other => other.to_string(),
        };
        DeployError::Upstream {
            status,
            message,
            detail,
        }
    }
}

impl From<ConfigError> for DeployError {
    fn from(e: ConfigError) -> Self {
        DeployError::Configuration(e.to_string())
    }
}

impl From<TypeError> for DeployError {
    fn from(e: TypeError) -> Self {
        DeployError::Validation(e.to_string())
    }
}

/// Failure payload: `{ error, kind, status, details }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub kind: ErrorKind,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ResponseBody>,
}
