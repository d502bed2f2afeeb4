// ── Core error types ──
//
// User-facing errors from larder-core. Consumers never see raw reqwest
// errors or JSON parse failures directly — the `From<larder_api::Error>`
// impl translates transport-layer errors into domain variants once, at
// the boundary, instead of call sites re-inspecting loose error shapes.

use thiserror::Error;

use crate::cache::ErrorInfo;

/// Unified error type for the synchronization layer.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// Client-side rejection before any network call.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// Business-rule rejection (HTTP 409). `detail` is the backend's
    /// human-readable message, meant to be shown verbatim.
    #[error("Conflict ({title}): {detail}")]
    Conflict {
        title: String,
        detail: String,
        status: u16,
    },

    /// The requested entity does not exist.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Any other backend rejection.
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    /// Network-level failure (unreachable, timeout, TLS).
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Message suitable for a user-facing notification: the backend's
    /// `detail` when present, otherwise the supplied action-specific
    /// fallback (e.g. "Failed to delete milestone").
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Conflict { detail, .. } => detail.clone(),
            Self::Validation { message } => message.clone(),
            _ => fallback.to_owned(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub(crate) fn from_info(info: ErrorInfo) -> Self {
        if info.conflict {
            return Self::Conflict {
                title: info.title.unwrap_or_else(|| "Conflict".into()),
                detail: info.detail.unwrap_or(info.message),
                status: info.status.unwrap_or(409),
            };
        }
        Self::Api {
            message: info.detail.unwrap_or(info.message),
            status: info.status,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<larder_api::Error> for SyncError {
    fn from(err: larder_api::Error) -> Self {
        match err {
            larder_api::Error::Validation { message } => Self::Validation { message },
            larder_api::Error::Conflict {
                title,
                detail,
                status,
            } => Self::Conflict {
                title,
                detail,
                status,
            },
            larder_api::Error::Api {
                status: 404,
                detail,
                ..
            } => Self::NotFound { message: detail },
            larder_api::Error::Api { status, detail, .. } => Self::Api {
                message: detail,
                status: Some(status),
            },
            larder_api::Error::Transport(e) => Self::Transport {
                message: e.to_string(),
            },
            larder_api::Error::InvalidUrl(e) => Self::Internal(format!("invalid URL: {e}")),
            larder_api::Error::Deserialization { message, .. } => {
                Self::Internal(format!("deserialization error: {message}"))
            }
        }
    }
}
