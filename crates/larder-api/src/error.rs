use thiserror::Error;

/// Top-level error type for the `larder-api` crate.
///
/// Read paths (`fetch_*` collection and single-entity methods) absorb
/// these into safe defaults; mutation paths propagate them so callers
/// can show the user an actionable message. `larder-core` translates
/// these into its own domain variants at the boundary.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Backend responses ───────────────────────────────────────────
    /// Domain conflict: HTTP 409 with a problem-details body. The
    /// backend's `detail` is a human-readable message meant to be shown
    /// verbatim (e.g. "Milestone cannot be deleted while in use").
    #[error("Conflict ({title}): {detail}")]
    Conflict {
        title: String,
        detail: String,
        status: u16,
    },

    /// Any other non-2xx response, parsed from the `{detail, title,
    /// status}` JSON body when present.
    #[error("API error (HTTP {status}): {detail}")]
    Api {
        status: u16,
        title: Option<String>,
        detail: String,
    },

    // ── Client-side ─────────────────────────────────────────────────
    /// Request rejected before any network call was made.
    #[error("Validation failed: {message}")]
    Validation { message: String },
}

impl Error {
    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the backend rejected the operation with a
    /// domain conflict rather than a technical failure.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Best user-facing message: the backend-provided `detail` when
    /// available, the error's own rendering otherwise.
    pub fn detail(&self) -> String {
        match self {
            Self::Conflict { detail, .. } | Self::Api { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Conflict { status, .. } | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
