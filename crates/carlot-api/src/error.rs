use std::collections::BTreeMap;

use thiserror::Error;

/// Top-level error type for the `carlot-api` crate.
///
/// One variant per failure mode the transport can observe. `carlot-core`
/// folds these into its five-way error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// HTTP 401: the token is missing, expired, or revoked.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// HTTP 403: the token is valid but lacks access to the resource.
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    // ── Request rejected ────────────────────────────────────────────
    /// HTTP 404.
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// HTTP 400 / 422 with optional per-field reasons.
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, String>,
    },

    /// Any other 4xx (conflict, gone, too many requests, ...).
    #[error("Request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    // ── Server ──────────────────────────────────────────────────────
    /// HTTP 5xx.
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// The request never reached the server (DNS, refused, reset).
    #[error("Cannot reach {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Any other HTTP transport error.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A record id that cannot be one path segment (empty, `.` or `..`).
    #[error("Invalid path segment: {segment:?}")]
    InvalidPathSegment { segment: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the server definitively rejected the credentials.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::Forbidden { .. })
    }

    /// Returns `true` if the request may never have reached the server.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Unreachable { .. } | Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    /// The HTTP status carried by this error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Validation { .. } => Some(422),
            Self::Rejected { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_rejection_covers_401_and_403() {
        assert!(Error::Unauthorized { message: String::new() }.is_auth_rejection());
        assert!(Error::Forbidden { message: String::new() }.is_auth_rejection());
        assert!(!Error::Server { status: 500, message: String::new() }.is_auth_rejection());
    }

    #[test]
    fn unreachable_is_transient() {
        let err = Error::Unreachable {
            url: "http://localhost".into(),
            reason: "refused".into(),
        };
        assert!(err.is_transient());
        assert_eq!(err.status(), None);
    }
}
