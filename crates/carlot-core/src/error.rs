// ── Core error types ──
//
// User-facing errors from carlot-core. Consumers never see raw HTTP
// plumbing; the `From<carlot_api::Error>` impl translates transport errors
// into domain variants, and `CoreError::kind` folds every variant into the
// five-way taxonomy that drives cache and session behavior.

use std::collections::BTreeMap;

use strum::Display;
use thiserror::Error;

use crate::model::{EntityId, EntityKind};

/// Coarse classification of a failure.
///
/// - `Network`: the request never reached the server.
/// - `Server`: the server failed (5xx) or answered with garbage.
/// - `Auth`: 401/403; tears the session down.
/// - `Validation`: the request was rejected; goes back to the caller.
/// - `NotFound`: 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Server,
    Auth,
    Validation,
    NotFound,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Network ──────────────────────────────────────────────────────
    #[error("Cannot reach server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Server ───────────────────────────────────────────────────────
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected response from server: {message}")]
    InvalidResponse { message: String },

    // ── Auth ─────────────────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Not signed in")]
    NotAuthenticated,

    // ── Not found ────────────────────────────────────────────────────
    #[error("Not found: {identifier}")]
    NotFound { identifier: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed {
        message: String,
        fields: BTreeMap<String, String>,
    },

    #[error("{entity} {id} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: EntityKind,
        id: EntityId,
        from: String,
        to: String,
    },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The single classifier every hook consults.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } => ErrorKind::Network,
            Self::Server { .. } | Self::InvalidResponse { .. } | Self::Internal(_) => {
                ErrorKind::Server
            }
            Self::AuthenticationFailed { .. }
            | Self::PermissionDenied { .. }
            | Self::NotAuthenticated => ErrorKind::Auth,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ValidationFailed { .. } | Self::InvalidTransition { .. } => {
                ErrorKind::Validation
            }
        }
    }

    pub fn is_auth(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }

    /// Per-field reasons for a validation failure, if the server sent any.
    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::ValidationFailed { fields, .. } if !fields.is_empty() => Some(fields),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<carlot_api::Error> for CoreError {
    fn from(err: carlot_api::Error) -> Self {
        use carlot_api::Error as Api;

        match err {
            Api::Unauthorized { message } => CoreError::AuthenticationFailed { message },
            Api::Forbidden { message } => CoreError::PermissionDenied { message },
            Api::NotFound { path } => CoreError::NotFound { identifier: path },
            Api::Validation { message, fields } => CoreError::ValidationFailed { message, fields },
            Api::Rejected { status, message } => CoreError::ValidationFailed {
                message: format!("{message} (HTTP {status})"),
                fields: BTreeMap::new(),
            },
            Api::Server { status, message } => CoreError::Server { status, message },
            Api::Unreachable { url, reason } => CoreError::ConnectionFailed { url, reason },
            Api::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            Api::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() || e.is_request() {
                    CoreError::ConnectionFailed {
                        url: e.url().map(ToString::to_string).unwrap_or_default(),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Server {
                        status: e.status().map_or(0, |s| s.as_u16()),
                        message: e.to_string(),
                    }
                }
            }
            Api::InvalidPathSegment { segment } => CoreError::ValidationFailed {
                message: format!("invalid id {segment:?}"),
                fields: std::iter::once(("id".to_owned(), "not a valid record id".to_owned()))
                    .collect(),
            },
            Api::InvalidUrl(e) => CoreError::Internal(format!("Invalid URL: {e}")),
            Api::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            Api::Deserialization { message, body: _ } => CoreError::InvalidResponse { message },
        }
    }
}
