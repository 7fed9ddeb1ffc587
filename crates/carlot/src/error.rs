//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use carlot_config::ConfigError;
use carlot_core::{CoreError, RequiredRole, Role};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the marketplace API at {url}")]
    #[diagnostic(
        code(carlot::connection_failed),
        help(
            "Check that the API is running and reachable: {reason}\n\
             Self-signed development server? Try --insecure."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(carlot::timeout),
        help("Increase timeout with --timeout or check server responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Session ──────────────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(carlot::auth_failed),
        help("Your session may have expired. Sign in again with: carlot login")
    )]
    AuthFailed { message: String },

    #[error("Could not verify the stored session")]
    #[diagnostic(
        code(carlot::session_unverified),
        help("The API could not be reached to check your sign-in. Try again when it is up.")
    )]
    SessionUnverified,

    #[error("Not signed in")]
    #[diagnostic(code(carlot::not_signed_in), help("Sign in with: carlot login"))]
    NotSignedIn,

    #[error("This command is for {required} accounts; you are signed in as a {actual}")]
    #[diagnostic(code(carlot::wrong_role))]
    WrongRole { required: RequiredRole, actual: Role },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Not found: {identifier}")]
    #[diagnostic(code(carlot::not_found))]
    NotFound { identifier: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(carlot::validation))]
    Validation { field: String, reason: String },

    #[error("{message}")]
    #[diagnostic(code(carlot::rejected), help("{help}"))]
    Rejected { message: String, help: String },

    #[error("Server error: {message}")]
    #[diagnostic(code(carlot::server))]
    Server { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(carlot::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: carlot config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No API URL configured")]
    #[diagnostic(
        code(carlot::no_config),
        help(
            "Create a profile with: carlot config init\n\
             Or pass --api-url / set CARLOT_API_URL.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(carlot::config))]
    Config(#[from] ConfigError),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::SessionUnverified => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NotSignedIn => exit_code::AUTH,
            Self::WrongRole { .. } => exit_code::PERMISSION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::Rejected { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<&CoreError> for CliError {
    fn from(err: &CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed {
                url: url.clone(),
                reason: reason.clone(),
            },
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: *timeout_secs,
            },
            CoreError::AuthenticationFailed { message } | CoreError::PermissionDenied { message } => {
                Self::AuthFailed {
                    message: message.clone(),
                }
            }
            CoreError::NotAuthenticated => Self::NotSignedIn,
            CoreError::NotFound { identifier } => Self::NotFound {
                identifier: identifier.clone(),
            },
            CoreError::ValidationFailed { message, fields } => match fields.iter().next() {
                Some((field, reason)) if fields.len() == 1 => Self::Validation {
                    field: field.clone(),
                    reason: reason.clone(),
                },
                _ => Self::Rejected {
                    message: message.clone(),
                    help: fields
                        .iter()
                        .map(|(field, reason)| format!("{field}: {reason}"))
                        .collect::<Vec<_>>()
                        .join("\n"),
                },
            },
            CoreError::InvalidTransition { .. } => Self::Rejected {
                message: err.to_string(),
                help: "Check the current status with the matching `get` or `list` command.".into(),
            },
            CoreError::Server { .. } | CoreError::InvalidResponse { .. } | CoreError::Internal(_) => {
                Self::Server {
                    message: err.to_string(),
                }
            }
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        Self::from(&err)
    }
}
