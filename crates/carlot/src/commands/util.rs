//! Shared helpers for command handlers.

use tracing::debug;

use carlot_core::{
    AppContext, DenyReason, EntityId, FetchOutcome, GuardOptions, GuardState, Navigator,
};

use crate::error::CliError;

/// Navigator for a one-shot process: there is no router, so a redirect
/// is only logged. The command itself reports the outcome.
#[derive(Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: &str) {
        debug!(route, "redirect");
    }
}

/// Gate a command the way a view is gated: resolve a restored session
/// first, then classify without redirecting.
pub async fn authorize(ctx: &AppContext, options: GuardOptions) -> Result<(), CliError> {
    if ctx.session().state().is_loading {
        let outcome = ctx.refresh_session().await;
        debug!(?outcome, "restored session checked");
    }

    let guard = ctx.guard(options.skip_redirect());
    match guard.evaluate(&ctx.session().state()) {
        GuardState::Granted => Ok(()),
        GuardState::Denied(DenyReason::WrongRole { actual }) => Err(CliError::WrongRole {
            required: options.role,
            actual,
        }),
        // Still checking after a refresh: the server could not be reached.
        GuardState::Checking => Err(CliError::SessionUnverified),
        GuardState::Denied(DenyReason::Unauthenticated) => Err(CliError::NotSignedIn),
    }
}

/// Turn a failed fetch into an error; everything else is fine.
pub fn check(outcome: &FetchOutcome) -> Result<(), CliError> {
    match outcome.error() {
        Some(err) => Err(CliError::from(err.as_ref())),
        None => Ok(()),
    }
}

pub fn entity_id(raw: &str) -> EntityId {
    EntityId::from(raw)
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Blank cells for missing optional values.
pub fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
