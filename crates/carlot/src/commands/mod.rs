//! Command dispatch: bridges CLI args -> hooks -> output formatting.

pub mod cars;
pub mod config_cmd;
pub mod inquiries;
pub mod requests;
pub mod session;
pub mod util;
pub mod watch;

use carlot_core::AppContext;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an API-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &AppContext, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => session::login(ctx, args, global).await,
        Command::Logout => session::logout(ctx, global).await,
        Command::Whoami => session::whoami(ctx, global).await,
        Command::Profile(args) => session::profile(ctx, args, global).await,
        Command::Cars(args) => cars::handle(ctx, args, global).await,
        Command::Inquiries(args) => inquiries::handle(ctx, args, global).await,
        Command::Requests(args) => requests::handle(ctx, args, global).await,
        Command::Watch(args) => watch::handle(ctx, args, global).await,
        // Config and Completions never reach the API
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(_) => Ok(()),
    }
}
