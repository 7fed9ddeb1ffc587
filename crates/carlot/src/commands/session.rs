//! Sign-in, sign-out and profile handlers.

use dialoguer::Input;
use secrecy::SecretString;

use carlot_core::{AppContext, GuardOptions, ProfileHook, ProfilePatch, UserProfile};

use crate::cli::{GlobalOpts, LoginArgs, ProfileArgs, ProfileCommand};
use crate::error::CliError;
use crate::output;

use super::util;

fn profile_detail(user: &UserProfile) -> String {
    let mut pairs = vec![
        ("ID", user.id.to_string()),
        ("Name", user.display_name()),
        ("Email", user.email.clone()),
        ("Role", user.role.to_string()),
        ("Phone", util::opt(user.phone.as_deref())),
    ];
    if let Some(ref dealer) = user.dealer {
        pairs.push(("Business", dealer.business_name.clone()));
        pairs.push(("Website", util::opt(dealer.website.as_deref())));
    }
    if let Some(ref buyer) = user.buyer {
        pairs.push(("Budget", util::opt(buyer.budget_max)));
        pairs.push(("Makes", buyer.preferred_makes.join(", ")));
    }
    output::detail_lines(&pairs)
}

fn print_profile(user: &UserProfile, global: &GlobalOpts) {
    let out = output::render_single(&global.output, user, profile_detail, |u| u.id.to_string());
    output::print_output(&out, global.quiet);
}

pub async fn login(ctx: &AppContext, args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let email = match args.email {
        Some(email) => email,
        None => Input::new()
            .with_prompt("Email")
            .interact_text()
            .map_err(|e| CliError::Io(std::io::Error::other(e)))?,
    };
    let password = match args.password {
        Some(pw) => pw,
        None => rpassword::prompt_password("Password: ")?,
    };
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }

    let home = ctx.login(&email, &SecretString::from(password)).await?;
    if let Some(user) = ctx.session().user() {
        output::notice(
            &format!("Signed in as {} ({}) -> {home}", user.display_name(), user.role),
            global.quiet,
        );
    }
    Ok(())
}

pub async fn logout(ctx: &AppContext, global: &GlobalOpts) -> Result<(), CliError> {
    if !ctx.session().has_token() {
        output::notice("Not signed in", global.quiet);
        return Ok(());
    }
    ctx.logout().await;
    output::notice("Signed out", global.quiet);
    Ok(())
}

pub async fn whoami(ctx: &AppContext, global: &GlobalOpts) -> Result<(), CliError> {
    util::authorize(ctx, GuardOptions::authenticated()).await?;
    let hook = ProfileHook::new(ctx);
    util::check(&hook.fetch().await)?;
    let user = hook.profile().ok_or(CliError::NotSignedIn)?;
    print_profile(&user, global);
    Ok(())
}

pub async fn profile(ctx: &AppContext, args: ProfileArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::authorize(ctx, GuardOptions::authenticated()).await?;
    match args.command {
        ProfileCommand::Update {
            first_name,
            last_name,
            phone,
        } => {
            let patch = ProfilePatch {
                first_name,
                last_name,
                phone,
                ..ProfilePatch::default()
            };
            let hook = ProfileHook::new(ctx);
            let user = hook.update(&patch).await?;
            print_profile(&user, global);
            Ok(())
        }
    }
}
