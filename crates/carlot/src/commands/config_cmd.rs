//! Config subcommand handlers.

use dialoguer::{Confirm, Input};

use carlot_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn parse_flag(field: &str, value: &str) -> Result<bool, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: "must be 'true' or 'false'".into(),
    })
}

/// Apply one `key = value` to a profile.
fn set_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "api_url" | "api-url" => {
            value.parse::<url::Url>().map_err(|_| CliError::Validation {
                field: "api_url".into(),
                reason: format!("invalid URL: {value}"),
            })?;
            profile.api_url = value;
        }
        "insecure" => profile.insecure = Some(parse_flag("insecure", &value)?),
        "render_while_checking" | "render-while-checking" => {
            profile.render_while_checking = Some(parse_flag("render_while_checking", &value)?);
        }
        "timeout" => {
            profile.timeout = Some(value.parse().map_err(|_| CliError::Validation {
                field: "timeout".into(),
                reason: "must be a number (seconds)".into(),
            })?);
        }
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "session_dir" | "session-dir" => profile.session_dir = Some(value.into()),
        "routes.login" => profile.routes.login = value,
        "routes.buyer_home" => profile.routes.buyer_home = value,
        "routes.dealer_home" => profile.routes.dealer_home = value,
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: api_url, insecure, timeout, \
                     ca_cert, session_dir, render_while_checking, routes.login, \
                     routes.buyer_home, routes.dealer_home"
                ),
            });
        }
    }
    Ok(())
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("carlot configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let api_url: String = Input::new()
                .with_prompt("API URL")
                .default("http://localhost:5000/api".into())
                .interact_text()
                .map_err(prompt_err)?;

            let insecure = Confirm::new()
                .with_prompt("Accept self-signed certificates?")
                .default(false)
                .interact()
                .map_err(prompt_err)?;

            let mut profile = Profile::new(String::new());
            set_key(&mut profile, "api_url", api_url)?;
            if insecure {
                profile.insecure = Some(true);
            }

            let mut cfg = config::load_config_or_default();
            cfg.default_profile = Some(profile_name.clone());
            cfg.profiles.insert(profile_name.clone(), profile);
            let path = config::save_config(&cfg)?;

            eprintln!("\nConfiguration written to {}", path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Next: carlot login");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(
                &global.output,
                &cfg,
                |c: &Config| format!("{c:#?}"),
                |_| "config".into(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg
                .profiles
                .entry(profile_name.clone())
                .or_insert_with(|| Profile::new(String::new()));
            set_key(profile, &key, value)?;
            config::save_config(&cfg)?;
            output::notice(&format!("Set {key} on profile '{profile_name}'"), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}
