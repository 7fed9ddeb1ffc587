//! CLI-aware configuration: profiles from `carlot-config`, then global
//! flag overrides on top.

use std::time::Duration;

use carlot_config::{Config, Profile};
use carlot_core::{ClientConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use carlot_config::{config_path, load_config_or_default, save_config};

/// Resolve the active profile name: `--profile`, then config default.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    cfg.profile_name(global.profile.as_deref()).to_owned()
}

/// Build a `ClientConfig` from the config file, profile, and CLI overrides.
pub fn build_client_config(global: &GlobalOpts) -> Result<ClientConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let profile = match (cfg.profiles.get(&profile_name), &global.api_url) {
        (Some(profile), _) => profile.clone(),
        // No profile -- flags / env alone
        (None, Some(url)) => Profile::new(url.clone()),
        (None, None) if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    let mut client = carlot_config::profile_to_client_config(&profile, &profile_name, &cfg.defaults)?;
    apply_overrides(&mut client, global)?;
    Ok(client)
}

fn apply_overrides(client: &mut ClientConfig, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(ref url) = global.api_url {
        client.api_url = url.parse().map_err(|_| CliError::Validation {
            field: "api-url".into(),
            reason: format!("invalid URL: {url}"),
        })?;
    }
    if global.insecure {
        client.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        client.timeout = Duration::from_secs(secs);
    }
    if let Some(ref dir) = global.session_dir {
        client.session_dir = Some(dir.clone());
    }
    Ok(())
}

fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
