//! Shared configuration for carlot front-ends.
//!
//! TOML profiles, `CARLOT_` environment overrides, and translation to
//! `carlot_core::ClientConfig`. The CLI layers its own flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use carlot_core::{ClientConfig, RouteTable, TlsVerification};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named API profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: explicit choice, then `default_profile`,
    /// then `"default"`.
    pub fn profile_name<'a>(&'a self, explicit: Option<&'a str>) -> &'a str {
        explicit
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub render_while_checking: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            render_while_checking: false,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named API profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// API root (e.g., "https://cars.example.com/api").
    pub api_url: String,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Role landing routes and the login route.
    #[serde(default)]
    pub routes: RouteTable,

    /// Where `auth_token` and `user` are persisted for this profile.
    pub session_dir: Option<PathBuf>,

    /// Override `defaults.render_while_checking`.
    pub render_while_checking: Option<bool>,
}

impl Profile {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ca_cert: None,
            insecure: None,
            timeout: None,
            routes: RouteTable::default(),
            session_dir: None,
            render_while_checking: None,
        }
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "carlot", "carlot")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Base directory for persisted sessions; one subdirectory per profile.
pub fn session_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share").join("sessions"),
        |dirs| dirs.data_dir().join("sessions"),
    )
}

fn dirs_fallback(sub: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(sub);
    p.push("carlot");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_at(&config_path())
}

/// Load from an explicit file. Missing files fall back to defaults;
/// `CARLOT_` variables override both (`__` separates nested keys, e.g.
/// `CARLOT_DEFAULTS__TIMEOUT=5`).
pub fn load_config_at(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CARLOT_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_at(cfg, &path)?;
    Ok(path)
}

pub fn save_config_at(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `ClientConfig` from a profile plus global defaults.
pub fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    let api_url: url::Url = profile
        .api_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("invalid URL: {}", profile.api_url),
        })?;

    if !matches!(api_url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("expected http or https, got '{}'", api_url.scheme()),
        });
    }

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut config = ClientConfig::new(api_url);
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.routes = profile.routes.clone();
    config.render_while_checking = profile
        .render_while_checking
        .unwrap_or(defaults.render_while_checking);
    config.session_dir = Some(
        profile
            .session_dir
            .clone()
            .unwrap_or_else(|| session_dir().join(profile_name)),
    );
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
default_profile = "staging"

[defaults]
timeout = 12

[profiles.staging]
api_url = "https://staging.example.com/api"
render_while_checking = true

[profiles.staging.routes]
dealer_home = "/dealer/dashboard"

[profiles.local]
api_url = "http://localhost:5000/api"
insecure = true
session_dir = "/tmp/carlot-local"
"#;

    fn write_sample(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        path
    }

    #[test]
    fn loads_profiles_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_at(&write_sample(&dir)).unwrap();

        assert_eq!(cfg.profile_name(None), "staging");
        assert_eq!(cfg.profile_name(Some("local")), "local");
        assert_eq!(cfg.defaults.timeout, 12);
        assert_eq!(cfg.defaults.output, "table");
        assert_eq!(cfg.profiles.len(), 2);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_at(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn unknown_profile_is_reported() {
        let cfg = Config::default();
        let err = cfg.profile("prod").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile { ref name } if name == "prod"));
    }

    #[test]
    fn profile_translates_to_client_config() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_at(&write_sample(&dir)).unwrap();
        let client =
            profile_to_client_config(cfg.profile("staging").unwrap(), "staging", &cfg.defaults)
                .unwrap();

        assert_eq!(client.api_url.as_str(), "https://staging.example.com/api");
        assert_eq!(client.tls, TlsVerification::SystemDefaults);
        assert_eq!(client.timeout, Duration::from_secs(12));
        assert!(client.render_while_checking);
        assert_eq!(client.routes.dealer_home, "/dealer/dashboard");
        assert_eq!(client.routes.buyer_home, "/buyer/home");
        assert_eq!(client.session_dir, Some(session_dir().join("staging")));
    }

    #[test]
    fn insecure_profile_and_explicit_session_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_at(&write_sample(&dir)).unwrap();
        let client =
            profile_to_client_config(cfg.profile("local").unwrap(), "local", &cfg.defaults)
                .unwrap();

        assert_eq!(client.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(client.session_dir, Some(PathBuf::from("/tmp/carlot-local")));
    }

    #[test]
    fn rejects_bad_urls() {
        let defaults = Defaults::default();
        let err = profile_to_client_config(&Profile::new("not a url"), "x", &defaults).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "api_url"));

        let err =
            profile_to_client_config(&Profile::new("ftp://cars.example.com"), "x", &defaults)
                .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn save_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        let mut profile = Profile::new("https://cars.example.com/api");
        profile.timeout = Some(5);
        cfg.profiles.insert("default".into(), profile);
        save_config_at(&cfg, &path).unwrap();

        let loaded = load_config_at(&path).unwrap();
        let profile = loaded.profile("default").unwrap();
        assert_eq!(profile.api_url, "https://cars.example.com/api");
        assert_eq!(profile.timeout, Some(5));
        assert_eq!(profile.routes, RouteTable::default());
    }
}
