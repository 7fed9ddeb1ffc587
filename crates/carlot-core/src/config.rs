// ── Runtime client configuration ──
//
// These types describe *how* to reach the marketplace API and how the
// client-side layer behaves. They never touch disk; `carlot-config` (or a
// test) builds a `ClientConfig` and hands it to `AppContext::connect`.

use std::path::PathBuf;
use std::time::Duration;

use carlot_api::{TlsMode, TransportConfig};
use url::Url;

use crate::routes::RouteTable;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. Local development servers only.
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Everything `AppContext` needs to come up.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `https://cars.example.com/api`.
    pub api_url: Url,
    pub tls: TlsVerification,
    pub timeout: Duration,
    pub routes: RouteTable,
    /// Whether guarded views render while the session is still resolving.
    pub render_while_checking: bool,
    /// Directory for the persisted `auth_token` / `user` keys.
    /// `None` keeps the session in memory only.
    pub session_dir: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            routes: RouteTable::default(),
            render_while_checking: false,
            session_dir: None,
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: self.timeout,
            ..TransportConfig::default()
        }
    }
}
