use std::sync::Arc;

use arc_swap::ArcSwapOption;
use carlot_api::TokenSource;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::storage::{MemoryStorage, SessionStorage, TOKEN_KEY, USER_KEY};
use crate::error::CoreError;
use crate::gateway::ProfileApi;
use crate::model::{Role, UserProfile};

/// What the route guard sees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<Arc<UserProfile>>,
    pub is_authenticated: bool,
    /// A persisted session exists but has not been verified yet.
    pub is_loading: bool,
}

impl SessionState {
    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }
}

/// Result of re-validating the token against the profile endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Token accepted; user refreshed.
    Verified(Arc<UserProfile>),
    /// Server rejected the token (401/403); session cleared.
    Rejected,
    /// Network or server failure; stale session kept.
    Unreachable,
    /// Nothing to verify.
    NoSession,
    /// The token changed while the check was in flight; result ignored.
    Superseded,
}

/// Owner of the auth token and cached user.
///
/// Loaded once from storage at start, then mutated only by login, logout,
/// refresh and storage re-reads.
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    token: ArcSwapOption<SecretString>,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    /// Restore whatever `storage` holds. A restored token leaves the
    /// session in the loading state until `refresh` runs.
    pub fn load(storage: Arc<dyn SessionStorage>) -> Self {
        let token = storage.get(TOKEN_KEY).map(|t| Arc::new(SecretString::from(t)));
        let user = token.as_ref().and_then(|_| read_user(storage.as_ref()));
        let state = SessionState {
            is_authenticated: token.is_some() && user.is_some(),
            is_loading: token.is_some(),
            user,
        };
        debug!(
            has_token = token.is_some(),
            has_user = state.user.is_some(),
            "session restored"
        );

        let (state, _) = watch::channel(state);
        Self {
            storage,
            token: ArcSwapOption::new(token),
            state,
        }
    }

    pub fn in_memory() -> Self {
        Self::load(Arc::new(MemoryStorage::new()))
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn token(&self) -> Option<SecretString> {
        self.token.load_full().map(|t| SecretString::clone(&t))
    }

    pub fn has_token(&self) -> bool {
        self.token.load().is_some()
    }

    pub fn user(&self) -> Option<Arc<UserProfile>> {
        self.state.borrow().user.clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.state.borrow().role()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    /// Receiver that wakes on every session change.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    // ── Mutators ─────────────────────────────────────────────────────

    pub fn set_token(&self, token: SecretString) {
        if let Err(e) = self.storage.set(TOKEN_KEY, token.expose_secret()) {
            warn!(error = %e, "failed to persist auth token");
        }
        self.token.store(Some(Arc::new(token)));
        self.update(|_| {});
    }

    pub fn set_user(&self, user: UserProfile) -> Arc<UserProfile> {
        match serde_json::to_string(&user) {
            Ok(json) => {
                if let Err(e) = self.storage.set(USER_KEY, &json) {
                    warn!(error = %e, "failed to persist user");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode user"),
        }
        let user = Arc::new(user);
        let stored = Arc::clone(&user);
        self.update(move |s| s.user = Some(stored));
        user
    }

    /// Drop token and user from memory and storage. Returns `true` if there
    /// was anything to drop.
    pub fn clear(&self) -> bool {
        let had_session = self.token.swap(None).is_some() || self.state.borrow().user.is_some();
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "failed to remove persisted session key");
            }
        }
        self.update(|s| {
            s.user = None;
            s.is_loading = false;
        });
        if had_session {
            debug!("session cleared");
        }
        had_session
    }

    // ── Server round-trips ───────────────────────────────────────────

    /// Re-validate the token with the profile endpoint.
    ///
    /// 401/403 clears the session. Any other failure keeps the stale
    /// session and surfaces nothing; if no user could be restored the
    /// session stays loading, so guards keep checking rather than deny.
    pub async fn refresh(&self, api: &dyn ProfileApi) -> RefreshOutcome {
        let Some(checked) = self.token.load_full() else {
            self.update(|s| s.is_loading = false);
            return RefreshOutcome::NoSession;
        };

        let result = api.current_user().await;

        let current = self.token.load_full();
        if !current.as_ref().is_some_and(|t| Arc::ptr_eq(t, &checked)) {
            debug!("token changed during refresh; ignoring result");
            return RefreshOutcome::Superseded;
        }

        match result {
            Ok(user) => {
                let user = self.set_user(user);
                self.update(|s| s.is_loading = false);
                RefreshOutcome::Verified(user)
            }
            Err(e) if e.is_auth() => {
                debug!(error = %e, "token rejected");
                self.clear();
                RefreshOutcome::Rejected
            }
            Err(e) => {
                warn!(error = %e, "session refresh failed; keeping stale session");
                // A kept token with no readable user stays unverified.
                self.update(|s| s.is_loading = s.user.is_none());
                RefreshOutcome::Unreachable
            }
        }
    }

    /// Exchange credentials for a token and persist both token and user.
    pub async fn login(
        &self,
        api: &dyn ProfileApi,
        email: &str,
        password: &SecretString,
    ) -> Result<Arc<UserProfile>, CoreError> {
        let resp = api.login(email, password).await?;
        self.set_token(SecretString::from(resp.token));
        let user = self.set_user(resp.user);
        self.update(|s| s.is_loading = false);
        debug!(user = %user.email, role = %user.role, "signed in");
        Ok(user)
    }

    /// Best-effort server logout, then clear locally regardless.
    pub async fn logout(&self, api: &dyn ProfileApi) {
        if self.has_token() {
            if let Err(e) = api.logout().await {
                warn!(error = %e, "server logout failed; clearing local session anyway");
            }
        }
        self.clear();
    }

    /// Re-read both keys after another process or tab changed them.
    /// Returns `true` if the in-memory session changed.
    pub fn sync_from_storage(&self) -> bool {
        let stored = self.storage.get(TOKEN_KEY);
        let current = self.token();
        let same_token = match (&stored, &current) {
            (None, None) => true,
            (Some(a), Some(b)) => a.as_str() == b.expose_secret(),
            _ => false,
        };
        let user = stored.as_ref().and_then(|_| read_user(self.storage.as_ref()));
        let same_user = self.state.borrow().user == user;

        if same_token && same_user {
            return false;
        }

        if !same_token {
            self.token
                .store(stored.map(|t| Arc::new(SecretString::from(t))));
        }
        self.update(move |s| {
            s.user = user;
            s.is_loading = false;
        });
        debug!(same_token, same_user, "session re-read from storage");
        true
    }

    /// Apply `f` and recompute `is_authenticated`; notify only on change.
    fn update(&self, f: impl FnOnce(&mut SessionState)) {
        let has_token = self.has_token();
        self.state.send_if_modified(|s| {
            let before = s.clone();
            f(s);
            s.is_authenticated = has_token && s.user.is_some();
            *s != before
        });
    }
}

impl TokenSource for SessionStore {
    fn bearer_token(&self) -> Option<SecretString> {
        self.token()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.state.borrow();
        f.debug_struct("SessionStore")
            .field("has_token", &self.has_token())
            .field("user", &s.user.as_ref().map(|u| u.email.as_str()))
            .field("is_loading", &s.is_loading)
            .finish_non_exhaustive()
    }
}

fn read_user(storage: &dyn SessionStorage) -> Option<Arc<UserProfile>> {
    let raw = storage.get(USER_KEY)?;
    match serde_json::from_str::<UserProfile>(&raw) {
        Ok(user) => Some(Arc::new(user)),
        Err(e) => {
            warn!(error = %e, "ignoring unreadable persisted user");
            None
        }
    }
}
