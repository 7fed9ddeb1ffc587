// ── Route guard ──
//
// Gates a view on session state and a required role. Classification is a
// pure function; `RouteGuard` adds the redirect-once side effect on top.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use strum::Display;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::model::Role;
use crate::routes::RouteTable;
use crate::session::SessionState;

/// Performs redirects. In a UI this is the router; the CLI records the
/// destination and exits.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Navigator that goes nowhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNavigation;

impl Navigator for NoNavigation {
    fn navigate(&self, route: &str) {
        debug!(route, "navigation ignored");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RequiredRole {
    #[default]
    Any,
    Buyer,
    Dealer,
}

impl RequiredRole {
    fn admits(self, role: Role) -> bool {
        match self {
            Self::Any => true,
            Self::Buyer => role == Role::Buyer,
            Self::Dealer => role == Role::Dealer,
        }
    }
}

impl From<Role> for RequiredRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Buyer => Self::Buyer,
            Role::Dealer => Self::Dealer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardOptions {
    pub require_auth: bool,
    pub role: RequiredRole,
    /// Classify only; never navigate.
    pub skip_redirect: bool,
    pub render_while_checking: bool,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self::authenticated()
    }
}

impl GuardOptions {
    /// Any signed-in user.
    pub fn authenticated() -> Self {
        Self {
            require_auth: true,
            role: RequiredRole::Any,
            skip_redirect: false,
            render_while_checking: false,
        }
    }

    /// Signed in with exactly `role`.
    pub fn role(role: Role) -> Self {
        Self {
            role: role.into(),
            ..Self::authenticated()
        }
    }

    /// No requirements; still waits out the loading phase.
    pub fn public() -> Self {
        Self {
            require_auth: false,
            ..Self::authenticated()
        }
    }

    pub fn skip_redirect(mut self) -> Self {
        self.skip_redirect = true;
        self
    }

    pub fn render_while_checking(mut self, render: bool) -> Self {
        self.render_while_checking = render;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    WrongRole { actual: Role },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardState {
    #[default]
    Checking,
    Granted,
    Denied(DenyReason),
}

impl GuardState {
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }

    pub fn is_denied(self) -> bool {
        matches!(self, Self::Denied(_))
    }
}

/// Pure classification of a session against a guard's requirements.
///
/// A required role implies a required login.
pub fn classify(session: &SessionState, options: &GuardOptions) -> GuardState {
    if session.is_loading {
        return GuardState::Checking;
    }

    let needs_auth = options.require_auth || options.role != RequiredRole::Any;
    if !needs_auth {
        return GuardState::Granted;
    }

    let user = match (&session.user, session.is_authenticated) {
        (Some(user), true) => user,
        _ => return GuardState::Denied(DenyReason::Unauthenticated),
    };

    if options.role.admits(user.role) {
        GuardState::Granted
    } else {
        GuardState::Denied(DenyReason::WrongRole { actual: user.role })
    }
}

/// State machine `checking → {granted, denied}` with exactly one redirect
/// per entry into a denied state.
pub struct RouteGuard {
    options: GuardOptions,
    routes: RouteTable,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<GuardState>,
    redirects: AtomicUsize,
}

impl RouteGuard {
    pub fn new(options: GuardOptions, routes: RouteTable, navigator: Arc<dyn Navigator>) -> Self {
        let (state, _) = watch::channel(GuardState::Checking);
        Self {
            options,
            routes,
            navigator,
            state,
            redirects: AtomicUsize::new(0),
        }
    }

    pub fn options(&self) -> &GuardOptions {
        &self.options
    }

    pub fn state(&self) -> GuardState {
        *self.state.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<GuardState> {
        self.state.subscribe()
    }

    /// Re-classify and redirect if this evaluation entered a denied state.
    pub fn evaluate(&self, session: &SessionState) -> GuardState {
        let next = classify(session, &self.options);
        let changed = self.state.send_if_modified(|s| {
            if *s == next {
                return false;
            }
            *s = next;
            true
        });

        if changed {
            debug!(state = ?next, "guard state changed");
            if let GuardState::Denied(reason) = next {
                if !self.options.skip_redirect {
                    let to = self.destination(reason).to_owned();
                    self.redirects.fetch_add(1, Ordering::SeqCst);
                    debug!(route = %to, "redirecting");
                    self.navigator.navigate(&to);
                }
            }
        }
        next
    }

    /// Whether the guarded view should render right now.
    pub fn can_render(&self) -> bool {
        match self.state() {
            GuardState::Granted => true,
            GuardState::Checking => self.options.render_while_checking,
            GuardState::Denied(_) => false,
        }
    }

    /// Where a denial sends the user.
    pub fn destination(&self, reason: DenyReason) -> &str {
        match reason {
            DenyReason::Unauthenticated => self.routes.login(),
            DenyReason::WrongRole { actual } => self.routes.home_for(actual),
        }
    }

    pub fn redirect_count(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }

    /// Evaluate now and on every session change until `cancel` fires or the
    /// session goes away. Returns the last state.
    pub async fn run(
        &self,
        mut session: watch::Receiver<SessionState>,
        cancel: CancellationToken,
    ) -> GuardState {
        let mut last = {
            let current = session.borrow_and_update().clone();
            self.evaluate(&current)
        };
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                changed = session.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = session.borrow_and_update().clone();
                    last = self.evaluate(&current);
                }
            }
        }
        last
    }
}

impl std::fmt::Debug for RouteGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteGuard")
            .field("options", &self.options)
            .field("state", &self.state())
            .field("redirects", &self.redirect_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{EntityId, UserProfile};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Navigator for Recorder {
        fn navigate(&self, route: &str) {
            self.0.lock().unwrap().push(route.to_owned());
        }
    }

    impl Recorder {
        fn routes(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    fn signed_in(role: Role) -> SessionState {
        SessionState {
            user: Some(Arc::new(UserProfile {
                id: EntityId::from(5),
                role,
                email: "u@example.com".into(),
                first_name: String::new(),
                last_name: String::new(),
                phone: None,
                dealer: None,
                buyer: None,
            })),
            is_authenticated: true,
            is_loading: false,
        }
    }

    fn loading() -> SessionState {
        SessionState {
            is_loading: true,
            ..SessionState::default()
        }
    }

    fn guard(options: GuardOptions) -> (RouteGuard, Arc<Recorder>) {
        let nav = Arc::new(Recorder::default());
        (RouteGuard::new(options, RouteTable::default(), nav.clone()), nav)
    }

    #[test]
    fn classify_table() {
        let buyer_only = GuardOptions::role(Role::Buyer);
        assert_eq!(classify(&loading(), &buyer_only), GuardState::Checking);
        assert_eq!(
            classify(&SessionState::default(), &buyer_only),
            GuardState::Denied(DenyReason::Unauthenticated)
        );
        assert_eq!(classify(&signed_in(Role::Buyer), &buyer_only), GuardState::Granted);
        assert_eq!(
            classify(&signed_in(Role::Dealer), &buyer_only),
            GuardState::Denied(DenyReason::WrongRole {
                actual: Role::Dealer
            })
        );
        assert_eq!(
            classify(&SessionState::default(), &GuardOptions::public()),
            GuardState::Granted
        );
    }

    #[test]
    fn role_without_require_auth_still_demands_login() {
        let options = GuardOptions {
            require_auth: false,
            ..GuardOptions::role(Role::Dealer)
        };
        assert_eq!(
            classify(&SessionState::default(), &options),
            GuardState::Denied(DenyReason::Unauthenticated)
        );
    }

    #[test]
    fn dealer_on_buyer_view_redirects_home_exactly_once() {
        let (guard, nav) = guard(GuardOptions::role(Role::Buyer));
        let session = signed_in(Role::Dealer);

        for _ in 0..3 {
            assert!(guard.evaluate(&session).is_denied());
        }
        assert_eq!(nav.routes(), vec!["/dealer/home".to_owned()]);
        assert_eq!(guard.redirect_count(), 1);
        assert!(!guard.can_render());
    }

    #[test]
    fn anonymous_goes_to_login() {
        let (guard, nav) = guard(GuardOptions::authenticated());
        guard.evaluate(&loading());
        assert!(nav.routes().is_empty());
        guard.evaluate(&SessionState::default());
        assert_eq!(nav.routes(), vec!["/login".to_owned()]);
    }

    #[test]
    fn skip_redirect_only_classifies() {
        let (guard, nav) = guard(GuardOptions::role(Role::Dealer).skip_redirect());
        let state = guard.evaluate(&SessionState::default());
        assert!(state.is_denied());
        assert!(nav.routes().is_empty());
        assert_eq!(guard.redirect_count(), 0);
    }

    #[test]
    fn checking_renders_only_when_configured() {
        let (strict, _) = guard(GuardOptions::authenticated());
        strict.evaluate(&loading());
        assert!(!strict.can_render());

        let (lenient, _) = guard(GuardOptions::authenticated().render_while_checking(true));
        lenient.evaluate(&loading());
        assert!(lenient.can_render());
    }

    #[test]
    fn leaving_and_reentering_denied_redirects_again() {
        let (guard, nav) = guard(GuardOptions::authenticated());
        guard.evaluate(&SessionState::default());
        guard.evaluate(&signed_in(Role::Buyer));
        guard.evaluate(&SessionState::default());
        assert_eq!(nav.routes().len(), 2);
    }

    #[tokio::test]
    async fn run_follows_session_changes_until_cancelled() {
        let (tx, rx) = watch::channel(loading());
        let (guard, nav) = guard(GuardOptions::role(Role::Buyer));
        let guard = Arc::new(guard);
        let cancel = CancellationToken::new();

        let task = {
            let guard = Arc::clone(&guard);
            let cancel = cancel.clone();
            tokio::spawn(async move { guard.run(rx, cancel).await })
        };

        let mut states = guard.watch();
        tx.send_replace(signed_in(Role::Buyer));
        states.wait_for(|s| *s == GuardState::Granted).await.unwrap();

        tx.send_replace(SessionState::default());
        states.wait_for(|s| s.is_denied()).await.unwrap();

        cancel.cancel();
        let last = task.await.unwrap();
        assert_eq!(last, GuardState::Denied(DenyReason::Unauthenticated));
        assert_eq!(nav.routes(), vec!["/login".to_owned()]);
    }
}
