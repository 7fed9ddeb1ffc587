// ── Application context ──
//
// The injected bundle every hook mounts against: gateways, buses, the
// session store, and the one place auth failures are handled. Built once
// per app (or per test) and cloned freely.

use std::sync::Arc;

use carlot_api::{ApiClient, TokenSource};
use secrecy::SecretString;
use tracing::{debug, warn};

use crate::bus::Buses;
use crate::config::ClientConfig;
use crate::error::{CoreError, ErrorKind};
use crate::gateway::{CarApi, HttpGateway, InquiryApi, ProfileApi, RequestApi};
use crate::guard::{GuardOptions, Navigator, NoNavigation, RouteGuard};
use crate::routes::RouteTable;
use crate::session::{FileStorage, MemoryStorage, RefreshOutcome, SessionStorage, SessionStore};

/// One gateway per entity, usually all backed by the same `HttpGateway`.
#[derive(Clone)]
pub struct Gateways {
    pub cars: Arc<dyn CarApi>,
    pub inquiries: Arc<dyn InquiryApi>,
    pub requests: Arc<dyn RequestApi>,
    pub profile: Arc<dyn ProfileApi>,
}

impl Gateways {
    /// Use one value for every entity.
    pub fn from_shared<G>(gateway: Arc<G>) -> Self
    where
        G: CarApi + InquiryApi + RequestApi + ProfileApi + 'static,
    {
        Self {
            cars: gateway.clone(),
            inquiries: gateway.clone(),
            requests: gateway.clone(),
            profile: gateway,
        }
    }
}

impl std::fmt::Debug for Gateways {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateways").finish_non_exhaustive()
    }
}

/// Centralized error handling for hooks.
///
/// Auth failures tear the session down and send the user to the login
/// route. Everything else is logged and left to the caller.
#[derive(Clone)]
pub struct ErrorReporter {
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    login_route: String,
}

impl ErrorReporter {
    pub fn report(&self, err: &CoreError) {
        match err.kind() {
            ErrorKind::Auth => {
                if self.session.clear() {
                    debug!(error = %err, route = %self.login_route, "session rejected; redirecting to login");
                    self.navigator.navigate(&self.login_route);
                }
            }
            ErrorKind::Validation => {}
            ErrorKind::NotFound => debug!(error = %err, "not found"),
            ErrorKind::Network | ErrorKind::Server => warn!(error = %err, "request failed"),
        }
    }
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("login_route", &self.login_route)
            .finish_non_exhaustive()
    }
}

struct ContextInner {
    gateways: Gateways,
    buses: Buses,
    session: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    reporter: ErrorReporter,
    routes: RouteTable,
    render_while_checking: bool,
}

/// Everything hooks need, behind one cheap handle.
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<ContextInner>,
}

impl AppContext {
    pub fn builder(gateways: Gateways, session: Arc<SessionStore>) -> AppContextBuilder {
        AppContextBuilder {
            gateways,
            session,
            buses: None,
            navigator: None,
            routes: RouteTable::default(),
            render_while_checking: false,
        }
    }

    /// Wire up the production stack from a `ClientConfig`: persisted
    /// session, `ApiClient` authenticating from it, `HttpGateway` on top.
    pub fn connect(config: &ClientConfig, navigator: Arc<dyn Navigator>) -> Result<Self, CoreError> {
        let storage: Arc<dyn SessionStorage> = match &config.session_dir {
            Some(dir) => Arc::new(FileStorage::new(dir)),
            None => Arc::new(MemoryStorage::new()),
        };
        let session = Arc::new(SessionStore::load(storage));
        let tokens: Arc<dyn TokenSource> = session.clone();
        let client = ApiClient::new(config.api_url.clone(), &config.transport(), tokens)?;
        debug!(api = %config.api_url, "context connected");

        Ok(Self::builder(Gateways::from_shared(Arc::new(HttpGateway::new(client))), session)
            .navigator(navigator)
            .routes(config.routes.clone())
            .render_while_checking(config.render_while_checking)
            .build())
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn gateways(&self) -> &Gateways {
        &self.inner.gateways
    }

    pub fn buses(&self) -> &Buses {
        &self.inner.buses
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.inner.session
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.inner.reporter
    }

    pub fn routes(&self) -> &RouteTable {
        &self.inner.routes
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.inner.navigator
    }

    // ── Session flows ────────────────────────────────────────────────

    /// A guard wired to this context's navigator and routes. The context's
    /// `render_while_checking` applies unless the options already allow it.
    pub fn guard(&self, options: GuardOptions) -> RouteGuard {
        let options = if self.inner.render_while_checking {
            options.render_while_checking(true)
        } else {
            options
        };
        RouteGuard::new(
            options,
            self.inner.routes.clone(),
            Arc::clone(&self.inner.navigator),
        )
    }

    pub async fn refresh_session(&self) -> RefreshOutcome {
        self.inner
            .session
            .refresh(self.inner.gateways.profile.as_ref())
            .await
    }

    /// Sign in and navigate to the role's home. Returns that route.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<String, CoreError> {
        let user = self
            .inner
            .session
            .login(self.inner.gateways.profile.as_ref(), email, password)
            .await?;
        let home = self.inner.routes.home_for(user.role).to_owned();
        self.inner.navigator.navigate(&home);
        Ok(home)
    }

    /// Sign out and navigate to the login route.
    pub async fn logout(&self) {
        self.inner
            .session
            .logout(self.inner.gateways.profile.as_ref())
            .await;
        self.inner.navigator.navigate(self.inner.routes.login());
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("session", &self.inner.session)
            .field("buses", &self.inner.buses)
            .finish_non_exhaustive()
    }
}

pub struct AppContextBuilder {
    gateways: Gateways,
    session: Arc<SessionStore>,
    buses: Option<Buses>,
    navigator: Option<Arc<dyn Navigator>>,
    routes: RouteTable,
    render_while_checking: bool,
}

impl AppContextBuilder {
    pub fn buses(mut self, buses: Buses) -> Self {
        self.buses = Some(buses);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    pub fn render_while_checking(mut self, render: bool) -> Self {
        self.render_while_checking = render;
        self
    }

    pub fn build(self) -> AppContext {
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(NoNavigation) as Arc<dyn Navigator>);
        let reporter = ErrorReporter {
            session: Arc::clone(&self.session),
            navigator: Arc::clone(&navigator),
            login_route: self.routes.login().to_owned(),
        };
        AppContext {
            inner: Arc::new(ContextInner {
                gateways: self.gateways,
                buses: self.buses.unwrap_or_default(),
                session: self.session,
                navigator,
                reporter,
                routes: self.routes,
                render_while_checking: self.render_while_checking,
            }),
        }
    }
}
