//! Client-side data layer for the carlot car marketplace.
//!
//! Views never talk to the REST API directly. They mount hooks against an
//! [`AppContext`] and render from the hook's cache:
//!
//! - **Hooks** ([`hook`]): [`ListHook`] (type-level subscription, filtered
//!   and paginated) and [`RecordHook`] (id-scoped) wrap an [`EntityCache`],
//!   a bus subscription and gateway calls. Entity actions such as
//!   [`CarActions::mark_sold`] update the hook's own cache, then publish.
//!
//! - **[`InvalidationBus`]**: one per entity type, owned by [`Buses`].
//!   A publish makes every other mounted hook of that type (or that id)
//!   refetch with its own last params, on the runtime rather than in the
//!   publisher's stack.
//!
//! - **[`EntityCache`]**: last good data, params, loading and error flags
//!   behind a `watch` channel. Responses carry a sequence number; only the
//!   latest is applied.
//!
//! - **[`SessionStore`]** / **[`RouteGuard`]**: token and user persisted
//!   under `auth_token` / `user`, and the `checking → granted | denied`
//!   state machine that redirects exactly once on denial.
//!
//! - **Gateways** ([`gateway`]): stateless per-entity request functions.
//!   [`HttpGateway`] speaks REST through `carlot-api`.

pub mod bus;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod hook;
pub mod model;
pub mod routes;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bus::{Buses, InvalidationBus, Subscription, SubscriptionId};
pub use cache::{CacheState, CacheStream, CacheWatch, EntityCache, FetchOutcome};
pub use config::{ClientConfig, TlsVerification};
pub use context::{AppContext, AppContextBuilder, ErrorReporter, Gateways};
pub use error::{CoreError, ErrorKind};
pub use gateway::{CarApi, Gateway, HttpGateway, InquiryApi, ProfileApi, RequestApi};
pub use guard::{
    DenyReason, GuardOptions, GuardState, Navigator, NoNavigation, RequiredRole, RouteGuard,
};
pub use hook::{
    CarActions, CarHook, CarsHook, InquiriesHook, InquiryActions, InquiryHook, ListHook,
    LocalChange, MutationTarget, ProfileHook, RecordHook, RequestActions, RequestHook,
    RequestsHook, Resource,
};
pub use routes::RouteTable;
pub use session::{RefreshOutcome, SessionState, SessionStore};

pub use model::{
    BuyerPreferences, Car, CarImage, CarListParams, CarPatch, CarRequest, CarRequestPatch,
    CarStatus, DealerInfo, EntityId, EntityKind, Inquiry, InquiryListParams, InquiryStatus,
    LoginResponse, NewCar, NewCarRequest, NewInquiry, Page, Pagination, ProfilePatch,
    RequestListParams, RequestStatus, Role, UserProfile,
};
