// ── Session ──
//
// Auth token and signed-in user, persisted under two keys and mirrored on
// a `watch` channel the route guard listens to.

mod storage;
mod store;

pub use storage::{FileStorage, MemoryStorage, SessionStorage, TOKEN_KEY, USER_KEY};
pub use store::{RefreshOutcome, SessionState, SessionStore};
