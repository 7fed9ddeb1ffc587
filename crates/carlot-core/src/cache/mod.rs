// ── Per-hook entity cache ──
//
// Each mounted hook owns one `EntityCache`. It holds the last good data,
// the params that produced it, and loading/error flags, and publishes every
// change on a `watch` channel that views render from.

mod entity_cache;
mod stream;

pub use entity_cache::{CacheState, EntityCache, FetchOutcome, FetchTicket};
pub use stream::{CacheStream, CacheWatch};
