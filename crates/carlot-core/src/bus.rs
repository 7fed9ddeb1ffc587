// ── Invalidation bus ──
//
// Per-entity-type publish/subscribe registry. A mutation in one view
// publishes; every other mounted hook of that type (or that id) reacts by
// scheduling its own refetch. Buses are plain values: `Buses::new()` builds
// the three the app needs and `AppContext` injects them.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::{trace, warn};

use crate::model::{EntityId, EntityKind};

type Handler = Arc<dyn Fn() + Send + Sync>;

/// Identity of a registered handler, unique within its bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope {
    Type,
    Id(EntityId),
}

struct Entry {
    scope: Scope,
    handler: Handler,
}

struct BusInner {
    kind: EntityKind,
    next_id: AtomicU64,
    entries: DashMap<SubscriptionId, Entry>,
}

impl BusInner {
    fn remove(&self, id: SubscriptionId) -> bool {
        self.entries.remove(&id).is_some()
    }
}

/// Publish/subscribe registry for one entity type.
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone)]
pub struct InvalidationBus {
    inner: Arc<BusInner>,
}

impl InvalidationBus {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            inner: Arc::new(BusInner {
                kind,
                next_id: AtomicU64::new(1),
                entries: DashMap::new(),
            }),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.inner.kind
    }

    /// Register a handler for every publish on this bus.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.register(Scope::Type, Arc::new(handler))
    }

    /// Register a handler for publishes naming `id` (and for
    /// `publish_and_invalidate_all`). Type-level publishes without an id
    /// do not reach it.
    pub fn subscribe_to_id<F>(&self, id: EntityId, handler: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.register(Scope::Id(id), Arc::new(handler))
    }

    fn register(&self, scope: Scope, handler: Handler) -> Subscription {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        trace!(kind = %self.inner.kind, ?id, ?scope, "subscribe");
        self.inner.entries.insert(id, Entry { scope, handler });
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Invoke every type-level handler, plus every handler scoped to `id`.
    ///
    /// Returns the number of handlers invoked.
    pub fn publish(&self, id: Option<&EntityId>) -> usize {
        self.dispatch(|_, scope| match scope {
            Scope::Type => true,
            Scope::Id(scoped) => id == Some(scoped),
        })
    }

    /// Like [`publish`](Self::publish) but skips `origin`. Used by a hook
    /// announcing its own mutation, whose cache is already up to date.
    pub fn publish_except(&self, origin: SubscriptionId, id: Option<&EntityId>) -> usize {
        self.dispatch(|sub, scope| {
            sub != origin
                && match scope {
                    Scope::Type => true,
                    Scope::Id(scoped) => id == Some(scoped),
                }
        })
    }

    /// Invoke every registered handler once, type-level and id-scoped alike.
    pub fn publish_and_invalidate_all(&self) -> usize {
        self.dispatch(|_, _| true)
    }

    /// Publish from a fresh task instead of the caller's stack. Without a
    /// runtime the publish happens inline.
    pub fn publish_deferred(&self, id: Option<EntityId>) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let bus = self.clone();
                handle.spawn(async move {
                    bus.publish(id.as_ref());
                });
            }
            Err(_) => {
                self.publish(id.as_ref());
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.entries.len()
    }

    /// Snapshot matching handlers, release the map, then call them.
    ///
    /// A handler removed by an earlier handler in the same pass is skipped;
    /// one added during the pass is not called until the next publish.
    fn dispatch(&self, select: impl Fn(SubscriptionId, &Scope) -> bool) -> usize {
        let targets: Vec<(SubscriptionId, Handler)> = self
            .inner
            .entries
            .iter()
            .filter(|e| select(*e.key(), &e.value().scope))
            .map(|e| (*e.key(), Arc::clone(&e.value().handler)))
            .collect();

        let kind = self.inner.kind;
        let mut invoked = 0;
        for (sub, handler) in targets {
            if !self.inner.entries.contains_key(&sub) {
                continue;
            }
            trace!(%kind, ?sub, "dispatch");
            invoked += 1;
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler())) {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".into());
                warn!(%kind, ?sub, panic = %message, "invalidation handler panicked");
            }
        }
        invoked
    }
}

impl std::fmt::Debug for InvalidationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationBus")
            .field("kind", &self.inner.kind)
            .field("subscribers", &self.inner.entries.len())
            .finish()
    }
}

// ── Subscription ─────────────────────────────────────────────────────

/// Disposer for a registered handler. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: SubscriptionId,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the handler now. Returns `false` if it was already gone.
    pub fn unsubscribe(&self) -> bool {
        self.bus.upgrade().is_some_and(|bus| bus.remove(self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Subscription").field(&self.id).finish()
    }
}

// ── Buses ────────────────────────────────────────────────────────────

/// The three buses the marketplace needs, built once per app.
#[derive(Debug, Clone)]
pub struct Buses {
    pub cars: InvalidationBus,
    pub inquiries: InvalidationBus,
    pub requests: InvalidationBus,
}

impl Buses {
    pub fn new() -> Self {
        Self {
            cars: InvalidationBus::new(EntityKind::Car),
            inquiries: InvalidationBus::new(EntityKind::Inquiry),
            requests: InvalidationBus::new(EntityKind::CarRequest),
        }
    }

    pub fn for_kind(&self, kind: EntityKind) -> Option<&InvalidationBus> {
        match kind {
            EntityKind::Car => Some(&self.cars),
            EntityKind::Inquiry => Some(&self.inquiries),
            EntityKind::CarRequest => Some(&self.requests),
            EntityKind::UserProfile => None,
        }
    }
}

impl Default for Buses {
    fn default() -> Self {
        Self::new()
    }
}
