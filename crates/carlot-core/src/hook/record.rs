use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{LocalChange, MountGuard, MutationTarget, Resource, schedule};
use crate::cache::{CacheState, CacheStream, CacheWatch, EntityCache, FetchOutcome};
use crate::context::{AppContext, ErrorReporter};
use crate::gateway::Gateway;
use crate::model::EntityId;

struct RecordInner<R: Resource> {
    ctx: AppContext,
    api: Arc<R::Api>,
    id: EntityId,
    cache: EntityCache<R, EntityId>,
}

impl<R: Resource> RecordInner<R> {
    async fn fetch(&self) -> FetchOutcome {
        let api = Arc::clone(&self.api);
        let id = self.id.clone();
        let outcome = self
            .cache
            .fetch(self.id.clone(), async move { api.get(&id).await })
            .await;
        debug!(kind = %R::KIND, id = %self.id, ?outcome, "record fetch");
        if let FetchOutcome::Failed(err) = &outcome {
            self.ctx.reporter().report(err);
        }
        outcome
    }
}

/// Single-record hook. Subscribes to its own id only, so publishes about
/// other records of the same type leave it alone.
pub struct RecordHook<R: Resource> {
    inner: Arc<RecordInner<R>>,
    mount: Arc<MountGuard>,
}

impl<R: Resource> Clone for RecordHook<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            mount: Arc::clone(&self.mount),
        }
    }
}

impl<R: Resource> RecordHook<R> {
    /// Subscribe to `id` without fetching.
    pub fn new(ctx: &AppContext, id: EntityId) -> Self {
        let cancel = CancellationToken::new();
        let inner = Arc::new(RecordInner {
            ctx: ctx.clone(),
            api: R::api(ctx),
            id: id.clone(),
            cache: EntityCache::with_cancel(cancel.clone()),
        });

        let weak = Arc::downgrade(&inner);
        let subscription = R::bus(ctx).subscribe_to_id(id, move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.cache.is_unmounted() {
                return;
            }
            schedule(R::KIND, async move {
                inner.fetch().await;
            });
        });

        Self {
            inner,
            mount: Arc::new(MountGuard::new(cancel, subscription)),
        }
    }

    pub async fn mount(ctx: &AppContext, id: EntityId) -> Self {
        let hook = Self::new(ctx, id);
        hook.fetch().await;
        hook
    }

    pub fn id(&self) -> &EntityId {
        &self.inner.id
    }

    pub async fn fetch(&self) -> FetchOutcome {
        self.inner.fetch().await
    }

    pub async fn refetch(&self) -> FetchOutcome {
        self.inner.fetch().await
    }

    pub fn state(&self) -> CacheState<R, EntityId> {
        self.inner.cache.snapshot()
    }

    pub fn record(&self) -> Option<Arc<R>> {
        self.inner.cache.data()
    }

    pub fn watch(&self) -> CacheWatch<R, EntityId> {
        CacheWatch::new(self.inner.cache.subscribe())
    }

    pub fn stream(&self) -> CacheStream<R, EntityId> {
        self.watch().into_stream()
    }

    pub fn mutate_local(&self, updater: impl FnOnce(&mut R)) -> bool {
        self.inner.cache.mutate_local(updater)
    }

    pub fn unmount(&self) {
        self.mount.unmount();
    }

    pub fn is_mounted(&self) -> bool {
        self.mount.is_mounted()
    }
}

impl<R: Resource> MutationTarget<R> for RecordHook<R> {
    fn api(&self) -> &R::Api {
        &self.inner.api
    }

    fn cached(&self, id: &EntityId) -> Option<R> {
        (id == &self.inner.id)
            .then(|| self.record().map(|r| R::clone(&r)))
            .flatten()
    }

    fn apply_local(&self, change: LocalChange<R>) {
        match change {
            LocalChange::Upsert(record) | LocalChange::Insert(record) => {
                if record.id() == &self.inner.id {
                    self.inner.cache.replace(Some(record));
                }
            }
            LocalChange::Remove(id) => {
                if id == self.inner.id {
                    self.inner.cache.replace(None);
                }
            }
        }
    }

    fn announce(&self, id: Option<&EntityId>) {
        R::bus(&self.inner.ctx).publish_except(self.mount.subscription().id(), id);
    }

    fn reporter(&self) -> &ErrorReporter {
        self.inner.ctx.reporter()
    }
}

impl<R: Resource> std::fmt::Debug for RecordHook<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordHook")
            .field("kind", &R::KIND)
            .field("id", &self.inner.id)
            .field("cache", &self.inner.cache)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}
