use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{LocalChange, MountGuard, MutationTarget, Resource, schedule};
use crate::cache::{CacheState, CacheStream, CacheWatch, EntityCache, FetchOutcome};
use crate::context::{AppContext, ErrorReporter};
use crate::gateway::Gateway;
use crate::model::{EntityId, Page};

type ListCache<R> = EntityCache<Page<R>, <R as Resource>::ListParams>;

struct ListInner<R: Resource> {
    ctx: AppContext,
    api: Arc<R::Api>,
    cache: ListCache<R>,
}

impl<R: Resource> ListInner<R> {
    async fn fetch(&self, params: R::ListParams) -> FetchOutcome {
        let api = Arc::clone(&self.api);
        let query = params.clone();
        let outcome = self
            .cache
            .fetch(params, async move { api.list(&query).await })
            .await;
        debug!(kind = %R::KIND, ?outcome, "list fetch");
        if let FetchOutcome::Failed(err) = &outcome {
            self.ctx.reporter().report(err);
        }
        outcome
    }

    async fn refetch(&self) -> FetchOutcome {
        match self.cache.last_params() {
            Some(params) => self.fetch(params).await,
            None => FetchOutcome::Skipped,
        }
    }
}

/// Collection hook: one filtered, paginated list of `R`.
///
/// Any publish on `R`'s bus makes it refetch with its own last params.
/// Clones share state; dropping the last clone unmounts.
pub struct ListHook<R: Resource> {
    inner: Arc<ListInner<R>>,
    mount: Arc<MountGuard>,
}

impl<R: Resource> Clone for ListHook<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            mount: Arc::clone(&self.mount),
        }
    }
}

impl<R: Resource> ListHook<R> {
    /// Subscribe without fetching.
    pub fn new(ctx: &AppContext) -> Self {
        let cancel = CancellationToken::new();
        let inner = Arc::new(ListInner {
            ctx: ctx.clone(),
            api: R::api(ctx),
            cache: EntityCache::with_cancel(cancel.clone()),
        });

        let weak = Arc::downgrade(&inner);
        let subscription = R::bus(ctx).subscribe(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.cache.is_unmounted() {
                return;
            }
            schedule(R::KIND, async move {
                inner.refetch().await;
            });
        });

        Self {
            inner,
            mount: Arc::new(MountGuard::new(cancel, subscription)),
        }
    }

    /// Subscribe and fetch the first page.
    pub async fn mount(ctx: &AppContext, params: R::ListParams) -> Self {
        let hook = Self::new(ctx);
        hook.fetch(params).await;
        hook
    }

    pub async fn fetch(&self, params: R::ListParams) -> FetchOutcome {
        self.inner.fetch(params).await
    }

    /// Re-run the last fetch with the same params.
    pub async fn refetch(&self) -> FetchOutcome {
        self.inner.refetch().await
    }

    pub fn state(&self) -> CacheState<Page<R>, R::ListParams> {
        self.inner.cache.snapshot()
    }

    pub fn page(&self) -> Option<Arc<Page<R>>> {
        self.inner.cache.data()
    }

    pub fn items(&self) -> Vec<R> {
        self.page().map(|p| p.items.clone()).unwrap_or_default()
    }

    pub fn find(&self, id: &EntityId) -> Option<R> {
        self.page()
            .and_then(|p| p.items.iter().find(|r| r.id() == id).cloned())
    }

    /// Params of the latest fetch.
    pub fn params(&self) -> Option<R::ListParams> {
        self.inner.cache.last_params()
    }

    pub fn watch(&self) -> CacheWatch<Page<R>, R::ListParams> {
        CacheWatch::new(self.inner.cache.subscribe())
    }

    pub fn stream(&self) -> CacheStream<Page<R>, R::ListParams> {
        self.watch().into_stream()
    }

    pub fn mutate_local(&self, updater: impl FnOnce(&mut Page<R>)) -> bool {
        self.inner.cache.mutate_local(updater)
    }

    /// Stop listening and drop any in-flight response. Also happens when
    /// the last clone is dropped.
    pub fn unmount(&self) {
        self.mount.unmount();
    }

    pub fn is_mounted(&self) -> bool {
        self.mount.is_mounted()
    }
}

impl<R: Resource> MutationTarget<R> for ListHook<R> {
    fn api(&self) -> &R::Api {
        &self.inner.api
    }

    fn cached(&self, id: &EntityId) -> Option<R> {
        self.find(id)
    }

    fn apply_local(&self, change: LocalChange<R>) {
        self.mutate_local(|page| match change {
            LocalChange::Upsert(record) => {
                if let Some(slot) = page.items.iter_mut().find(|r| r.id() == record.id()) {
                    *slot = record;
                }
            }
            LocalChange::Insert(record) => {
                page.items.insert(0, record);
                page.pagination.total = page.pagination.total.saturating_add(1);
            }
            LocalChange::Remove(id) => {
                let before = page.items.len();
                page.items.retain(|r| r.id() != &id);
                if page.items.len() < before {
                    page.pagination.total = page.pagination.total.saturating_sub(1);
                }
            }
        });
    }

    fn announce(&self, id: Option<&EntityId>) {
        R::bus(&self.inner.ctx).publish_except(self.mount.subscription().id(), id);
    }

    fn reporter(&self) -> &ErrorReporter {
        self.inner.ctx.reporter()
    }
}

impl<R: Resource> std::fmt::Debug for ListHook<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListHook")
            .field("kind", &R::KIND)
            .field("cache", &self.inner.cache)
            .field("mounted", &self.is_mounted())
            .finish()
    }
}
