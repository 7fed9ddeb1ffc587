use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::CoreError;

/// What a view renders from.
///
/// `data` and `error` are independent: a failed refetch keeps the last good
/// data and sets `error` beside it.
#[derive(Debug)]
pub struct CacheState<D, P> {
    pub data: Option<Arc<D>>,
    /// Params that produced `data`.
    pub params: Option<P>,
    pub loading: bool,
    pub error: Option<Arc<CoreError>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<D, P: Clone> Clone for CacheState<D, P> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            params: self.params.clone(),
            loading: self.loading,
            error: self.error.clone(),
            updated_at: self.updated_at,
        }
    }
}

impl<D, P> Default for CacheState<D, P> {
    fn default() -> Self {
        Self {
            data: None,
            params: None,
            loading: false,
            error: None,
            updated_at: None,
        }
    }
}

impl<D, P> CacheState<D, P> {
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}

/// Result of feeding a response back into the cache.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Data stored.
    Applied,
    /// Error stored beside the previous data.
    Failed(Arc<CoreError>),
    /// A newer fetch was issued meanwhile; response dropped.
    Superseded,
    /// The owning hook unmounted; response dropped.
    Unmounted,
    /// Nothing to do (e.g. refetch before the first fetch).
    Skipped,
}

impl FetchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    pub fn error(&self) -> Option<&Arc<CoreError>> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Proof that a fetch was started, carrying its sequence number.
#[derive(Debug)]
pub struct FetchTicket<P> {
    seq: u64,
    params: P,
}

impl<P> FetchTicket<P> {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn params(&self) -> &P {
        &self.params
    }
}

/// Reactive state for one hook instance.
pub struct EntityCache<D, P> {
    state: watch::Sender<CacheState<D, P>>,
    /// Params of the most recently *issued* fetch; refetches reuse these.
    requested: ArcSwapOption<P>,
    issued: AtomicU64,
    cancel: CancellationToken,
}

impl<D, P> EntityCache<D, P>
where
    D: Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_cancel(CancellationToken::new())
    }

    /// Cache whose lifetime follows `cancel`.
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        let (state, _) = watch::channel(CacheState::default());
        Self {
            state,
            requested: ArcSwapOption::empty(),
            issued: AtomicU64::new(0),
            cancel,
        }
    }

    /// Start a fetch: take a sequence number, remember `params`, flip the
    /// loading flag and clear the previous error.
    pub fn begin(&self, params: P) -> FetchTicket<P> {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.requested.store(Some(Arc::new(params.clone())));
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        FetchTicket { seq, params }
    }

    /// Apply a response, unless a newer fetch was issued or the cache was
    /// unmounted.
    pub fn finish(&self, ticket: FetchTicket<P>, result: Result<D, CoreError>) -> FetchOutcome {
        if self.cancel.is_cancelled() {
            return FetchOutcome::Unmounted;
        }

        let FetchTicket { seq, params } = ticket;
        let mut outcome = FetchOutcome::Superseded;
        let mut result = Some(result);
        let mut params = Some(params);

        // The sequence check runs under the channel's write lock so a
        // superseded response can never land between check and store.
        self.state.send_if_modified(|s| {
            if self.issued.load(Ordering::SeqCst) != seq {
                return false;
            }
            s.loading = false;
            match result.take() {
                Some(Ok(data)) => {
                    s.data = Some(Arc::new(data));
                    s.params = params.take();
                    s.error = None;
                    s.updated_at = Some(Utc::now());
                    outcome = FetchOutcome::Applied;
                }
                Some(Err(err)) => {
                    let err = Arc::new(err);
                    s.error = Some(Arc::clone(&err));
                    outcome = FetchOutcome::Failed(err);
                }
                None => return false,
            }
            true
        });

        if matches!(outcome, FetchOutcome::Superseded) {
            debug!(seq, "dropping superseded response");
        }
        outcome
    }

    /// `begin`, await `fut`, `finish`; gives up early on unmount.
    pub async fn fetch<F>(&self, params: P, fut: F) -> FetchOutcome
    where
        F: Future<Output = Result<D, CoreError>>,
    {
        let ticket = self.begin(params);
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => FetchOutcome::Unmounted,
            result = fut => self.finish(ticket, result),
        }
    }

    /// Replace the cached data without touching params or flags.
    pub fn replace(&self, data: Option<D>) {
        self.state.send_modify(|s| {
            s.data = data.map(Arc::new);
            s.updated_at = Some(Utc::now());
        });
    }

    /// Record an error without starting a fetch.
    pub fn set_error(&self, err: CoreError) {
        self.state.send_modify(|s| {
            s.loading = false;
            s.error = Some(Arc::new(err));
        });
    }

    /// Params of the latest issued fetch, used by targeted refetches.
    pub fn last_params(&self) -> Option<P> {
        self.requested.load_full().map(|p| P::clone(&p))
    }

    pub fn snapshot(&self) -> CacheState<D, P> {
        self.state.borrow().clone()
    }

    pub fn data(&self) -> Option<Arc<D>> {
        self.state.borrow().data.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheState<D, P>> {
        self.state.subscribe()
    }

    /// Drop any in-flight response and refuse future ones.
    pub fn unmount(&self) {
        self.cancel.cancel();
    }

    pub fn is_unmounted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl<D, P> EntityCache<D, P>
where
    D: Clone + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    /// Synchronous pure transform of the cached data. Returns `false` if
    /// there was nothing cached to transform.
    pub fn mutate_local(&self, updater: impl FnOnce(&mut D)) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        let mut updater = Some(updater);
        self.state.send_if_modified(|s| {
            let (Some(current), Some(update)) = (s.data.as_ref(), updater.take()) else {
                return false;
            };
            let mut next = D::clone(current);
            update(&mut next);
            s.data = Some(Arc::new(next));
            true
        })
    }
}

impl<D, P> Default for EntityCache<D, P>
where
    D: Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<D, P> std::fmt::Debug for EntityCache<D, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.state.borrow();
        f.debug_struct("EntityCache")
            .field("issued", &self.issued.load(Ordering::Relaxed))
            .field("loading", &s.loading)
            .field("has_data", &s.data.is_some())
            .field("has_error", &s.error.is_some())
            .finish_non_exhaustive()
    }
}
