use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::CacheState;

/// A subscription to one hook's cache.
///
/// Snapshot access plus change notification, either via `changed()` or by
/// converting into a `Stream`.
pub struct CacheWatch<D, P> {
    receiver: watch::Receiver<CacheState<D, P>>,
}

impl<D, P> CacheWatch<D, P>
where
    D: Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(receiver: watch::Receiver<CacheState<D, P>>) -> Self {
        Self { receiver }
    }

    /// The latest state.
    pub fn latest(&self) -> CacheState<D, P> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. Returns `None` once the owning hook is gone.
    pub async fn changed(&mut self) -> Option<CacheState<D, P>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    pub fn into_stream(self) -> CacheStream<D, P> {
        CacheStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding a fresh `CacheState` on every change,
/// starting with the current one.
pub struct CacheStream<D, P> {
    inner: WatchStream<CacheState<D, P>>,
}

impl<D, P> Stream for CacheStream<D, P>
where
    D: Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    type Item = CacheState<D, P>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // WatchStream is Unpin, so CacheStream is too.
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
