// ── Data-fetch hooks ──
//
// What views consume: an `EntityCache` plus a bus subscription plus gateway
// calls. `ListHook` subscribes at type level, `RecordHook` by id. Entity
// actions (mark sold, close, ...) are extension traits over any hook that
// can take a mutation, so a list view and a detail view share them.

mod cars;
mod inquiries;
mod list;
mod profile;
mod record;
mod requests;

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::bus::{InvalidationBus, Subscription};
use crate::context::{AppContext, ErrorReporter};
use crate::error::CoreError;
use crate::gateway::Gateway;
use crate::model::{EntityId, EntityKind};

pub use cars::{CarActions, CarHook, CarsHook};
pub use inquiries::{InquiriesHook, InquiryActions, InquiryHook};
pub use list::ListHook;
pub use profile::ProfileHook;
pub use record::RecordHook;
pub use requests::{RequestActions, RequestHook, RequestsHook};

/// A server-owned record type with a gateway and a bus.
pub trait Resource: Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    type ListParams: Clone + Debug + Default + Send + Sync + 'static;

    type Api: ?Sized + Gateway<Self, Self::ListParams> + 'static;

    fn id(&self) -> &EntityId;

    fn api(ctx: &AppContext) -> Arc<Self::Api>;

    fn bus(ctx: &AppContext) -> &InvalidationBus;
}

/// Ties a hook's lifetime to its cancellation token and subscription.
/// Dropped with the last handle; cancels in-flight fetches.
pub(crate) struct MountGuard {
    cancel: CancellationToken,
    subscription: Subscription,
}

impl MountGuard {
    pub(crate) fn new(cancel: CancellationToken, subscription: Subscription) -> Self {
        Self {
            cancel,
            subscription,
        }
    }

    pub(crate) fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub(crate) fn unmount(&self) {
        self.cancel.cancel();
        self.subscription.unsubscribe();
    }

    pub(crate) fn is_mounted(&self) -> bool {
        !self.cancel.is_cancelled()
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Optimistic edit applied to the mutating hook's own cache.
#[derive(Debug, Clone)]
pub enum LocalChange<R> {
    /// Replace the record with the same id, if cached.
    Upsert(R),
    /// A newly created record.
    Insert(R),
    Remove(EntityId),
}

/// Anything an entity action can run against.
pub trait MutationTarget<R: Resource>: Sync {
    fn api(&self) -> &R::Api;

    /// The cached copy of `id`, if this hook holds one.
    fn cached(&self, id: &EntityId) -> Option<R>;

    fn apply_local(&self, change: LocalChange<R>);

    /// Tell every other hook of this type (and id) to refetch.
    fn announce(&self, id: Option<&EntityId>);

    fn reporter(&self) -> &ErrorReporter;
}

/// Fold a mutation result into the target: update its cache, announce,
/// or hand the error to the reporter and back to the caller.
pub(crate) fn settle<R, T>(
    target: &T,
    result: Result<R, CoreError>,
    change: impl FnOnce(R) -> LocalChange<R>,
) -> Result<R, CoreError>
where
    R: Resource,
    T: MutationTarget<R> + ?Sized,
{
    match result {
        Ok(record) => {
            let id = record.id().clone();
            target.apply_local(change(record.clone()));
            target.announce(Some(&id));
            Ok(record)
        }
        Err(err) => {
            target.reporter().report(&err);
            Err(err)
        }
    }
}

/// `settle` for operations that return nothing (delete).
pub(crate) fn settle_removal<R, T>(
    target: &T,
    id: &EntityId,
    result: Result<(), CoreError>,
) -> Result<(), CoreError>
where
    R: Resource,
    T: MutationTarget<R> + ?Sized,
{
    match result {
        Ok(()) => {
            target.apply_local(LocalChange::Remove(id.clone()));
            target.announce(Some(id));
            Ok(())
        }
        Err(err) => {
            target.reporter().report(&err);
            Err(err)
        }
    }
}

/// Outcome of checking a status move against the record's current status.
pub(crate) enum Precheck<R> {
    /// Allowed; ask the server.
    Proceed,
    /// Already in the target status; nothing to do.
    AlreadyThere(R),
    Invalid(CoreError),
}

/// The record a status move starts from: the hook's cached copy, or the
/// server's when this hook does not hold one (a filtered list, an
/// unfetched record hook). Read failures go through the reporter.
pub(crate) async fn current<R, T>(target: &T, id: &EntityId) -> Result<R, CoreError>
where
    R: Resource,
    T: MutationTarget<R> + ?Sized,
{
    if let Some(record) = target.cached(id) {
        return Ok(record);
    }
    match Gateway::get(target.api(), id).await {
        Ok(record) => Ok(record),
        Err(err) => {
            target.reporter().report(&err);
            Err(err)
        }
    }
}

pub(crate) fn precheck<R, S>(
    record: R,
    target: S,
    status_of: impl Fn(&R) -> S,
    allowed: impl Fn(S, S) -> bool,
) -> Precheck<R>
where
    R: Resource,
    S: Copy + PartialEq + std::fmt::Display,
{
    let current = status_of(&record);
    if current == target {
        Precheck::AlreadyThere(record)
    } else if allowed(current, target) {
        Precheck::Proceed
    } else {
        Precheck::Invalid(CoreError::InvalidTransition {
            entity: R::KIND,
            id: record.id().clone(),
            from: current.to_string(),
            to: target.to_string(),
        })
    }
}

/// Run a bus-triggered refetch on the runtime, outside the publisher's
/// call stack.
pub(crate) fn schedule<F>(kind: EntityKind, fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(fut);
        }
        Err(_) => warn!(%kind, "no async runtime; invalidation refetch dropped"),
    }
}
