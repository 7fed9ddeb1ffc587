use std::sync::Arc;

use super::{
    ListHook, LocalChange, MutationTarget, Precheck, RecordHook, Resource, current, precheck,
    settle,
};
use crate::bus::InvalidationBus;
use crate::context::AppContext;
use crate::error::CoreError;
use crate::gateway::RequestApi;
use crate::model::{
    CarRequest, CarRequestPatch, EntityId, EntityKind, NewCarRequest, RequestListParams,
    RequestStatus,
};

impl Resource for CarRequest {
    const KIND: EntityKind = EntityKind::CarRequest;
    type ListParams = RequestListParams;
    type Api = dyn RequestApi;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn api(ctx: &AppContext) -> Arc<dyn RequestApi> {
        Arc::clone(&ctx.gateways().requests)
    }

    fn bus(ctx: &AppContext) -> &InvalidationBus {
        &ctx.buses().requests
    }
}

pub type RequestsHook = ListHook<CarRequest>;
pub type RequestHook = RecordHook<CarRequest>;

async fn status_move(
    target: &impl MutationTarget<CarRequest>,
    id: &EntityId,
    to: RequestStatus,
) -> Result<Precheck<CarRequest>, CoreError> {
    let record = current(target, id).await?;
    Ok(precheck(record, to, |r: &CarRequest| r.status, RequestStatus::can_transition_to))
}

#[allow(async_fn_in_trait)]
pub trait RequestActions: MutationTarget<CarRequest> + Sized {
    async fn create_request(&self, payload: &NewCarRequest) -> Result<CarRequest, CoreError> {
        let result = RequestApi::create_request(self.api(), payload).await;
        settle(self, result, LocalChange::Insert)
    }

    async fn update_request(
        &self,
        id: &EntityId,
        patch: &CarRequestPatch,
    ) -> Result<CarRequest, CoreError> {
        let result = RequestApi::update_request(self.api(), id, patch).await;
        settle(self, result, LocalChange::Upsert)
    }

    async fn close_request(&self, id: &EntityId) -> Result<CarRequest, CoreError> {
        match status_move(self, id, RequestStatus::Closed).await? {
            Precheck::AlreadyThere(request) => return Ok(request),
            Precheck::Invalid(err) => return Err(err),
            Precheck::Proceed => {}
        }
        let result = RequestApi::close_request(self.api(), id).await;
        settle(self, result, LocalChange::Upsert)
    }

    async fn reopen_request(&self, id: &EntityId) -> Result<CarRequest, CoreError> {
        match status_move(self, id, RequestStatus::Active).await? {
            Precheck::AlreadyThere(request) => return Ok(request),
            Precheck::Invalid(err) => return Err(err),
            Precheck::Proceed => {}
        }
        let result = RequestApi::reopen_request(self.api(), id).await;
        settle(self, result, LocalChange::Upsert)
    }
}

impl<T: MutationTarget<CarRequest>> RequestActions for T {}
