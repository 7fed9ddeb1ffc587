use std::sync::Arc;

use super::{
    ListHook, LocalChange, MutationTarget, Precheck, RecordHook, Resource, current, precheck,
    settle,
};
use crate::bus::InvalidationBus;
use crate::context::AppContext;
use crate::error::CoreError;
use crate::gateway::InquiryApi;
use crate::model::{EntityId, EntityKind, Inquiry, InquiryListParams, InquiryStatus, NewInquiry};

impl Resource for Inquiry {
    const KIND: EntityKind = EntityKind::Inquiry;
    type ListParams = InquiryListParams;
    type Api = dyn InquiryApi;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn api(ctx: &AppContext) -> Arc<dyn InquiryApi> {
        Arc::clone(&ctx.gateways().inquiries)
    }

    fn bus(ctx: &AppContext) -> &InvalidationBus {
        &ctx.buses().inquiries
    }
}

pub type InquiriesHook = ListHook<Inquiry>;
pub type InquiryHook = RecordHook<Inquiry>;

async fn status_move(
    target: &impl MutationTarget<Inquiry>,
    id: &EntityId,
    to: InquiryStatus,
) -> Result<Precheck<Inquiry>, CoreError> {
    let record = current(target, id).await?;
    Ok(precheck(record, to, |r: &Inquiry| r.status, InquiryStatus::can_transition_to))
}

#[allow(async_fn_in_trait)]
pub trait InquiryActions: MutationTarget<Inquiry> + Sized {
    async fn create_inquiry(&self, payload: &NewInquiry) -> Result<Inquiry, CoreError> {
        let result = InquiryApi::create_inquiry(self.api(), payload).await;
        settle(self, result, LocalChange::Insert)
    }

    async fn mark_responded(&self, id: &EntityId) -> Result<Inquiry, CoreError> {
        match status_move(self, id, InquiryStatus::Responded).await? {
            Precheck::AlreadyThere(inquiry) => return Ok(inquiry),
            Precheck::Invalid(err) => return Err(err),
            Precheck::Proceed => {}
        }
        let result = InquiryApi::mark_responded(self.api(), id).await;
        settle(self, result, LocalChange::Upsert)
    }

    /// Closing an already-closed inquiry returns it unchanged and publishes
    /// nothing.
    async fn close_inquiry(&self, id: &EntityId) -> Result<Inquiry, CoreError> {
        match status_move(self, id, InquiryStatus::Closed).await? {
            Precheck::AlreadyThere(inquiry) => return Ok(inquiry),
            Precheck::Invalid(err) => return Err(err),
            Precheck::Proceed => {}
        }
        let result = InquiryApi::close_inquiry(self.api(), id).await;
        settle(self, result, LocalChange::Upsert)
    }
}

impl<T: MutationTarget<Inquiry>> InquiryActions for T {}
