use std::sync::Arc;

use super::{
    ListHook, LocalChange, MutationTarget, Precheck, RecordHook, Resource, current, precheck,
    settle, settle_removal,
};
use crate::bus::InvalidationBus;
use crate::context::AppContext;
use crate::error::CoreError;
use crate::gateway::CarApi;
use crate::model::{Car, CarListParams, CarPatch, CarStatus, EntityId, EntityKind, NewCar};

impl Resource for Car {
    const KIND: EntityKind = EntityKind::Car;
    type ListParams = CarListParams;
    type Api = dyn CarApi;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn api(ctx: &AppContext) -> Arc<dyn CarApi> {
        Arc::clone(&ctx.gateways().cars)
    }

    fn bus(ctx: &AppContext) -> &InvalidationBus {
        &ctx.buses().cars
    }
}

/// Dealer inventory, filtered.
pub type CarsHook = ListHook<Car>;
/// One listing.
pub type CarHook = RecordHook<Car>;

async fn status_move(
    target: &impl MutationTarget<Car>,
    id: &EntityId,
    to: CarStatus,
) -> Result<Precheck<Car>, CoreError> {
    let record = current(target, id).await?;
    Ok(precheck(record, to, |r: &Car| r.status, CarStatus::can_transition_to))
}

/// Listing mutations, available on both `CarsHook` and `CarHook`.
#[allow(async_fn_in_trait)]
pub trait CarActions: MutationTarget<Car> + Sized {
    async fn create_car(&self, payload: &NewCar) -> Result<Car, CoreError> {
        let result = CarApi::create_car(self.api(), payload).await;
        settle(self, result, LocalChange::Insert)
    }

    async fn update_car(&self, id: &EntityId, patch: &CarPatch) -> Result<Car, CoreError> {
        let result = CarApi::update_car(self.api(), id, patch).await;
        settle(self, result, LocalChange::Upsert)
    }

    async fn delete_car(&self, id: &EntityId) -> Result<(), CoreError> {
        match status_move(self, id, CarStatus::Deleted).await? {
            Precheck::AlreadyThere(_) => return Ok(()),
            Precheck::Invalid(err) => return Err(err),
            Precheck::Proceed => {}
        }
        let result = CarApi::delete_car(self.api(), id).await;
        settle_removal(self, id, result)
    }

    async fn mark_sold(&self, id: &EntityId) -> Result<Car, CoreError> {
        match status_move(self, id, CarStatus::Sold).await? {
            Precheck::AlreadyThere(car) => return Ok(car),
            Precheck::Invalid(err) => return Err(err),
            Precheck::Proceed => {}
        }
        let result = CarApi::mark_sold(self.api(), id).await;
        settle(self, result, LocalChange::Upsert)
    }

    /// Availability is independent of status.
    async fn toggle_availability(&self, id: &EntityId, available: bool) -> Result<Car, CoreError> {
        if let Some(car) = self.cached(id).filter(|c| c.is_available == available) {
            return Ok(car);
        }
        let result = CarApi::set_availability(self.api(), id, available).await;
        settle(self, result, LocalChange::Upsert)
    }

    async fn restore_car(&self, id: &EntityId) -> Result<Car, CoreError> {
        match status_move(self, id, CarStatus::Active).await? {
            Precheck::AlreadyThere(car) => return Ok(car),
            Precheck::Invalid(err) => return Err(err),
            Precheck::Proceed => {}
        }
        let result = CarApi::restore_car(self.api(), id).await;
        settle(self, result, LocalChange::Upsert)
    }
}

impl<T: MutationTarget<Car>> CarActions for T {}
