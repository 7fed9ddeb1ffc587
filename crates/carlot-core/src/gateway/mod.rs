// ── API gateway ──
//
// Stateless request/response operations per entity. Hooks only ever talk
// to these traits; `HttpGateway` is the production implementation and
// tests substitute in-memory doubles.

mod http;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::CoreError;
use crate::model::{
    Car, CarListParams, CarPatch, CarRequest, CarRequestPatch, EntityId, Inquiry,
    InquiryListParams, LoginResponse, NewCar, NewCarRequest, NewInquiry, Page, ProfilePatch,
    RequestListParams, UserProfile,
};

pub use http::HttpGateway;

/// Reads shared by every listable entity.
#[async_trait]
pub trait Gateway<R, P>: Send + Sync
where
    R: Send,
    P: Sync,
{
    async fn list(&self, params: &P) -> Result<Page<R>, CoreError>;

    async fn get(&self, id: &EntityId) -> Result<R, CoreError>;
}

/// Car listings. Every action returns the full updated record.
#[async_trait]
pub trait CarApi: Gateway<Car, CarListParams> {
    async fn create_car(&self, payload: &NewCar) -> Result<Car, CoreError>;

    async fn update_car(&self, id: &EntityId, patch: &CarPatch) -> Result<Car, CoreError>;

    async fn delete_car(&self, id: &EntityId) -> Result<(), CoreError>;

    async fn mark_sold(&self, id: &EntityId) -> Result<Car, CoreError>;

    async fn set_availability(&self, id: &EntityId, available: bool) -> Result<Car, CoreError>;

    /// Un-delete a listing.
    async fn restore_car(&self, id: &EntityId) -> Result<Car, CoreError>;
}

#[async_trait]
pub trait InquiryApi: Gateway<Inquiry, InquiryListParams> {
    async fn create_inquiry(&self, payload: &NewInquiry) -> Result<Inquiry, CoreError>;

    async fn mark_responded(&self, id: &EntityId) -> Result<Inquiry, CoreError>;

    async fn close_inquiry(&self, id: &EntityId) -> Result<Inquiry, CoreError>;
}

#[async_trait]
pub trait RequestApi: Gateway<CarRequest, RequestListParams> {
    async fn create_request(&self, payload: &NewCarRequest) -> Result<CarRequest, CoreError>;

    async fn update_request(
        &self,
        id: &EntityId,
        patch: &CarRequestPatch,
    ) -> Result<CarRequest, CoreError>;

    async fn close_request(&self, id: &EntityId) -> Result<CarRequest, CoreError>;

    async fn reopen_request(&self, id: &EntityId) -> Result<CarRequest, CoreError>;
}

/// Authentication and the signed-in user's own profile.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    async fn login(&self, email: &str, password: &SecretString) -> Result<LoginResponse, CoreError>;

    async fn logout(&self) -> Result<(), CoreError>;

    /// Profile of the token's owner; the token check behind `refresh()`.
    async fn current_user(&self) -> Result<UserProfile, CoreError>;

    async fn update_profile(&self, patch: &ProfilePatch) -> Result<UserProfile, CoreError>;
}
