use async_trait::async_trait;
use carlot_api::ApiClient;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use super::{CarApi, Gateway, InquiryApi, ProfileApi, RequestApi};
use crate::error::CoreError;
use crate::model::{
    Car, CarListParams, CarPatch, CarRequest, CarRequestPatch, EntityId, Inquiry,
    InquiryListParams, LoginResponse, NewCar, NewCarRequest, NewInquiry, Page, ProfilePatch,
    RequestListParams, UserProfile,
};

/// REST implementation of every gateway trait over one `ApiClient`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: ApiClient,
}

impl HttpGateway {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

/// `{collection}/{id}`, the id percent-encoded as a single segment.
fn record_path(collection: &str, id: &EntityId) -> Result<String, CoreError> {
    let segment = ApiClient::path_segment(&id.to_string())?;
    Ok(format!("{collection}/{segment}"))
}

// ── Cars ─────────────────────────────────────────────────────────────

#[async_trait]
impl Gateway<Car, CarListParams> for HttpGateway {
    async fn list(&self, params: &CarListParams) -> Result<Page<Car>, CoreError> {
        Ok(self.client.list("cars", params).await?)
    }

    async fn get(&self, id: &EntityId) -> Result<Car, CoreError> {
        Ok(self.client.get(&record_path("cars", id)?).await?)
    }
}

#[async_trait]
impl CarApi for HttpGateway {
    async fn create_car(&self, payload: &NewCar) -> Result<Car, CoreError> {
        Ok(self.client.post("cars", payload).await?)
    }

    async fn update_car(&self, id: &EntityId, patch: &CarPatch) -> Result<Car, CoreError> {
        Ok(self.client.put(&record_path("cars", id)?, patch).await?)
    }

    async fn delete_car(&self, id: &EntityId) -> Result<(), CoreError> {
        Ok(self.client.delete(&record_path("cars", id)?).await?)
    }

    async fn mark_sold(&self, id: &EntityId) -> Result<Car, CoreError> {
        Ok(self
            .client
            .patch(&format!("{}/sold", record_path("cars", id)?), &json!({}))
            .await?)
    }

    async fn set_availability(&self, id: &EntityId, available: bool) -> Result<Car, CoreError> {
        let body = json!({ "isAvailable": available });
        Ok(self
            .client
            .patch(&format!("{}/availability", record_path("cars", id)?), &body)
            .await?)
    }

    async fn restore_car(&self, id: &EntityId) -> Result<Car, CoreError> {
        Ok(self
            .client
            .patch(&format!("{}/restore", record_path("cars", id)?), &json!({}))
            .await?)
    }
}

// ── Inquiries ────────────────────────────────────────────────────────

#[async_trait]
impl Gateway<Inquiry, InquiryListParams> for HttpGateway {
    async fn list(&self, params: &InquiryListParams) -> Result<Page<Inquiry>, CoreError> {
        Ok(self.client.list("inquiries", params).await?)
    }

    async fn get(&self, id: &EntityId) -> Result<Inquiry, CoreError> {
        Ok(self.client.get(&record_path("inquiries", id)?).await?)
    }
}

#[async_trait]
impl InquiryApi for HttpGateway {
    async fn create_inquiry(&self, payload: &NewInquiry) -> Result<Inquiry, CoreError> {
        Ok(self.client.post("inquiries", payload).await?)
    }

    async fn mark_responded(&self, id: &EntityId) -> Result<Inquiry, CoreError> {
        Ok(self
            .client
            .patch(&format!("{}/respond", record_path("inquiries", id)?), &json!({}))
            .await?)
    }

    async fn close_inquiry(&self, id: &EntityId) -> Result<Inquiry, CoreError> {
        Ok(self
            .client
            .patch(&format!("{}/close", record_path("inquiries", id)?), &json!({}))
            .await?)
    }
}

// ── Requests ─────────────────────────────────────────────────────────

#[async_trait]
impl Gateway<CarRequest, RequestListParams> for HttpGateway {
    async fn list(&self, params: &RequestListParams) -> Result<Page<CarRequest>, CoreError> {
        Ok(self.client.list("requests", params).await?)
    }

    async fn get(&self, id: &EntityId) -> Result<CarRequest, CoreError> {
        Ok(self.client.get(&record_path("requests", id)?).await?)
    }
}

#[async_trait]
impl RequestApi for HttpGateway {
    async fn create_request(&self, payload: &NewCarRequest) -> Result<CarRequest, CoreError> {
        Ok(self.client.post("requests", payload).await?)
    }

    async fn update_request(
        &self,
        id: &EntityId,
        patch: &CarRequestPatch,
    ) -> Result<CarRequest, CoreError> {
        Ok(self.client.put(&record_path("requests", id)?, patch).await?)
    }

    async fn close_request(&self, id: &EntityId) -> Result<CarRequest, CoreError> {
        Ok(self
            .client
            .patch(&format!("{}/close", record_path("requests", id)?), &json!({}))
            .await?)
    }

    async fn reopen_request(&self, id: &EntityId) -> Result<CarRequest, CoreError> {
        Ok(self
            .client
            .patch(&format!("{}/reopen", record_path("requests", id)?), &json!({}))
            .await?)
    }
}

// ── Auth & profile ───────────────────────────────────────────────────

#[async_trait]
impl ProfileApi for HttpGateway {
    async fn login(&self, email: &str, password: &SecretString) -> Result<LoginResponse, CoreError> {
        let body = json!({
            "email": email,
            "password": password.expose_secret(),
        });
        Ok(self.client.post("auth/login", &body).await?)
    }

    async fn logout(&self) -> Result<(), CoreError> {
        Ok(self.client.post_discard("auth/logout", &json!({})).await?)
    }

    async fn current_user(&self) -> Result<UserProfile, CoreError> {
        Ok(self.client.get("auth/me").await?)
    }

    async fn update_profile(&self, patch: &ProfilePatch) -> Result<UserProfile, CoreError> {
        Ok(self.client.put("users/profile", patch).await?)
    }
}
