#![allow(clippy::unwrap_used)]
// The production stack against a wiremock server: `AppContext::connect`,
// file-backed session, `HttpGateway`, hooks.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use carlot_core::session::{FileStorage, SessionStorage, TOKEN_KEY};
use carlot_core::{
    AppContext, CarActions, CarHook, CarListParams, CarStatus, CarsHook, ClientConfig, EntityId,
    ErrorKind, Gateway, NoNavigation, RefreshOutcome,
};

fn dealer_json() -> Value {
    json!({
        "id": 3, "role": "dealer", "email": "dealer@example.com",
        "firstName": "Dana", "lastName": "Dealer",
        "dealer": {"businessName": "Dana's Autos"}
    })
}

fn car_json(id: u64, make: &str, status: &str) -> Value {
    json!({
        "id": id, "make": make, "model": "Camry", "year": 2020,
        "price": 21000.0, "mileage": 30000, "status": status,
        "isAvailable": true, "dealerId": 3, "images": []
    })
}

async fn setup() -> (MockServer, AppContext, tempfile::TempDir) {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = ClientConfig::new(Url::parse(&format!("{}/api", server.uri())).unwrap());
    config.session_dir = Some(dir.path().to_path_buf());
    let ctx = AppContext::connect(&config, Arc::new(NoNavigation)).unwrap();
    (server, ctx, dir)
}

async fn sign_in(server: &MockServer, ctx: &AppContext) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"email": "dealer@example.com", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"token": "tok-3", "user": dealer_json()}
        })))
        .mount(server)
        .await;

    let home = ctx
        .login("dealer@example.com", &SecretString::from("pw"))
        .await
        .unwrap();
    assert_eq!(home, "/dealer/home");
}

#[tokio::test]
async fn login_persists_token_and_authenticates_later_calls() {
    let (server, ctx, dir) = setup().await;
    sign_in(&server, &ctx).await;

    let storage = FileStorage::new(dir.path());
    assert_eq!(storage.get(TOKEN_KEY).as_deref(), Some("tok-3"));

    Mock::given(method("GET"))
        .and(path("/api/cars"))
        .and(query_param("make", "Toyota"))
        .and(header("authorization", "Bearer tok-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [car_json(7, "Toyota", "active")],
            "pagination": {"page": 1, "limit": 20, "total": 1, "pages": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let list = CarsHook::mount(&ctx, CarListParams::make("Toyota")).await;
    let page = list.page().unwrap();
    assert_eq!(page.pagination.total, 1);
    assert_eq!(page.items[0].make, "Toyota");
}

#[tokio::test]
async fn mark_sold_patches_and_returns_full_record() {
    let (server, ctx, _dir) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/cars/7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": car_json(7, "Toyota", "active")})),
        )
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/cars/7/sold"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": car_json(7, "Toyota", "sold")})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let detail = CarHook::mount(&ctx, EntityId::from(7)).await;
    let sold = detail.mark_sold(&EntityId::from(7)).await.unwrap();
    assert_eq!(sold.status, CarStatus::Sold);

    // Second call is answered from the cache.
    detail.mark_sold(&EntityId::from(7)).await.unwrap();
}

#[tokio::test]
async fn availability_sends_flag_in_body() {
    let (server, ctx, _dir) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/api/cars/7/availability"))
        .and(body_json(json!({"isAvailable": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "id": 7, "make": "Toyota", "model": "Camry", "year": 2020,
                "price": 21000.0, "status": "active", "isAvailable": false, "dealerId": 3
            }
        })))
        .mount(&server)
        .await;

    let detail = CarHook::new(&ctx, EntityId::from(7));
    let car = detail
        .toggle_availability(&EntityId::from(7), false)
        .await
        .unwrap();
    assert!(!car.is_available);
}

#[tokio::test]
async fn unauthorized_list_clears_persisted_session() {
    let (server, ctx, dir) = setup().await;
    sign_in(&server, &ctx).await;

    Mock::given(method("GET"))
        .and(path("/api/cars"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "jwt expired"})))
        .mount(&server)
        .await;

    let list = CarsHook::mount(&ctx, CarListParams::default()).await;
    let err = list.state().error.unwrap();
    assert_eq!(err.kind(), ErrorKind::Auth);

    assert!(!ctx.session().is_authenticated());
    assert_eq!(FileStorage::new(dir.path()).get(TOKEN_KEY), None);
}

#[tokio::test]
async fn refresh_keeps_session_when_server_is_down() {
    let (server, ctx, _dir) = setup().await;
    sign_in(&server, &ctx).await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert_eq!(ctx.refresh_session().await, RefreshOutcome::Unreachable);
    assert!(ctx.session().is_authenticated());
}

#[tokio::test]
async fn validation_errors_carry_fields() {
    let (server, ctx, _dir) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/cars/7"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Validation failed",
            "errors": {"price": "must be positive"}
        })))
        .mount(&server)
        .await;

    let list = CarsHook::new(&ctx);
    let patch = carlot_core::CarPatch {
        price: Some(-5.0),
        ..Default::default()
    };
    let err = list.update_car(&EntityId::from(7), &patch).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.field_errors().map(|f| f.len()), Some(1));
}

#[tokio::test]
async fn record_ids_are_encoded_as_one_path_segment() {
    let (server, ctx, _dir) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/cars/a%2Fb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": car_json(7, "Toyota", "active")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cars = &ctx.gateways().cars;
    let car = Gateway::get(cars.as_ref(), &EntityId::from("a/b")).await.unwrap();
    assert_eq!(car.id, EntityId::from(7));

    let err = Gateway::get(cars.as_ref(), &EntityId::from(".."))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
