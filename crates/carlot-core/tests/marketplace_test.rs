#![allow(clippy::unwrap_used)]
// End-to-end flows across hooks, session, guard, and actions.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use secrecy::SecretString;

use carlot_core::session::{MemoryStorage, SessionStorage, TOKEN_KEY, USER_KEY};
use carlot_core::{
    CarActions, CarHook, CarListParams, CarPatch, CarStatus, CarsHook, CoreError, EntityId,
    ErrorKind, GuardOptions, GuardState, InquiriesHook, InquiryActions, InquiryHook,
    InquiryListParams, InquiryStatus, NewCar, ProfileHook, ProfilePatch, RefreshOutcome,
    RequestActions, RequestListParams, RequestStatus, RequestsHook, Role, SessionStore,
};
use common::{FakeMarket, Failure, eventually, harness, harness_with_session, settle, user};

fn password() -> SecretString {
    SecretString::from("hunter2")
}

// ── Cars ────────────────────────────────────────────────────────────

#[tokio::test]
async fn marking_sold_refreshes_filtered_view_without_losing_rows() {
    let h = harness(FakeMarket::seeded());
    h.ctx.login("dealer@example.com", &password()).await.unwrap();

    let toyotas = CarsHook::mount(&h.ctx, CarListParams::make("Toyota")).await;
    let ids: Vec<EntityId> = toyotas.items().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![EntityId::from(7), EntityId::from(8)]);

    let detail = CarHook::mount(&h.ctx, EntityId::from(7)).await;
    let sold = detail.mark_sold(&EntityId::from(7)).await.unwrap();
    assert_eq!(sold.status, CarStatus::Sold);

    eventually("filtered view refetched", || h.market.calls("cars.list") == 2).await;
    eventually("sold car visible in list", || {
        toyotas
            .find(&EntityId::from(7))
            .is_some_and(|c| c.status == CarStatus::Sold)
    })
    .await;

    assert_eq!(toyotas.params(), Some(CarListParams::make("Toyota")));
    let corolla = toyotas.find(&EntityId::from(8)).unwrap();
    assert_eq!(corolla.status, CarStatus::Active);
    assert_eq!(toyotas.items().len(), 2);
}

#[tokio::test]
async fn list_hook_updates_itself_optimistically() {
    let h = harness(FakeMarket::seeded());
    let list = CarsHook::mount(&h.ctx, CarListParams::default()).await;

    list.toggle_availability(&EntityId::from(9), false).await.unwrap();
    assert!(!list.find(&EntityId::from(9)).unwrap().is_available);

    // Already unavailable: no request.
    list.toggle_availability(&EntityId::from(9), false).await.unwrap();
    assert_eq!(h.market.calls("cars.availability"), 1);

    settle().await;
    assert_eq!(h.market.calls("cars.list"), 1);
}

#[tokio::test]
async fn created_car_lands_first_and_others_refetch() {
    let h = harness(FakeMarket::seeded());
    let mine = CarsHook::mount(&h.ctx, CarListParams::default()).await;
    let theirs = CarsHook::mount(&h.ctx, CarListParams::default()).await;

    let created = mine
        .create_car(&NewCar {
            make: "Mazda".into(),
            model: "3".into(),
            year: 2022,
            price: 23_000.0,
            mileage: 5_000,
            images: Vec::new(),
            description: None,
        })
        .await
        .unwrap();

    assert_eq!(mine.items().first().map(|c| c.id.clone()), Some(created.id.clone()));
    assert_eq!(mine.page().unwrap().pagination.total, 4);
    eventually("other view sees new car", || theirs.find(&created.id).is_some()).await;
}

#[tokio::test]
async fn sold_car_cannot_be_deleted() {
    let h = harness(FakeMarket::seeded());
    let detail = CarHook::mount(&h.ctx, EntityId::from(7)).await;
    detail.mark_sold(&EntityId::from(7)).await.unwrap();

    let err = detail.delete_car(&EntityId::from(7)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(matches!(err, CoreError::InvalidTransition { .. }));
    assert_eq!(h.market.calls("cars.delete"), 0);
}

#[tokio::test]
async fn delete_then_restore() {
    let h = harness(FakeMarket::seeded());
    let list = CarsHook::mount(&h.ctx, CarListParams::default()).await;
    let detail = CarHook::mount(&h.ctx, EntityId::from(9)).await;

    list.delete_car(&EntityId::from(9)).await.unwrap();
    assert!(list.find(&EntityId::from(9)).is_none());
    eventually("detail refetched", || {
        detail
            .record()
            .is_some_and(|c| c.status == CarStatus::Deleted)
    })
    .await;

    let restored = detail.restore_car(&EntityId::from(9)).await.unwrap();
    assert_eq!(restored.status, CarStatus::Active);
    eventually("list refetched after restore", || list.find(&EntityId::from(9)).is_some()).await;
}

#[tokio::test]
async fn server_validation_goes_back_to_the_caller_only() {
    let h = harness(FakeMarket::seeded());
    let list = CarsHook::mount(&h.ctx, CarListParams::default()).await;
    let other = CarsHook::mount(&h.ctx, CarListParams::default()).await;

    h.market.fail_next("cars.update", Failure::Validation);
    let patch = CarPatch {
        price: Some(-1.0),
        ..CarPatch::default()
    };
    let err = list.update_car(&EntityId::from(7), &patch).await.unwrap_err();

    assert_eq!(
        err.field_errors().and_then(|f| f.get("price")).map(String::as_str),
        Some("must be positive")
    );
    assert!(list.state().error.is_none());
    settle().await;
    assert_eq!(h.market.calls("cars.list"), 2);
    assert!(other.state().error.is_none());
}

// ── Inquiries ───────────────────────────────────────────────────────

#[tokio::test]
async fn closing_a_closed_inquiry_is_a_silent_noop() {
    let h = harness(FakeMarket::seeded());
    let inbox = InquiriesHook::mount(&h.ctx, InquiryListParams::default()).await;
    let watcher = InquiriesHook::mount(&h.ctx, InquiryListParams::default()).await;
    let list_calls = h.market.calls("inquiries.list");

    let closed = inbox.close_inquiry(&EntityId::from(42)).await.unwrap();
    assert_eq!(closed.status, InquiryStatus::Closed);
    settle().await;
    assert_eq!(h.market.calls("inquiries.close"), 0);
    assert_eq!(h.market.calls("inquiries.list"), list_calls);

    inbox.close_inquiry(&EntityId::from(41)).await.unwrap();
    assert_eq!(h.market.calls("inquiries.close"), 1);
    eventually("watcher refetched", || {
        watcher
            .find(&EntityId::from(41))
            .is_some_and(|i| i.status == InquiryStatus::Closed)
    })
    .await;
}

#[tokio::test]
async fn closing_from_a_view_without_the_record_checks_the_server_copy() {
    let h = harness(FakeMarket::seeded());
    let watcher = InquiriesHook::mount(&h.ctx, InquiryListParams::default()).await;
    let open_only = InquiriesHook::mount(
        &h.ctx,
        InquiryListParams {
            status: Some(InquiryStatus::New),
            ..InquiryListParams::default()
        },
    )
    .await;
    assert!(open_only.find(&EntityId::from(42)).is_none());
    let list_calls = h.market.calls("inquiries.list");

    let closed = open_only.close_inquiry(&EntityId::from(42)).await.unwrap();
    assert_eq!(closed.status, InquiryStatus::Closed);
    settle().await;

    assert_eq!(h.market.calls("inquiries.get"), 1);
    assert_eq!(h.market.calls("inquiries.close"), 0);
    assert_eq!(h.market.calls("inquiries.list"), list_calls);
    assert_eq!(watcher.items().len(), 2);
}

#[tokio::test]
async fn unfetched_detail_still_rejects_impossible_moves() {
    let h = harness(FakeMarket::seeded());
    h.market.edit_car(8, |c| c.status = CarStatus::Sold);
    let detail = CarHook::new(&h.ctx, EntityId::from(8));

    let err = detail.delete_car(&EntityId::from(8)).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidTransition { .. }));
    assert_eq!(h.market.calls("cars.get"), 1);
    assert_eq!(h.market.calls("cars.delete"), 0);

    let sold = detail.mark_sold(&EntityId::from(8)).await.unwrap();
    assert_eq!(sold.status, CarStatus::Sold);
    assert_eq!(h.market.calls("cars.mark_sold"), 0);
}

#[tokio::test]
async fn closed_inquiry_cannot_be_answered() {
    let h = harness(FakeMarket::seeded());
    let detail = InquiryHook::mount(&h.ctx, EntityId::from(42)).await;

    let err = detail.mark_responded(&EntityId::from(42)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.market.calls("inquiries.respond"), 0);
}

#[tokio::test]
async fn inquiry_moves_forward() {
    let h = harness(FakeMarket::seeded());
    let detail = InquiryHook::mount(&h.ctx, EntityId::from(41)).await;

    let responded = detail.mark_responded(&EntityId::from(41)).await.unwrap();
    assert_eq!(responded.status, InquiryStatus::Responded);
    let closed = detail.close_inquiry(&EntityId::from(41)).await.unwrap();
    assert_eq!(closed.status, InquiryStatus::Closed);
    assert_eq!(detail.record().unwrap().status, InquiryStatus::Closed);
}

// ── Requests ────────────────────────────────────────────────────────

#[tokio::test]
async fn requests_close_and_reopen() {
    let h = harness(FakeMarket::seeded());
    let mine = RequestsHook::mount(&h.ctx, RequestListParams::default()).await;

    let closed = mine.close_request(&EntityId::from(5)).await.unwrap();
    assert_eq!(closed.status, RequestStatus::Closed);
    mine.close_request(&EntityId::from(5)).await.unwrap();
    assert_eq!(h.market.calls("requests.close"), 1);

    let reopened = mine.reopen_request(&EntityId::from(5)).await.unwrap();
    assert_eq!(reopened.status, RequestStatus::Active);
    assert_eq!(
        mine.find(&EntityId::from(5)).map(|r| r.status),
        Some(RequestStatus::Active)
    );
}

// ── Session and guard ───────────────────────────────────────────────

#[tokio::test]
async fn login_navigates_to_role_home() {
    let h = harness(FakeMarket::seeded());
    let home = h.ctx.login("buyer@example.com", &password()).await.unwrap();
    assert_eq!(home, "/buyer/home");
    assert_eq!(h.nav.routes(), vec!["/buyer/home".to_owned()]);
    assert_eq!(h.ctx.session().role(), Some(Role::Buyer));
}

#[tokio::test]
async fn dealer_on_buyer_view_is_sent_home_once() {
    let h = harness(FakeMarket::seeded());
    h.ctx.login("dealer@example.com", &password()).await.unwrap();

    let guard = h.ctx.guard(GuardOptions::role(Role::Buyer));
    for _ in 0..3 {
        guard.evaluate(&h.ctx.session().state());
    }

    assert!(guard.state().is_denied());
    assert_eq!(
        h.nav.routes(),
        vec!["/dealer/home".to_owned(), "/dealer/home".to_owned()]
    );
    assert_eq!(guard.redirect_count(), 1);
}

#[tokio::test]
async fn auth_failure_anywhere_tears_down_the_session_once() {
    let h = harness(FakeMarket::seeded());
    h.ctx.login("dealer@example.com", &password()).await.unwrap();
    let cars = CarsHook::mount(&h.ctx, CarListParams::default()).await;
    let inquiries = InquiriesHook::mount(&h.ctx, InquiryListParams::default()).await;

    h.market.fail_next("cars.list", Failure::Auth);
    h.market.fail_next("inquiries.list", Failure::Auth);
    cars.refetch().await;
    inquiries.refetch().await;

    assert!(!h.ctx.session().is_authenticated());
    assert!(h.ctx.session().token().is_none());
    assert_eq!(
        h.nav.routes(),
        vec!["/dealer/home".to_owned(), "/login".to_owned()]
    );
    // Last good data stays for whatever renders during the redirect.
    assert_eq!(cars.items().len(), 3);
}

#[tokio::test]
async fn restored_session_checks_then_resolves() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set(TOKEN_KEY, "stale").unwrap();
    storage
        .set(USER_KEY, &serde_json::to_string(&user(1, Role::Buyer)).unwrap())
        .unwrap();
    let h = harness_with_session(FakeMarket::seeded(), SessionStore::load(storage.clone()));

    let guard = h.ctx.guard(GuardOptions::role(Role::Buyer));
    assert_eq!(guard.evaluate(&h.ctx.session().state()), GuardState::Checking);
    assert!(!guard.can_render());

    // The fake server has nobody signed in, so the token is rejected.
    assert_eq!(h.ctx.refresh_session().await, RefreshOutcome::Rejected);
    assert!(guard.evaluate(&h.ctx.session().state()).is_denied());
    assert_eq!(h.nav.routes(), vec!["/login".to_owned()]);
    assert_eq!(storage.get(TOKEN_KEY), None);
}

#[tokio::test]
async fn guard_run_tracks_login_and_logout() {
    let h = harness(FakeMarket::seeded());
    let guard = Arc::new(h.ctx.guard(GuardOptions::authenticated()));
    let cancel = tokio_util::sync::CancellationToken::new();
    let task = {
        let guard = Arc::clone(&guard);
        let rx = h.ctx.session().watch();
        let cancel = cancel.clone();
        tokio::spawn(async move { guard.run(rx, cancel).await })
    };

    eventually("anonymous denied", || guard.state().is_denied()).await;
    h.ctx.login("buyer@example.com", &password()).await.unwrap();
    eventually("granted after login", || guard.state().is_granted()).await;
    h.ctx.logout().await;
    eventually("denied after logout", || guard.state().is_denied()).await;

    cancel.cancel();
    task.await.unwrap();
    assert_eq!(
        h.nav.routes(),
        vec![
            "/login".to_owned(),
            "/buyer/home".to_owned(),
            "/login".to_owned(),
            "/login".to_owned(),
        ]
    );
}

#[tokio::test]
async fn profile_hook_writes_back_to_session() {
    let h = harness(FakeMarket::seeded());
    h.ctx.login("buyer@example.com", &password()).await.unwrap();

    let profile = ProfileHook::mount(&h.ctx).await;
    assert_eq!(profile.profile().unwrap().email, "buyer@example.com");

    let patch = ProfilePatch {
        first_name: Some("Robin".into()),
        ..ProfilePatch::default()
    };
    profile.update(&patch).await.unwrap();
    assert_eq!(h.ctx.session().user().unwrap().first_name, "Robin");
    assert_eq!(profile.profile().unwrap().first_name, "Robin");
}
