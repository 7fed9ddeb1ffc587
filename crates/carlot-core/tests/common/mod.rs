// Shared fixtures: an in-memory marketplace server and a recording
// navigator. Each test binary uses a different subset.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::oneshot;

use carlot_core::{
    AppContext, Car, CarApi, CarListParams, CarPatch, CarRequest, CarRequestPatch, CarStatus,
    CoreError, EntityId, Gateway, Gateways, Inquiry, InquiryApi, InquiryListParams,
    InquiryStatus, LoginResponse, Navigator, NewCar, NewCarRequest, NewInquiry, Page,
    ProfileApi, ProfilePatch, RequestApi, RequestListParams, RequestStatus, Role, SessionStore,
    UserProfile,
};

// ── Fixtures ────────────────────────────────────────────────────────

pub fn car(id: u64, make: &str, model: &str) -> Car {
    Car {
        id: EntityId::from(id),
        make: make.into(),
        model: model.into(),
        year: 2020,
        price: 20_000.0,
        mileage: 40_000,
        status: CarStatus::Active,
        is_available: true,
        dealer_id: EntityId::from(3),
        images: Vec::new(),
        description: None,
        created_at: None,
        updated_at: None,
    }
}

pub fn inquiry(id: u64, status: InquiryStatus) -> Inquiry {
    Inquiry {
        id: EntityId::from(id),
        buyer_id: EntityId::from(1),
        dealer_id: EntityId::from(3),
        car_id: Some(EntityId::from(7)),
        message: "Is it still available?".into(),
        status,
        created_at: None,
        updated_at: None,
    }
}

pub fn request(id: u64, status: RequestStatus) -> CarRequest {
    CarRequest {
        id: EntityId::from(id),
        buyer_id: EntityId::from(1),
        make: Some("Toyota".into()),
        model: None,
        year_min: Some(2015),
        year_max: None,
        price_max: Some(25_000.0),
        requirements: "Low mileage".into(),
        status,
        created_at: None,
        updated_at: None,
    }
}

pub fn user(id: u64, role: Role) -> UserProfile {
    UserProfile {
        id: EntityId::from(id),
        role,
        email: format!("{role}@example.com"),
        first_name: "Test".into(),
        last_name: role.to_string(),
        phone: None,
        dealer: None,
        buyer: None,
    }
}

// ── Failure injection ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Auth,
    Server,
    Network,
    Validation,
}

impl Failure {
    fn into_error(self) -> CoreError {
        match self {
            Self::Auth => CoreError::AuthenticationFailed {
                message: "token expired".into(),
            },
            Self::Server => CoreError::Server {
                status: 500,
                message: "boom".into(),
            },
            Self::Network => CoreError::ConnectionFailed {
                url: "http://fake".into(),
                reason: "connection refused".into(),
            },
            Self::Validation => CoreError::ValidationFailed {
                message: "invalid".into(),
                fields: std::iter::once(("price".to_owned(), "must be positive".to_owned()))
                    .collect(),
            },
        }
    }
}

// ── FakeMarket ──────────────────────────────────────────────────────

/// In-memory server. Counts calls per operation, can fail an operation
/// once, and can hold a car listing response until released.
#[derive(Default)]
pub struct FakeMarket {
    cars: Mutex<Vec<Car>>,
    inquiries: Mutex<Vec<Inquiry>>,
    requests: Mutex<Vec<CarRequest>>,
    accounts: Mutex<HashMap<String, UserProfile>>,
    me: Mutex<Option<UserProfile>>,
    calls: Mutex<HashMap<String, usize>>,
    failures: Mutex<HashMap<String, Failure>>,
    gates: Mutex<HashMap<String, VecDeque<oneshot::Receiver<()>>>>,
    next_id: Mutex<u64>,
}

impl FakeMarket {
    pub fn new() -> Arc<Self> {
        let market = Self::default();
        *market.next_id.lock().unwrap() = 1000;
        Arc::new(market)
    }

    pub fn seeded() -> Arc<Self> {
        let market = Self::new();
        market.with_cars(vec![
            car(7, "Toyota", "Camry"),
            car(8, "Toyota", "Corolla"),
            car(9, "Honda", "Civic"),
        ]);
        market.with_inquiries(vec![
            inquiry(41, InquiryStatus::New),
            inquiry(42, InquiryStatus::Closed),
        ]);
        market.with_requests(vec![request(5, RequestStatus::Active)]);
        market.with_account(user(1, Role::Buyer));
        market.with_account(user(3, Role::Dealer));
        market
    }

    pub fn with_cars(&self, cars: Vec<Car>) {
        *self.cars.lock().unwrap() = cars;
    }

    pub fn with_inquiries(&self, inquiries: Vec<Inquiry>) {
        *self.inquiries.lock().unwrap() = inquiries;
    }

    pub fn with_requests(&self, requests: Vec<CarRequest>) {
        *self.requests.lock().unwrap() = requests;
    }

    pub fn with_account(&self, user: UserProfile) {
        self.accounts
            .lock()
            .unwrap()
            .insert(user.email.clone(), user);
    }

    /// Change a car behind every client's back.
    pub fn edit_car(&self, id: u64, edit: impl FnOnce(&mut Car)) {
        let mut cars = self.cars.lock().unwrap();
        if let Some(car) = cars.iter_mut().find(|c| c.id == EntityId::from(id)) {
            edit(car);
        }
    }

    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    pub fn fail_next(&self, op: &str, failure: Failure) {
        self.failures.lock().unwrap().insert(op.to_owned(), failure);
    }

    /// Hold the next `cars.list` for `make` until the sender fires. The
    /// response reflects server state at call time, not release time.
    pub fn gate_car_list(&self, make: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .unwrap()
            .entry(make.to_owned())
            .or_default()
            .push_back(rx);
        tx
    }

    fn enter(&self, op: &str) -> Result<(), CoreError> {
        *self.calls.lock().unwrap().entry(op.to_owned()).or_default() += 1;
        match self.failures.lock().unwrap().remove(op) {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }

    fn take_gate(&self, make: Option<&str>) -> Option<oneshot::Receiver<()>> {
        let make = make?;
        self.gates.lock().unwrap().get_mut(make)?.pop_front()
    }

    fn next_id(&self) -> EntityId {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        EntityId::from(*next)
    }

    fn update_car(&self, id: &EntityId, f: impl FnOnce(&mut Car)) -> Result<Car, CoreError> {
        let mut cars = self.cars.lock().unwrap();
        let car = cars
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| not_found("cars", id))?;
        f(car);
        Ok(car.clone())
    }

    fn update_inquiry(
        &self,
        id: &EntityId,
        f: impl FnOnce(&mut Inquiry),
    ) -> Result<Inquiry, CoreError> {
        let mut inquiries = self.inquiries.lock().unwrap();
        let inquiry = inquiries
            .iter_mut()
            .find(|i| &i.id == id)
            .ok_or_else(|| not_found("inquiries", id))?;
        f(inquiry);
        Ok(inquiry.clone())
    }

    fn update_request(
        &self,
        id: &EntityId,
        f: impl FnOnce(&mut CarRequest),
    ) -> Result<CarRequest, CoreError> {
        let mut requests = self.requests.lock().unwrap();
        let request = requests
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| not_found("requests", id))?;
        f(request);
        Ok(request.clone())
    }
}

fn not_found(kind: &str, id: &EntityId) -> CoreError {
    CoreError::NotFound {
        identifier: format!("/{kind}/{id}"),
    }
}

#[async_trait]
impl Gateway<Car, CarListParams> for FakeMarket {
    async fn list(&self, params: &CarListParams) -> Result<Page<Car>, CoreError> {
        self.enter("cars.list")?;
        let items: Vec<Car> = self
            .cars
            .lock()
            .unwrap()
            .iter()
            .filter(|c| params.matches(c))
            .cloned()
            .collect();
        if let Some(gate) = self.take_gate(params.make.as_deref()) {
            let _ = gate.await;
        }
        Ok(Page::unpaged(items))
    }

    async fn get(&self, id: &EntityId) -> Result<Car, CoreError> {
        self.enter("cars.get")?;
        self.cars
            .lock()
            .unwrap()
            .iter()
            .find(|c| &c.id == id)
            .cloned()
            .ok_or_else(|| not_found("cars", id))
    }
}

#[async_trait]
impl CarApi for FakeMarket {
    async fn create_car(&self, payload: &NewCar) -> Result<Car, CoreError> {
        self.enter("cars.create")?;
        let mut created = car(0, &payload.make, &payload.model);
        created.id = self.next_id();
        created.year = payload.year;
        created.price = payload.price;
        created.mileage = payload.mileage;
        self.cars.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_car(&self, id: &EntityId, patch: &CarPatch) -> Result<Car, CoreError> {
        self.enter("cars.update")?;
        FakeMarket::update_car(self, id, |c| {
            if let Some(price) = patch.price {
                c.price = price;
            }
            if let Some(mileage) = patch.mileage {
                c.mileage = mileage;
            }
        })
    }

    async fn delete_car(&self, id: &EntityId) -> Result<(), CoreError> {
        self.enter("cars.delete")?;
        FakeMarket::update_car(self, id, |c| c.status = CarStatus::Deleted).map(|_| ())
    }

    async fn mark_sold(&self, id: &EntityId) -> Result<Car, CoreError> {
        self.enter("cars.mark_sold")?;
        FakeMarket::update_car(self, id, |c| c.status = CarStatus::Sold)
    }

    async fn set_availability(&self, id: &EntityId, available: bool) -> Result<Car, CoreError> {
        self.enter("cars.availability")?;
        FakeMarket::update_car(self, id, |c| c.is_available = available)
    }

    async fn restore_car(&self, id: &EntityId) -> Result<Car, CoreError> {
        self.enter("cars.restore")?;
        FakeMarket::update_car(self, id, |c| c.status = CarStatus::Active)
    }
}

#[async_trait]
impl Gateway<Inquiry, InquiryListParams> for FakeMarket {
    async fn list(&self, params: &InquiryListParams) -> Result<Page<Inquiry>, CoreError> {
        self.enter("inquiries.list")?;
        let items = self
            .inquiries
            .lock()
            .unwrap()
            .iter()
            .filter(|i| params.matches(i))
            .cloned()
            .collect();
        Ok(Page::unpaged(items))
    }

    async fn get(&self, id: &EntityId) -> Result<Inquiry, CoreError> {
        self.enter("inquiries.get")?;
        self.inquiries
            .lock()
            .unwrap()
            .iter()
            .find(|i| &i.id == id)
            .cloned()
            .ok_or_else(|| not_found("inquiries", id))
    }
}

#[async_trait]
impl InquiryApi for FakeMarket {
    async fn create_inquiry(&self, payload: &NewInquiry) -> Result<Inquiry, CoreError> {
        self.enter("inquiries.create")?;
        let mut created = inquiry(0, InquiryStatus::New);
        created.id = self.next_id();
        created.dealer_id = payload.dealer_id.clone();
        created.car_id = payload.car_id.clone();
        created.message = payload.message.clone();
        self.inquiries.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn mark_responded(&self, id: &EntityId) -> Result<Inquiry, CoreError> {
        self.enter("inquiries.respond")?;
        self.update_inquiry(id, |i| i.status = InquiryStatus::Responded)
    }

    async fn close_inquiry(&self, id: &EntityId) -> Result<Inquiry, CoreError> {
        self.enter("inquiries.close")?;
        self.update_inquiry(id, |i| i.status = InquiryStatus::Closed)
    }
}

#[async_trait]
impl Gateway<CarRequest, RequestListParams> for FakeMarket {
    async fn list(&self, params: &RequestListParams) -> Result<Page<CarRequest>, CoreError> {
        self.enter("requests.list")?;
        let items = self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| params.matches(r))
            .cloned()
            .collect();
        Ok(Page::unpaged(items))
    }

    async fn get(&self, id: &EntityId) -> Result<CarRequest, CoreError> {
        self.enter("requests.get")?;
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| &r.id == id)
            .cloned()
            .ok_or_else(|| not_found("requests", id))
    }
}

#[async_trait]
impl RequestApi for FakeMarket {
    async fn create_request(&self, payload: &NewCarRequest) -> Result<CarRequest, CoreError> {
        self.enter("requests.create")?;
        let mut created = request(0, RequestStatus::Active);
        created.id = self.next_id();
        created.make = payload.make.clone();
        created.requirements = payload.requirements.clone();
        self.requests.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_request(
        &self,
        id: &EntityId,
        patch: &CarRequestPatch,
    ) -> Result<CarRequest, CoreError> {
        self.enter("requests.update")?;
        FakeMarket::update_request(self, id, |r| {
            if let Some(req) = &patch.requirements {
                r.requirements.clone_from(req);
            }
        })
    }

    async fn close_request(&self, id: &EntityId) -> Result<CarRequest, CoreError> {
        self.enter("requests.close")?;
        FakeMarket::update_request(self, id, |r| r.status = RequestStatus::Closed)
    }

    async fn reopen_request(&self, id: &EntityId) -> Result<CarRequest, CoreError> {
        self.enter("requests.reopen")?;
        FakeMarket::update_request(self, id, |r| r.status = RequestStatus::Active)
    }
}

#[async_trait]
impl ProfileApi for FakeMarket {
    async fn login(&self, email: &str, _password: &SecretString) -> Result<LoginResponse, CoreError> {
        self.enter("auth.login")?;
        let user = self
            .accounts
            .lock()
            .unwrap()
            .get(email)
            .cloned()
            .ok_or_else(|| CoreError::AuthenticationFailed {
                message: "bad credentials".into(),
            })?;
        *self.me.lock().unwrap() = Some(user.clone());
        Ok(LoginResponse {
            token: format!("token-{}", user.id),
            user,
        })
    }

    async fn logout(&self) -> Result<(), CoreError> {
        self.enter("auth.logout")?;
        *self.me.lock().unwrap() = None;
        Ok(())
    }

    async fn current_user(&self) -> Result<UserProfile, CoreError> {
        self.enter("auth.me")?;
        self.me
            .lock()
            .unwrap()
            .clone()
            .ok_or(CoreError::NotAuthenticated)
    }

    async fn update_profile(&self, patch: &ProfilePatch) -> Result<UserProfile, CoreError> {
        self.enter("users.update")?;
        let mut me = self.me.lock().unwrap();
        let user = me.as_mut().ok_or(CoreError::NotAuthenticated)?;
        if let Some(first) = &patch.first_name {
            user.first_name.clone_from(first);
        }
        if let Some(phone) = &patch.phone {
            user.phone = Some(phone.clone());
        }
        Ok(user.clone())
    }
}

// ── Navigation ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_owned());
    }
}

// ── Context ─────────────────────────────────────────────────────────

pub struct Harness {
    pub market: Arc<FakeMarket>,
    pub ctx: AppContext,
    pub nav: Arc<RecordingNavigator>,
}

pub fn harness(market: Arc<FakeMarket>) -> Harness {
    harness_with_session(market, SessionStore::in_memory())
}

pub fn harness_with_session(market: Arc<FakeMarket>, session: SessionStore) -> Harness {
    let nav = Arc::new(RecordingNavigator::default());
    let ctx = AppContext::builder(Gateways::from_shared(market.clone()), Arc::new(session))
        .navigator(nav.clone())
        .build();
    Harness { market, ctx, nav }
}

/// Poll `cond` while letting spawned tasks run; panics after two seconds.
pub async fn eventually(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {what}");
}

/// Let every ready task run a few times.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Drive `fut` on a spawned task so the test can interleave with it.
pub fn spawn<F>(fut: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(fut)
}
