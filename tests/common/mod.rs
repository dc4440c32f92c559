#![allow(dead_code)]

use std::{
    net::TcpListener,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpRequest, HttpResponse, HttpServer, Responder};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use travel_booking_web::{
    config::AppConfig,
    routes,
    services::{
        backend::BackendClient, checkout_service::ConfirmationLatch,
        handoff_storage::HandoffStorage, price_estimator::PricingHeuristics,
    },
    state::ReservationStore,
};

pub const CHECKOUT_SESSION_ID: &str = "cs_test_42";
pub const BACKEND_TOTAL: f64 = 1111.0;
pub const GOOD_PASSWORD: &str = "correct-horse";

/// In-process stand-in for the booking REST backend. Lists come wrapped in
/// `$values` envelopes the way the real serializer emits them.
pub struct FakeBackend {
    pub calc_available: AtomicBool,
    /// Milliseconds the price calculation sleeps before answering
    pub calc_delay_ms: AtomicU64,
    pub package_available: AtomicBool,
    pub paid: AtomicBool,
    pub failing_traveler: Mutex<Option<String>>,
    pub payments: AtomicUsize,
    pub reservations: AtomicUsize,
    pub travelers: AtomicUsize,
    pub associations: AtomicUsize,
    pub last_reservation: Mutex<Option<Value>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            calc_available: AtomicBool::new(true),
            calc_delay_ms: AtomicU64::new(0),
            package_available: AtomicBool::new(true),
            paid: AtomicBool::new(true),
            failing_traveler: Mutex::new(None),
            payments: AtomicUsize::new(0),
            reservations: AtomicUsize::new(0),
            travelers: AtomicUsize::new(0),
            associations: AtomicUsize::new(0),
            last_reservation: Mutex::new(None),
        }
    }
}

fn wrapped(items: Vec<Value>) -> Value {
    json!({ "$id": "1", "$values": items })
}

fn packages() -> Vec<Value> {
    vec![
        json!({
            "$id": "2", "id": 1, "title": "Salvador Essencial", "price": 1000.0,
            "destination": "Salvador", "companyName": "Bahia Tur",
            "description": "Cinco noites no Pelourinho",
            "availableDates": { "$id": "3", "$values": [
                { "id": 1, "startDate": "2030-01-10T00:00:00", "endDate": "2030-01-15T00:00:00", "capacity": 30 }
            ] }
        }),
        json!({
            "$id": "4", "id": 2, "title": "Florianópolis Verão", "price": 2000.0,
            "destination": "Florianópolis", "availableDates": null
        }),
    ]
}

/// Reachable by id only; it has no usable list price.
fn unpriced_package() -> Value {
    json!({
        "$id": "5", "id": 3, "title": "Chapada Sob Consulta", "price": 0.0,
        "destination": "Lençóis", "availableDates": null
    })
}

fn flights() -> Vec<Value> {
    vec![
        json!({ "id": 11, "airline": "Azul", "origin": "São Paulo", "destination": "Salvador",
                "departureTime": "2030-01-10T08:00:00", "arrivalTime": "2030-01-10T10:20:00",
                "price": 800.0, "stops": 0 }),
        json!({ "id": 12, "airline": "Gol", "origin": "Curitiba", "destination": "Salvador",
                "departureTime": "2030-01-10T06:00:00", "arrivalTime": "2030-01-10T12:00:00",
                "price": 450.0, "stops": 1 }),
        json!({ "id": 13, "airline": "Latam", "origin": "Porto Alegre", "destination": "Florianópolis",
                "departureTime": "2030-01-11T09:00:00", "arrivalTime": "2030-01-11T10:00:00",
                "price": 300.0, "stops": 0 }),
    ]
}

fn accommodations() -> Vec<Value> {
    vec![
        json!({ "id": 21, "name": "Hotel Farol", "city": "Salvador", "rating": 4.5,
                "pricePerNight": 150.0, "amenities": "Wi-Fi, Piscina, Café da manhã",
                "roomTypes": { "$values": [ { "name": "Suíte", "pricePerNight": 300.0 } ] } }),
        json!({ "id": 22, "name": "Pousada Barra", "city": "Salvador", "rating": 3.2,
                "pricePerNight": 90.0, "amenities": ["Wi-Fi"] }),
    ]
}

fn find(items: Vec<Value>, id: i64) -> Option<Value> {
    items.into_iter().find(|item| item["id"].as_i64() == Some(id))
}

fn same_place(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

async fn list_packages() -> impl Responder {
    HttpResponse::Ok().json(wrapped(packages()))
}

async fn get_package(fake: web::Data<FakeBackend>, path: web::Path<i64>) -> impl Responder {
    if !fake.package_available.load(Ordering::SeqCst) {
        return HttpResponse::ServiceUnavailable().finish();
    }
    let id = path.into_inner();
    match find(packages(), id).or_else(|| find(vec![unpriced_package()], id)) {
        Some(package) => HttpResponse::Ok().json(package),
        None => HttpResponse::NotFound().finish(),
    }
}

async fn calculate_price(fake: web::Data<FakeBackend>) -> impl Responder {
    let delay = fake.calc_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        actix_rt::time::sleep(Duration::from_millis(delay)).await;
    }
    if fake.calc_available.load(Ordering::SeqCst) {
        HttpResponse::Ok().json(json!({ "$id": "1", "totalPrice": BACKEND_TOTAL }))
    } else {
        HttpResponse::InternalServerError().body("calculation unavailable")
    }
}

async fn list_flights() -> impl Responder {
    HttpResponse::Ok().json(wrapped(flights()))
}

async fn search_flights(req: HttpRequest) -> impl Responder {
    let query = web::Query::<std::collections::HashMap<String, String>>::from_query(req.query_string())
        .map(|q| q.into_inner())
        .unwrap_or_default();
    let matching = flights()
        .into_iter()
        .filter(|f| {
            query
                .get("destination")
                .map_or(true, |d| same_place(f["destination"].as_str().unwrap_or(""), d))
        })
        .collect();
    HttpResponse::Ok().json(wrapped(matching))
}

async fn get_flight(path: web::Path<i64>) -> impl Responder {
    match find(flights(), path.into_inner()) {
        Some(flight) => HttpResponse::Ok().json(flight),
        None => HttpResponse::NotFound().finish(),
    }
}

async fn list_accommodations() -> impl Responder {
    HttpResponse::Ok().json(wrapped(accommodations()))
}

async fn accommodations_in(path: web::Path<String>) -> impl Responder {
    let destination = path.into_inner();
    let matching = accommodations()
        .into_iter()
        .filter(|a| same_place(a["city"].as_str().unwrap_or(""), &destination))
        .collect();
    HttpResponse::Ok().json(wrapped(matching))
}

async fn get_accommodation(path: web::Path<i64>) -> impl Responder {
    match find(accommodations(), path.into_inner()) {
        Some(hotel) => HttpResponse::Ok().json(hotel),
        None => HttpResponse::NotFound().finish(),
    }
}

async fn create_checkout_session(body: web::Json<Value>) -> impl Responder {
    if body["successUrl"].as_str().map_or(true, |url| !url.contains("{CHECKOUT_SESSION_ID}")) {
        return HttpResponse::BadRequest().body("missing success url");
    }
    HttpResponse::Ok().json(json!({
        "sessionId": CHECKOUT_SESSION_ID,
        "url": format!("https://checkout.example.com/pay/{}", CHECKOUT_SESSION_ID)
    }))
}

async fn checkout_status(fake: web::Data<FakeBackend>, path: web::Path<String>) -> impl Responder {
    let paid = fake.paid.load(Ordering::SeqCst);
    HttpResponse::Ok().json(json!({
        "id": path.into_inner(),
        "status": if paid { "complete" } else { "open" },
        "paymentStatus": if paid { "paid" } else { "unpaid" },
        "amountTotal": 111100
    }))
}

async fn create_payment(fake: web::Data<FakeBackend>) -> impl Responder {
    let n = fake.payments.fetch_add(1, Ordering::SeqCst);
    HttpResponse::Created().json(json!({ "id": 70 + n }))
}

async fn create_reservation(fake: web::Data<FakeBackend>, body: web::Json<Value>) -> impl Responder {
    let n = fake.reservations.fetch_add(1, Ordering::SeqCst);
    *fake.last_reservation.lock().unwrap() = Some(body.into_inner());
    HttpResponse::Created().json(json!({ "id": 900 + n, "status": "Confirmed" }))
}

async fn create_traveler(fake: web::Data<FakeBackend>, body: web::Json<Value>) -> impl Responder {
    let failing = fake.failing_traveler.lock().unwrap().clone();
    if failing.as_deref() == body["firstName"].as_str() {
        return HttpResponse::BadRequest().body("document rejected");
    }
    let n = fake.travelers.fetch_add(1, Ordering::SeqCst);
    HttpResponse::Created().json(json!({ "id": 300 + n }))
}

async fn associate_traveler(fake: web::Data<FakeBackend>) -> impl Responder {
    fake.associations.fetch_add(1, Ordering::SeqCst);
    HttpResponse::Ok().finish()
}

fn user_json(id: &str) -> Value {
    json!({ "id": id, "email": "ana@example.com", "firstName": "Ana", "lastName": "Lima",
            "phoneNumber": null, "emailConfirmed": true })
}

async fn login(body: web::Json<Value>) -> impl Responder {
    if body["password"].as_str() == Some(GOOD_PASSWORD) {
        HttpResponse::Ok().json(json!({ "token": bearer_token("u-1"), "user": user_json("u-1") }))
    } else {
        HttpResponse::Unauthorized().body("Invalid credentials")
    }
}

async fn register(body: web::Json<Value>) -> impl Responder {
    if body["email"].as_str() == Some("taken@example.com") {
        return HttpResponse::Conflict().body("User already exists");
    }
    HttpResponse::Created().json(json!({
        "id": 5, "email": body["email"], "firstName": body["firstName"],
        "lastName": body["lastName"], "emailConfirmed": false
    }))
}

fn has_bearer(req: &HttpRequest) -> bool {
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.starts_with("Bearer "))
}

async fn get_user(req: HttpRequest, path: web::Path<String>) -> impl Responder {
    if !has_bearer(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    HttpResponse::Ok().json(user_json(&path.into_inner()))
}

async fn update_user(req: HttpRequest, path: web::Path<String>, body: web::Json<Value>) -> impl Responder {
    if !has_bearer(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    let mut user = user_json(&path.into_inner());
    user["firstName"] = body["firstName"].clone();
    user["lastName"] = body["lastName"].clone();
    HttpResponse::Ok().json(user)
}

async fn empty_ok() -> impl Responder {
    HttpResponse::Ok().finish()
}

async fn confirm_email(req: HttpRequest) -> impl Responder {
    if req.query_string().contains("token=good") {
        HttpResponse::Ok().finish()
    } else {
        HttpResponse::BadRequest().body("Invalid token")
    }
}

async fn user_reservations(req: HttpRequest) -> impl Responder {
    if !has_bearer(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    HttpResponse::Ok().json(wrapped(vec![
        json!({ "id": 900, "travelPackageId": 1, "userId": "u-1", "status": "Confirmed",
                "totalPrice": 1111.0, "startDate": "2030-01-10T00:00:00" }),
    ]))
}

fn fake_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("", web::get().to(empty_ok))
            .route("/TravelPackage", web::get().to(list_packages))
            .route("/TravelPackage/calculate-price", web::post().to(calculate_price))
            .route("/TravelPackage/{id}", web::get().to(get_package))
            .route("/Flight", web::get().to(list_flights))
            .route("/Flight/search", web::get().to(search_flights))
            .route("/Flight/{id}", web::get().to(get_flight))
            .route("/Accommodation", web::get().to(list_accommodations))
            .route("/Accommodation/destination/{destination}", web::get().to(accommodations_in))
            .route("/Accommodation/{id}", web::get().to(get_accommodation))
            .route("/Checkout/create-session", web::post().to(create_checkout_session))
            .route("/Checkout/session-status/{id}", web::get().to(checkout_status))
            .route("/Payment", web::post().to(create_payment))
            .route("/Reservation", web::post().to(create_reservation))
            .route("/Reservation/user/{id}", web::get().to(user_reservations))
            .route("/Traveler", web::post().to(create_traveler))
            .route("/Traveler/associate", web::post().to(associate_traveler))
            .route("/User/login", web::post().to(login))
            .route("/User/register", web::post().to(register))
            .route("/User/forgot-password", web::post().to(empty_ok))
            .route("/User/reset-password", web::post().to(empty_ok))
            .route("/User/confirm-email", web::get().to(confirm_email))
            .route("/User/resend-confirmation", web::post().to(empty_ok))
            .route("/User/{id}", web::get().to(get_user))
            .route("/User/{id}", web::put().to(update_user)),
    );
}

pub struct TestApp {
    pub backend: web::Data<FakeBackend>,
    pub client: web::Data<BackendClient>,
    pub store: web::Data<ReservationStore>,
    pub storage: web::Data<HandoffStorage>,
    pub heuristics: web::Data<PricingHeuristics>,
    pub latch: web::Data<ConfirmationLatch>,
    pub config: web::Data<AppConfig>,
    storage_dir: PathBuf,
}

impl TestApp {
    /// Starts a fake backend on a free port and wires the web tier against it.
    pub async fn new() -> Self {
        let backend = web::Data::new(FakeBackend::default());
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let served = backend.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(served.clone())
                .configure(fake_routes)
        })
        .workers(1)
        .disable_signals()
        .listen(listener)
        .unwrap()
        .run();
        actix_rt::spawn(server);

        Self::with_backend_url(backend, &format!("http://127.0.0.1:{}/api/", port))
    }

    /// Web tier pointed at a port nothing listens on.
    pub async fn offline() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        Self::with_backend_url(
            web::Data::new(FakeBackend::default()),
            &format!("http://127.0.0.1:{}/api/", port),
        )
    }

    fn with_backend_url(backend: web::Data<FakeBackend>, url: &str) -> Self {
        let storage_dir = std::env::temp_dir().join(format!("booking-test-{}", uuid::Uuid::new_v4()));
        let config = AppConfig {
            backend_api_url: url.to_string(),
            handoff_storage_dir: storage_dir.clone(),
            default_package_id: 1,
            public_app_url: "http://localhost:3000/".to_string(),
            ..Default::default()
        };

        Self {
            backend,
            client: web::Data::new(BackendClient::new(url, Duration::from_secs(5)).unwrap()),
            store: web::Data::new(ReservationStore::new()),
            storage: web::Data::new(HandoffStorage::new(storage_dir.clone())),
            heuristics: web::Data::new(PricingHeuristics::default()),
            latch: web::Data::new(ConfirmationLatch::new()),
            config: web::Data::new(config),
            storage_dir,
        }
    }

    pub fn create_app(&self) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .app_data(self.client.clone())
            .app_data(self.store.clone())
            .app_data(self.storage.clone())
            .app_data(self.heuristics.clone())
            .app_data(self.latch.clone())
            .app_data(self.config.clone())
            .configure(routes::configure)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.storage_dir);
    }
}

pub fn session_id() -> String {
    format!("test-{}", uuid::Uuid::new_v4().simple())
}

pub fn traveler_json(first_name: &str, is_main_buyer: bool) -> Value {
    json!({
        "firstName": first_name,
        "lastName": "Lima",
        "document": {
            "type": "passport",
            "number": "FX123456",
            "issuingCountry": "BR",
            "issueDate": "2020-01-10"
        },
        "birthDate": "1988-07-03",
        "isMainBuyer": is_main_buyer
    })
}

/// Token shaped like the backend's, signed with a key the web tier never sees.
pub fn bearer_token(user_id: &str) -> String {
    let exp = chrono::Utc::now().timestamp() + 3600;
    encode(
        &Header::default(),
        &json!({ "sub": "ana@example.com", "exp": exp, "nameid": user_id }),
        &EncodingKey::from_secret(b"backend-secret"),
    )
    .unwrap()
}
