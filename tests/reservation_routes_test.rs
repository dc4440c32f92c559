mod common;

use std::sync::atomic::Ordering;

use actix_web::test;
use common::{session_id, traveler_json, TestApp, BACKEND_TOTAL};
use serde_json::{json, Value};
use serial_test::serial;
use travel_booking_web::{
    models::{pricing::PriceSource, reservation::ReservationData, traveler::Traveler},
    services::handoff_storage::StorageKey,
    state::StoreError,
};

fn flight_11() -> Value {
    json!({ "id": 11, "airline": "Azul", "origin": "São Paulo", "destination": "Salvador",
            "departureTime": "2030-01-10T08:00:00", "arrivalTime": "2030-01-10T10:20:00",
            "price": 800.0, "stops": 0 })
}

#[actix_rt::test]
#[serial]
async fn test_mount_loads_package() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;
    let sid = session_id();

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation?packageId=1", sid))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["travelPackage"]["title"], "Salvador Essencial");
    assert_eq!(body["data"]["totalPrice"], 1000.0);
    assert_eq!(body["priceSource"], "backend");
    // Nested `$values` envelope unwrapped into a plain list
    assert_eq!(
        body["data"]["travelPackage"]["availableDates"].as_array().map(Vec::len),
        Some(1)
    );

    let saved: Option<ReservationData> = test_app.storage.read(&sid, StorageKey::ReservationData);
    assert_eq!(saved.map(|d| d.travel_package.id), Some(1));
}

#[actix_rt::test]
#[serial]
async fn test_mount_falls_back_to_default_package() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation", session_id()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["travelPackage"]["id"], 1);
}

#[actix_rt::test]
#[serial]
async fn test_mount_errors() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get()
        .uri("/api/sessions/not%20valid/reservation")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation?packageId=99", session_id()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "package_not_found");

    test_app.backend.package_available.store(false, Ordering::SeqCst);
    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation?packageId=1", session_id()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 502);
}

#[actix_rt::test]
#[serial]
async fn test_remount_keeps_customizations() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;
    let sid = session_id();

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation?packageId=1", sid))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/reservation/insurance", sid))
        .set_json(&json!({ "includesInsurance": true }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation?packageId=1", sid))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["includesInsurance"], true);

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation?packageId=1&force=true", sid))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["includesInsurance"], false);
}

#[actix_rt::test]
#[serial]
async fn test_mount_restores_saved_reservation_as_estimate() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;
    let sid = session_id();

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation?packageId=1", sid))
        .to_request();
    test::call_service(&app, req).await;

    // Server restart: in-memory state gone, handoff file still there
    test_app.store.remove(&sid);

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation", sid))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["travelPackage"]["id"], 1);
    assert_eq!(body["priceSource"], "estimated");
}

#[actix_rt::test]
#[serial]
async fn test_select_flight_uses_backend_price() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;
    let sid = session_id();

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation?packageId=1", sid))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/reservation/flight", sid))
        .set_json(&json!({ "flight": flight_11() }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["totalPrice"], BACKEND_TOTAL);
    assert_eq!(body["data"]["selectedFlight"]["id"], 11);
    assert_eq!(body["priceSource"], "backend");
    assert_eq!(body["version"], 2);
}

#[actix_rt::test]
#[serial]
async fn test_estimate_then_reconcile() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;
    let sid = session_id();

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation?packageId=1", sid))
        .to_request();
    test::call_service(&app, req).await;

    test_app.backend.calc_available.store(false, Ordering::SeqCst);
    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/reservation/flight", sid))
        .set_json(&json!({ "flight": flight_11() }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    // 1000 base, standard flight worth half of it swapped for an 800 flight
    assert_eq!(body["data"]["totalPrice"], 1300.0);
    assert_eq!(body["priceSource"], "estimated");

    // Still down: reconcile reports the outage and keeps the estimate
    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/reservation/reconcile", sid))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 502);
    assert_eq!(
        test_app.store.snapshot(&sid).map(|s| s.price_source),
        Some(PriceSource::Estimated)
    );

    test_app.backend.calc_available.store(true, Ordering::SeqCst);
    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/reservation/reconcile", sid))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["totalPrice"], BACKEND_TOTAL);
    assert_eq!(body["priceSource"], "backend");
}

#[actix_rt::test]
#[serial]
async fn test_unknown_room_type_rejected() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;
    let sid = session_id();

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation?packageId=1", sid))
        .to_request();
    test::call_service(&app, req).await;

    let hotel = json!({ "id": 21, "name": "Hotel Farol", "city": "Salvador", "rating": 4.5,
                        "pricePerNight": 150.0,
                        "roomTypes": [ { "name": "Suíte", "pricePerNight": 300.0 } ] });

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/reservation/accommodation", sid))
        .set_json(&json!({ "accommodation": hotel, "roomType": "Penthouse" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/reservation/accommodation", sid))
        .set_json(&json!({ "accommodation": hotel, "roomType": "Suíte" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["selectedAccommodation"]["pricePerNight"], 300.0);
}

#[actix_rt::test]
#[serial]
async fn test_customize_without_mount() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/reservation/insurance", session_id()))
        .set_json(&json!({ "includesInsurance": true }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_rt::test]
#[serial]
async fn test_older_ticket_loses_to_committed_customization() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;
    let sid = session_id();

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation?packageId=1", sid))
        .to_request();
    test::call_service(&app, req).await;

    let slow = test_app.store.ticket(&sid).unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/reservation/insurance", sid))
        .set_json(&json!({ "includesInsurance": true }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let stale_data = slow.data.clone();
    let result = test_app.store.commit(slow, stale_data, PriceSource::Backend);
    assert!(matches!(result, Err(StoreError::Stale { .. })));
    assert_eq!(
        test_app.store.snapshot(&sid).map(|s| s.data.includes_insurance),
        Some(true)
    );
}

#[actix_rt::test]
#[serial]
async fn test_overlapping_customizations_answer_conflict() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;
    let sid = session_id();

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation?packageId=1", sid))
        .to_request();
    test::call_service(&app, req).await;

    test_app.backend.calc_delay_ms.store(200, Ordering::SeqCst);
    let flight = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/reservation/flight", sid))
        .set_json(&json!({ "flight": flight_11() }))
        .to_request();
    let insurance = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/reservation/insurance", sid))
        .set_json(&json!({ "includesInsurance": true }))
        .to_request();

    let (older, newer) = futures::join!(
        test::call_service(&app, flight),
        test::call_service(&app, insurance)
    );

    assert_eq!(older.status(), 409);
    let body: Value = test::read_body_json(older).await;
    assert_eq!(body["error"], "stale_update");

    assert_eq!(newer.status(), 200);
    let snapshot = test_app.store.snapshot(&sid).unwrap();
    assert!(snapshot.data.includes_insurance);
    assert!(snapshot.data.selected_flight.is_none());
}

#[actix_rt::test]
#[serial]
async fn test_failed_reconcile_leaves_pending_customization_alone() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;
    let sid = session_id();

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation?packageId=1", sid))
        .to_request();
    test::call_service(&app, req).await;

    let held = test_app.store.ticket(&sid).unwrap();

    test_app.backend.calc_available.store(false, Ordering::SeqCst);
    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/reservation/reconcile", sid))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 502);

    let mut data = held.data.clone();
    data.includes_insurance = true;
    let committed = test_app.store.commit(held, data, PriceSource::Estimated);
    assert!(committed.is_ok());
}

#[actix_rt::test]
#[serial]
async fn test_unpriced_package_falls_back_to_markup() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;
    let sid = session_id();

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation?packageId=3", sid))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/reservation/insurance", sid))
        .set_json(&json!({ "includesInsurance": true }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["totalPrice"], BACKEND_TOTAL);

    test_app.backend.calc_available.store(false, Ordering::SeqCst);
    test_app.backend.package_available.store(false, Ordering::SeqCst);
    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/reservation/flight", sid))
        .set_json(&json!({ "flight": flight_11() }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["priceSource"], "pageFallback");
    assert!(body["data"]["totalPrice"].as_f64().unwrap() > BACKEND_TOTAL);
}

#[actix_rt::test]
#[serial]
async fn test_changes_long_poll() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;
    let sid = session_id();
    let changes = |since: u64| {
        format!(
            "/api/sessions/{}/reservation/changes?since={}&waitSeconds=1",
            sid, since
        )
    };

    let req = test::TestRequest::get().uri(&changes(0)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation?packageId=1", sid))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri(&changes(0)).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["version"], 1);

    let req = test::TestRequest::get().uri(&changes(1)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 204);

    let poll = test::TestRequest::get().uri(&changes(1)).to_request();
    let insurance = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/reservation/insurance", sid))
        .set_json(&json!({ "includesInsurance": true }))
        .to_request();
    let (polled, updated) = futures::join!(
        test::call_service(&app, poll),
        test::call_service(&app, insurance)
    );
    assert_eq!(updated.status(), 200);
    assert_eq!(polled.status(), 200);

    let body: Value = test::read_body_json(polled).await;
    assert_eq!(body["version"], 2);
    assert_eq!(body["data"]["includesInsurance"], true);
}

#[actix_rt::test]
#[serial]
async fn test_flight_panel_filters() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;
    let sid = session_id();

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation/flights", sid))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation?packageId=1", sid))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation/flights", sid))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["selectedId"], Value::Null);

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation/flights?filter=direct", sid))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["items"][0]["id"], 11);
    assert_eq!(body["items"].as_array().map(Vec::len), Some(1));

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation/flights?filter=cheapest", sid))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_rt::test]
#[serial]
async fn test_accommodation_panel_amenity_filter() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;
    let sid = session_id();

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation?packageId=1", sid))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/sessions/{}/reservation/accommodations?filter=amenity&amenity=cafe",
            sid
        ))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["items"][0]["name"], "Hotel Farol");

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/sessions/{}/reservation/accommodations?filter=rating&minRating=9",
            sid
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_rt::test]
#[serial]
async fn test_update_travelers() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;
    let sid = session_id();

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{}/reservation?packageId=1", sid))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/sessions/{}/reservation/travelers", sid))
        .set_json(&json!({ "travelers": [traveler_json("Ana", false), traveler_json("Rui", false)] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["details"]["code"], "main_buyer_count");

    let req = test::TestRequest::put()
        .uri(&format!("/api/sessions/{}/reservation/travelers", sid))
        .set_json(&json!({ "travelers": [traveler_json("Ana", true), traveler_json("Rui", false)] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let saved: Option<Vec<Traveler>> = test_app.storage.read(&sid, StorageKey::TravelersData);
    assert_eq!(saved.map(|t| t.len()), Some(2));
    assert_eq!(
        test_app.store.snapshot(&sid).map(|s| s.data.travelers.len()),
        Some(2)
    );
}
