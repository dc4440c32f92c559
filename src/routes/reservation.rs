//! Reservation page endpoints: mount, selector panels and customizations.
//!
//! Customizations follow one path: take a ticket, apply the change to the
//! ticket's copy of the reservation, recalculate the total and commit. A
//! commit that lost the race to a newer customization answers `409`.

use std::time::Duration;

use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::AppConfig,
    models::{
        accommodation::Accommodation, flight::Flight, pricing::PriceQuote,
        pricing::PriceSource, reservation::ReservationData, traveler::Traveler,
    },
    routes::{backend_error_response, invalid_session, ErrorResponse},
    services::{
        backend::{BackendClient, BackendError, BookingBackend},
        handoff_storage::{valid_session_id, HandoffStorage, StorageKey},
        price_estimator::PricingHeuristics,
        pricing_service::PricingService,
        selector::{select_accommodations, select_flights, FilterQuery},
        traveler_service::validate_travelers,
    },
    state::{ReservationSnapshot, ReservationStore, StoreError},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountQuery {
    pub package_id: Option<i64>,
    #[serde(default)]
    pub force: bool,
}

const MAX_CHANGES_WAIT_SECONDS: u64 = 30;

/// Long-poll parameters: answer as soon as a version above `since` exists.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangesQuery {
    #[serde(default)]
    pub since: u64,
    pub wait_seconds: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SelectFlightRequest {
    /// `null` clears the selection
    pub flight: Option<Flight>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectAccommodationRequest {
    pub accommodation: Option<Accommodation>,
    #[serde(default)]
    pub room_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceRequest {
    pub includes_insurance: bool,
}

#[derive(Debug, Deserialize)]
pub struct TravelersRequest {
    pub travelers: Vec<Traveler>,
}

fn not_loaded(session_id: &str) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse::new(
        "reservation_not_loaded",
        format!("No reservation loaded for session {}", session_id),
    ))
}

fn store_error_response(err: StoreError) -> HttpResponse {
    match &err {
        StoreError::UnknownSession(session_id) => not_loaded(session_id),
        StoreError::Stale { .. } => {
            info!("{}", err);
            HttpResponse::Conflict().json(ErrorResponse::new("stale_update", err.to_string()))
        }
    }
}

fn persist(storage: &HandoffStorage, session_id: &str, snapshot: &ReservationSnapshot) {
    if let Err(err) = storage.write(session_id, StorageKey::ReservationData, &snapshot.data) {
        warn!("Could not persist reservation for session {}: {}", session_id, err);
    }
}

// GET /api/sessions/{sid}/reservation?packageId=&force=
pub async fn mount(
    path: web::Path<String>,
    query: web::Query<MountQuery>,
    client: web::Data<BackendClient>,
    store: web::Data<ReservationStore>,
    storage: web::Data<HandoffStorage>,
    config: web::Data<AppConfig>,
) -> impl Responder {
    let session_id = path.into_inner();
    if !valid_session_id(&session_id) {
        return invalid_session(&session_id);
    }

    let current = store.snapshot(&session_id);
    let same_package = |package_id: i64| query.package_id.map_or(true, |id| id == package_id);

    if !query.force {
        if let Some(snapshot) = current.as_ref() {
            if same_package(snapshot.data.travel_package.id) {
                return HttpResponse::Ok().json(snapshot);
            }
        } else if let Some(saved) =
            storage.read::<ReservationData>(&session_id, StorageKey::ReservationData)
        {
            if same_package(saved.travel_package.id) {
                info!("Restored saved reservation for session {}", session_id);
                let snapshot = store.initialize(&session_id, saved, PriceSource::Estimated);
                return HttpResponse::Ok().json(snapshot);
            }
        }
    }

    let package_id = query
        .package_id
        .or_else(|| current.as_ref().map(|s| s.data.travel_package.id))
        .unwrap_or(config.default_package_id);

    match client.travel_package(package_id).await {
        Ok(package) => {
            let snapshot = store.initialize(
                &session_id,
                ReservationData::for_package(package),
                PriceSource::Backend,
            );
            persist(&storage, &session_id, &snapshot);
            HttpResponse::Ok().json(snapshot)
        }
        Err(BackendError::NotFound(_)) => HttpResponse::NotFound().json(ErrorResponse::new(
            "package_not_found",
            format!("Travel package {} not found", package_id),
        )),
        Err(err) => {
            warn!("Could not load package {} for session {}: {}", package_id, session_id, err);
            HttpResponse::BadGateway().json(ErrorResponse::new(
                "package_unavailable",
                "Could not load the travel package, try again",
            ))
        }
    }
}

// GET /api/sessions/{sid}/reservation/flights
pub async fn flight_panel(
    path: web::Path<String>,
    filters: web::Query<FilterQuery>,
    client: web::Data<BackendClient>,
    store: web::Data<ReservationStore>,
) -> impl Responder {
    let session_id = path.into_inner();
    let snapshot = match store.snapshot(&session_id) {
        Some(snapshot) => snapshot,
        None => return not_loaded(&session_id),
    };

    let destination = snapshot.data.travel_package.destination.as_str();
    let flights = match client.search_flights(None, Some(destination)).await {
        Ok(flights) => flights,
        Err(err) => {
            warn!("Could not load flights to {}: {}", destination, err);
            Vec::new()
        }
    };

    match select_flights(&flights, &filters) {
        Ok(items) => HttpResponse::Ok().json(json!({
            "items": items,
            "selectedId": snapshot.data.selected_flight.as_ref().map(|f| f.id),
        })),
        Err(err) => {
            HttpResponse::BadRequest().json(ErrorResponse::new("invalid_filter", err.to_string()))
        }
    }
}

// GET /api/sessions/{sid}/reservation/accommodations
pub async fn accommodation_panel(
    path: web::Path<String>,
    filters: web::Query<FilterQuery>,
    client: web::Data<BackendClient>,
    store: web::Data<ReservationStore>,
) -> impl Responder {
    let session_id = path.into_inner();
    let snapshot = match store.snapshot(&session_id) {
        Some(snapshot) => snapshot,
        None => return not_loaded(&session_id),
    };

    let destination = snapshot.data.travel_package.destination.as_str();
    let hotels = match client.accommodations_in(Some(destination)).await {
        Ok(hotels) => hotels,
        Err(err) => {
            warn!("Could not load accommodations in {}: {}", destination, err);
            Vec::new()
        }
    };

    match select_accommodations(&hotels, &filters) {
        Ok(items) => HttpResponse::Ok().json(json!({
            "items": items,
            "selectedId": snapshot
                .data
                .selected_accommodation
                .as_ref()
                .map(|a| a.accommodation.id),
        })),
        Err(err) => {
            HttpResponse::BadRequest().json(ErrorResponse::new("invalid_filter", err.to_string()))
        }
    }
}

/// Applies `change` under a fresh ticket, reprices and commits.
async fn customize<F>(
    session_id: &str,
    client: &BackendClient,
    store: &ReservationStore,
    storage: &HandoffStorage,
    heuristics: &PricingHeuristics,
    change: F,
) -> HttpResponse
where
    F: FnOnce(&mut ReservationData) -> Result<(), HttpResponse>,
{
    let ticket = match store.ticket(session_id) {
        Ok(ticket) => ticket,
        Err(err) => return store_error_response(err),
    };

    let mut data = ticket.data.clone();
    if let Err(response) = change(&mut data) {
        return response;
    }

    let pricing = PricingService::new(client, heuristics);
    let quote = match pricing.recalculate(&data.price_request()).await {
        Ok(quote) => quote,
        Err(err) => {
            warn!(
                "Pricing failed for session {}, marking up previous total: {}",
                session_id, err
            );
            PriceQuote::page_fallback(heuristics.page_fallback(ticket.data.total_price))
        }
    };
    if !quote.source.is_authoritative() {
        info!(
            "Session {} now shows an estimated total of {:.2} ({:?})",
            session_id, quote.total_price, quote.source
        );
    }
    data.total_price = quote.total_price;

    match store.commit(ticket, data, quote.source) {
        Ok(snapshot) => {
            persist(storage, session_id, &snapshot);
            HttpResponse::Ok().json(snapshot)
        }
        Err(err) => store_error_response(err),
    }
}

// POST /api/sessions/{sid}/reservation/flight
pub async fn select_flight(
    path: web::Path<String>,
    body: web::Json<SelectFlightRequest>,
    client: web::Data<BackendClient>,
    store: web::Data<ReservationStore>,
    storage: web::Data<HandoffStorage>,
    heuristics: web::Data<PricingHeuristics>,
) -> impl Responder {
    let session_id = path.into_inner();
    let flight = body.into_inner().flight;

    customize(&session_id, &client, &store, &storage, &heuristics, |data| {
        data.selected_flight = flight;
        Ok(())
    })
    .await
}

// POST /api/sessions/{sid}/reservation/accommodation
pub async fn select_accommodation(
    path: web::Path<String>,
    body: web::Json<SelectAccommodationRequest>,
    client: web::Data<BackendClient>,
    store: web::Data<ReservationStore>,
    storage: web::Data<HandoffStorage>,
    heuristics: web::Data<PricingHeuristics>,
) -> impl Responder {
    let session_id = path.into_inner();
    let SelectAccommodationRequest {
        accommodation,
        room_type,
    } = body.into_inner();

    let selected = match accommodation {
        Some(accommodation) => {
            let id = accommodation.id;
            match accommodation.select(room_type.as_deref()) {
                Some(selected) => Some(selected),
                None => {
                    return HttpResponse::BadRequest().json(ErrorResponse::new(
                        "unknown_room_type",
                        format!(
                            "Accommodation {} has no room type `{}`",
                            id,
                            room_type.unwrap_or_default()
                        ),
                    ))
                }
            }
        }
        None => None,
    };

    customize(&session_id, &client, &store, &storage, &heuristics, |data| {
        data.selected_accommodation = selected;
        Ok(())
    })
    .await
}

// POST /api/sessions/{sid}/reservation/insurance
pub async fn set_insurance(
    path: web::Path<String>,
    body: web::Json<InsuranceRequest>,
    client: web::Data<BackendClient>,
    store: web::Data<ReservationStore>,
    storage: web::Data<HandoffStorage>,
    heuristics: web::Data<PricingHeuristics>,
) -> impl Responder {
    let session_id = path.into_inner();
    let includes_insurance = body.includes_insurance;

    customize(&session_id, &client, &store, &storage, &heuristics, |data| {
        data.includes_insurance = includes_insurance;
        Ok(())
    })
    .await
}

// POST /api/sessions/{sid}/reservation/reconcile
pub async fn reconcile(
    path: web::Path<String>,
    client: web::Data<BackendClient>,
    store: web::Data<ReservationStore>,
    storage: web::Data<HandoffStorage>,
    heuristics: web::Data<PricingHeuristics>,
) -> impl Responder {
    let session_id = path.into_inner();
    let snapshot = match store.snapshot(&session_id) {
        Some(snapshot) => snapshot,
        None => return not_loaded(&session_id),
    };
    if !snapshot.is_estimated() {
        return HttpResponse::Ok().json(snapshot);
    }

    let pricing = PricingService::new(client.get_ref(), heuristics.get_ref());
    let quote = match pricing.authoritative(&snapshot.data.price_request()).await {
        Ok(quote) => quote,
        Err(err) => return backend_error_response(&err),
    };

    // Ticket taken after the quote; a failed reconcile must not supersede a customization
    let ticket = match store.ticket(&session_id) {
        Ok(ticket) => ticket,
        Err(err) => return store_error_response(err),
    };
    if ticket.version != snapshot.version {
        return store_error_response(StoreError::Stale {
            session_id,
            ticket_version: snapshot.version,
            current_version: ticket.version,
        });
    }

    let mut data = ticket.data.clone();
    info!(
        "Reconciled session {} from {:.2} to {:.2}",
        session_id, data.total_price, quote.total_price
    );
    data.total_price = quote.total_price;

    match store.commit(ticket, data, quote.source) {
        Ok(snapshot) => {
            persist(&storage, &session_id, &snapshot);
            HttpResponse::Ok().json(snapshot)
        }
        Err(err) => store_error_response(err),
    }
}

// GET /api/sessions/{sid}/reservation/changes?since=&waitSeconds=
pub async fn changes(
    path: web::Path<String>,
    query: web::Query<ChangesQuery>,
    store: web::Data<ReservationStore>,
) -> impl Responder {
    let session_id = path.into_inner();
    if !valid_session_id(&session_id) {
        return invalid_session(&session_id);
    }

    let wait = Duration::from_secs(
        query
            .wait_seconds
            .unwrap_or(MAX_CHANGES_WAIT_SECONDS)
            .min(MAX_CHANGES_WAIT_SECONDS),
    );
    match store.wait_for_change(&session_id, query.since, wait).await {
        Ok(Some(snapshot)) => HttpResponse::Ok().json(snapshot),
        Ok(None) => HttpResponse::NoContent().finish(),
        Err(err) => store_error_response(err),
    }
}

// PUT /api/sessions/{sid}/reservation/travelers
pub async fn update_travelers(
    path: web::Path<String>,
    body: web::Json<TravelersRequest>,
    store: web::Data<ReservationStore>,
    storage: web::Data<HandoffStorage>,
) -> impl Responder {
    let session_id = path.into_inner();
    let travelers = body.into_inner().travelers;

    if let Err(err) = validate_travelers(&travelers, Utc::now().date_naive()) {
        return HttpResponse::BadRequest().json(json!({
            "error": "invalid_travelers",
            "message": err.to_string(),
            "details": err,
        }));
    }

    let snapshot = match store.update(&session_id, |data| data.travelers = travelers.clone()) {
        Ok(snapshot) => snapshot,
        Err(err) => return store_error_response(err),
    };

    if let Err(err) = storage.write(&session_id, StorageKey::TravelersData, &travelers) {
        warn!("Could not save travelers for session {}: {}", session_id, err);
    }
    persist(&storage, &session_id, &snapshot);

    HttpResponse::Ok().json(snapshot)
}
