use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use log::error;
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::AppConfig,
    middleware::auth_context::OptionalUser,
    routes::{backend_error_response, invalid_session, ErrorResponse},
    services::{
        backend::BackendClient,
        checkout_service::{
            begin_checkout, cancel_checkout, confirm_payment, CheckoutCustomer, CheckoutError,
            ConfirmationLatch,
        },
        handoff_storage::{valid_session_id, HandoffStorage},
    },
    state::ReservationStore,
};

#[derive(Debug, Deserialize)]
pub struct ConfirmationQuery {
    pub session_id: String,
}

fn checkout_error_response(err: CheckoutError) -> HttpResponse {
    match &err {
        CheckoutError::InvalidTravelers(invalid) => HttpResponse::BadRequest().json(json!({
            "error": "invalid_travelers",
            "message": invalid.to_string(),
            "details": invalid,
        })),
        CheckoutError::InvalidAmount(_) => {
            HttpResponse::BadRequest().json(ErrorResponse::new("invalid_amount", err.to_string()))
        }
        CheckoutError::NothingPending => {
            HttpResponse::NotFound().json(ErrorResponse::new("nothing_pending", err.to_string()))
        }
        CheckoutError::SessionMismatch { .. } => {
            HttpResponse::BadRequest().json(ErrorResponse::new("session_mismatch", err.to_string()))
        }
        CheckoutError::PaymentNotCompleted { .. } => HttpResponse::PaymentRequired()
            .json(ErrorResponse::new("payment_not_completed", err.to_string())),
        CheckoutError::AlreadyProcessed(state) => HttpResponse::Conflict().json(json!({
            "error": "already_processed",
            "message": err.to_string(),
            "details": state,
        })),
        CheckoutError::BackendError(backend) => backend_error_response(backend),
        CheckoutError::StorageError(_) | CheckoutError::InvalidReturnUrl(_) => {
            error!("Checkout failed: {}", err);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::new("checkout_failed", "Could not start the payment"))
        }
    }
}

// POST /api/sessions/{sid}/checkout
pub async fn start(
    path: web::Path<String>,
    user: OptionalUser,
    client: web::Data<BackendClient>,
    store: web::Data<ReservationStore>,
    storage: web::Data<HandoffStorage>,
    config: web::Data<AppConfig>,
) -> impl Responder {
    let session_id = path.into_inner();
    if !valid_session_id(&session_id) {
        return invalid_session(&session_id);
    }

    let snapshot = match store.snapshot(&session_id) {
        Some(snapshot) => snapshot,
        None => {
            return HttpResponse::NotFound().json(ErrorResponse::new(
                "reservation_not_loaded",
                format!("No reservation loaded for session {}", session_id),
            ))
        }
    };

    let customer = match user.0 {
        Some(user) => CheckoutCustomer {
            user_id: Some(user.user_id),
            email: Some(user.email),
        },
        None => CheckoutCustomer::default(),
    };

    match begin_checkout(
        client.get_ref(),
        &storage,
        &config.public_app_url,
        &config.checkout_currency,
        &session_id,
        &snapshot.data,
        customer,
        Utc::now().date_naive(),
    )
    .await
    {
        Ok(checkout) => HttpResponse::Ok().json(json!({
            "checkoutSessionId": checkout.session_id,
            "url": checkout.url,
            "amount": snapshot.data.total_price,
            "priceSource": snapshot.price_source,
        })),
        Err(err) => checkout_error_response(err),
    }
}

// GET /api/sessions/{sid}/checkout/confirmation?session_id=
pub async fn confirm(
    path: web::Path<String>,
    query: web::Query<ConfirmationQuery>,
    client: web::Data<BackendClient>,
    store: web::Data<ReservationStore>,
    storage: web::Data<HandoffStorage>,
    latch: web::Data<ConfirmationLatch>,
) -> impl Responder {
    let session_id = path.into_inner();
    if !valid_session_id(&session_id) {
        return invalid_session(&session_id);
    }

    match confirm_payment(
        client.get_ref(),
        &storage,
        &latch,
        &session_id,
        &query.session_id,
        Utc::now().date_naive(),
    )
    .await
    {
        Ok(outcome) => {
            store.remove(&session_id);
            HttpResponse::Ok().json(outcome)
        }
        Err(err) => checkout_error_response(err),
    }
}

// GET /api/sessions/{sid}/checkout/cancel
pub async fn cancel(
    path: web::Path<String>,
    storage: web::Data<HandoffStorage>,
) -> impl Responder {
    let session_id = path.into_inner();
    if !valid_session_id(&session_id) {
        return invalid_session(&session_id);
    }

    cancel_checkout(&storage, &session_id);
    HttpResponse::Ok().json(json!({
        "message": "Payment cancelled, your reservation is still open"
    }))
}
