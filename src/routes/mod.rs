use actix_web::{web, HttpResponse};
use log::error;
use serde::Serialize;

use crate::{middleware::auth::AuthMiddleware, services::backend::BackendError};

pub mod accommodations;
pub mod account;
pub mod checkout;
pub mod flights;
pub mod health;
pub mod packages;
pub mod reservation;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
        }
    }
}

/// Maps a failed backend call onto the response the browser sees.
pub fn backend_error_response(err: &BackendError) -> HttpResponse {
    match err {
        BackendError::NotFound(_) => {
            HttpResponse::NotFound().json(ErrorResponse::new("not_found", "Resource not found"))
        }
        BackendError::ApiError { status: 400, body } | BackendError::ApiError { status: 422, body } => {
            HttpResponse::BadRequest().json(ErrorResponse::new("rejected", body.clone()))
        }
        BackendError::ApiError { status: 401, .. } | BackendError::ApiError { status: 403, .. } => {
            HttpResponse::Unauthorized()
                .json(ErrorResponse::new("unauthorized", "Not authorized by the booking service"))
        }
        BackendError::ApiError { status: 409, body } => {
            HttpResponse::Conflict().json(ErrorResponse::new("conflict", body.clone()))
        }
        _ => {
            error!("Backend call failed: {}", err);
            HttpResponse::BadGateway().json(ErrorResponse::new(
                "backend_unavailable",
                "The booking service is unavailable, please try again",
            ))
        }
    }
}

pub fn invalid_session(session_id: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse::new(
        "invalid_session",
        format!("Invalid session id `{}`", session_id),
    ))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/api")
                .route("/packages", web::get().to(packages::list))
                .route("/packages/{id}", web::get().to(packages::get_by_id))
                .route("/flights", web::get().to(flights::list))
                .route("/accommodations", web::get().to(accommodations::list))
                .service(
                    web::scope("/sessions/{sid}")
                        .route("/reservation", web::get().to(reservation::mount))
                        .route(
                            "/reservation/flights",
                            web::get().to(reservation::flight_panel),
                        )
                        .route(
                            "/reservation/accommodations",
                            web::get().to(reservation::accommodation_panel),
                        )
                        .route(
                            "/reservation/flight",
                            web::post().to(reservation::select_flight),
                        )
                        .route(
                            "/reservation/accommodation",
                            web::post().to(reservation::select_accommodation),
                        )
                        .route(
                            "/reservation/insurance",
                            web::post().to(reservation::set_insurance),
                        )
                        .route(
                            "/reservation/reconcile",
                            web::post().to(reservation::reconcile),
                        )
                        .route(
                            "/reservation/changes",
                            web::get().to(reservation::changes),
                        )
                        .route(
                            "/reservation/travelers",
                            web::put().to(reservation::update_travelers),
                        )
                        .route("/checkout", web::post().to(checkout::start))
                        .route(
                            "/checkout/confirmation",
                            web::get().to(checkout::confirm),
                        )
                        .route("/checkout/cancel", web::get().to(checkout::cancel)),
                )
                .service(
                    web::scope("/account")
                        .route("/login", web::post().to(account::auth::login))
                        .route("/register", web::post().to(account::auth::register))
                        .route(
                            "/password-reset",
                            web::post().to(account::password_reset::request_reset),
                        )
                        .route(
                            "/password-reset/confirm",
                            web::post().to(account::password_reset::confirm_reset),
                        )
                        .route(
                            "/confirm-email",
                            web::get().to(account::email_verification::confirm_email),
                        )
                        .route(
                            "/confirm-email/resend",
                            web::post().to(account::email_verification::resend_confirmation),
                        )
                        // Protected routes
                        .service(
                            web::scope("")
                                .wrap(AuthMiddleware)
                                .route("/profile", web::get().to(account::profile::get_profile))
                                .route(
                                    "/profile",
                                    web::put().to(account::profile::update_profile),
                                )
                                .route(
                                    "/reservations",
                                    web::get().to(account::reservations::list),
                                ),
                        ),
                ),
        );
}
