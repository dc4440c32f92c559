use actix_web::{web, HttpResponse, Responder};
use log::warn;
use serde_json::json;

use super::{auth::is_valid_email, MIN_PASSWORD_LENGTH};
use crate::{
    models::user::{EmailRequest, PasswordResetConfirm},
    routes::{backend_error_response, ErrorResponse},
    services::backend::{BackendClient, BackendError},
};

// POST /api/account/password-reset
pub async fn request_reset(
    client: web::Data<BackendClient>,
    input: web::Json<EmailRequest>,
) -> impl Responder {
    let request = input.into_inner();
    if !is_valid_email(&request.email) {
        return HttpResponse::BadRequest()
            .json(ErrorResponse::new("invalid_email", "Invalid email address"));
    }

    match client.forgot_password(&request).await {
        // Unknown addresses get the same answer as known ones
        Ok(()) | Err(BackendError::NotFound(_)) => HttpResponse::Ok().json(json!({
            "message": "If the address is registered, a reset link is on its way"
        })),
        Err(err) => {
            warn!("Password reset request failed: {}", err);
            backend_error_response(&err)
        }
    }
}

// POST /api/account/password-reset/confirm
pub async fn confirm_reset(
    client: web::Data<BackendClient>,
    input: web::Json<PasswordResetConfirm>,
) -> impl Responder {
    let confirm = input.into_inner();
    if confirm.token.trim().is_empty() {
        return HttpResponse::BadRequest()
            .json(ErrorResponse::new("missing_token", "Reset token is required"));
    }
    if confirm.new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return HttpResponse::BadRequest().json(ErrorResponse::new(
            "weak_password",
            format!("Password must have at least {} characters", MIN_PASSWORD_LENGTH),
        ));
    }

    match client.reset_password(&confirm).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "message": "Password updated" })),
        Err(err) => backend_error_response(&err),
    }
}
