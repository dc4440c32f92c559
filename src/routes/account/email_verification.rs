use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

use super::auth::is_valid_email;
use crate::{
    models::user::EmailRequest,
    routes::{backend_error_response, ErrorResponse},
    services::backend::BackendClient,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmEmailQuery {
    pub user_id: String,
    pub token: String,
}

// GET /api/account/confirm-email?userId=&token=
pub async fn confirm_email(
    client: web::Data<BackendClient>,
    query: web::Query<ConfirmEmailQuery>,
) -> impl Responder {
    if query.user_id.trim().is_empty() || query.token.trim().is_empty() {
        return HttpResponse::BadRequest().json(ErrorResponse::new(
            "invalid_confirmation",
            "User id and token are required",
        ));
    }

    match client.confirm_email(&query.user_id, &query.token).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "message": "Email confirmed" })),
        Err(err) => backend_error_response(&err),
    }
}

// POST /api/account/confirm-email/resend
pub async fn resend_confirmation(
    client: web::Data<BackendClient>,
    input: web::Json<EmailRequest>,
) -> impl Responder {
    let request = input.into_inner();
    if !is_valid_email(&request.email) {
        return HttpResponse::BadRequest()
            .json(ErrorResponse::new("invalid_email", "Invalid email address"));
    }

    match client.resend_confirmation(&request).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "message": "Confirmation email sent" })),
        Err(err) => backend_error_response(&err),
    }
}
