use std::sync::OnceLock;

use actix_web::{web, HttpResponse, Responder};
use log::{info, warn};
use regex::Regex;
use serde::Deserialize;

use super::MIN_PASSWORD_LENGTH;
use crate::{
    models::user::{LoginRequest, RegisterRequest},
    routes::{backend_error_response, ErrorResponse},
    services::{
        backend::{BackendClient, BackendError},
        handoff_storage::{valid_session_id, HandoffStorage, StorageKey},
    },
};

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Browser session whose `user` blob should hold the signed-in user
    pub sid: Option<String>,
}

// POST /api/account/login
pub async fn login(
    client: web::Data<BackendClient>,
    storage: web::Data<HandoffStorage>,
    query: web::Query<LoginQuery>,
    input: web::Json<LoginRequest>,
) -> impl Responder {
    let credentials = input.into_inner();
    if !is_valid_email(&credentials.email) || credentials.password.is_empty() {
        return HttpResponse::BadRequest().json(ErrorResponse::new(
            "invalid_credentials",
            "Email and password are required",
        ));
    }

    match client.login(&credentials).await {
        Ok(auth) => {
            if let Some(sid) = query.sid.as_deref().filter(|sid| valid_session_id(sid)) {
                if let Err(err) = storage.write(sid, StorageKey::User, &auth.user) {
                    warn!("Could not store user for session {}: {}", sid, err);
                }
            }
            info!("User {} signed in", auth.user.id);
            HttpResponse::Ok().json(auth)
        }
        Err(BackendError::ApiError { status: 400, .. })
        | Err(BackendError::ApiError { status: 401, .. })
        | Err(BackendError::NotFound(_)) => HttpResponse::Unauthorized()
            .json(ErrorResponse::new("invalid_credentials", "Invalid credentials")),
        Err(err) => backend_error_response(&err),
    }
}

// POST /api/account/register
pub async fn register(
    client: web::Data<BackendClient>,
    input: web::Json<RegisterRequest>,
) -> impl Responder {
    let registration = input.into_inner();

    if !is_valid_email(&registration.email) {
        return HttpResponse::BadRequest()
            .json(ErrorResponse::new("invalid_email", "Invalid email address"));
    }
    if registration.password.chars().count() < MIN_PASSWORD_LENGTH {
        return HttpResponse::BadRequest().json(ErrorResponse::new(
            "weak_password",
            format!("Password must have at least {} characters", MIN_PASSWORD_LENGTH),
        ));
    }
    if registration.first_name.trim().is_empty() || registration.last_name.trim().is_empty() {
        return HttpResponse::BadRequest()
            .json(ErrorResponse::new("missing_name", "First and last name are required"));
    }

    match client.register(&registration).await {
        Ok(user) => HttpResponse::Created().json(user),
        Err(BackendError::ApiError { status: 409, .. }) => HttpResponse::Conflict()
            .json(ErrorResponse::new("user_exists", "User already exists")),
        Err(err) => backend_error_response(&err),
    }
}

pub fn is_valid_email(email: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?)*$",
            )
            .expect("valid email pattern")
        })
        .is_match(email.trim())
}
