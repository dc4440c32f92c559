use actix_web::{web, HttpResponse, Responder};

use crate::{
    middleware::auth_context::AuthenticatedUser,
    models::user::ProfileUpdate,
    routes::{backend_error_response, ErrorResponse},
    services::backend::BackendClient,
};

// GET /api/account/profile
pub async fn get_profile(
    user: AuthenticatedUser,
    client: web::Data<BackendClient>,
) -> impl Responder {
    match client.user(&user.user_id, &user.token).await {
        Ok(profile) => HttpResponse::Ok().json(profile),
        Err(err) => backend_error_response(&err),
    }
}

// PUT /api/account/profile
pub async fn update_profile(
    user: AuthenticatedUser,
    client: web::Data<BackendClient>,
    input: web::Json<ProfileUpdate>,
) -> impl Responder {
    let update = input.into_inner();
    if update.first_name.trim().is_empty() || update.last_name.trim().is_empty() {
        return HttpResponse::BadRequest()
            .json(ErrorResponse::new("missing_name", "First and last name are required"));
    }

    match client.update_user(&user.user_id, &update, &user.token).await {
        Ok(profile) => HttpResponse::Ok().json(profile),
        Err(err) => backend_error_response(&err),
    }
}
