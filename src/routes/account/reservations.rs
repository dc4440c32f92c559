use actix_web::{web, HttpResponse, Responder};

use crate::{
    middleware::auth_context::AuthenticatedUser, routes::backend_error_response,
    services::backend::BackendClient,
};

// GET /api/account/reservations
pub async fn list(user: AuthenticatedUser, client: web::Data<BackendClient>) -> impl Responder {
    match client.user_reservations(&user.user_id, &user.token).await {
        Ok(reservations) => HttpResponse::Ok().json(reservations),
        Err(err) => backend_error_response(&err),
    }
}
