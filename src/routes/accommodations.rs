use actix_web::{web, HttpResponse, Responder};
use log::warn;
use serde::Deserialize;

use crate::{
    routes::ErrorResponse,
    services::{
        backend::BackendClient,
        selector::{select_accommodations, FilterQuery},
    },
};

#[derive(Debug, Deserialize)]
pub struct DestinationQuery {
    pub destination: Option<String>,
}

// GET /api/accommodations?destination=&q=&filter=
pub async fn list(
    client: web::Data<BackendClient>,
    destination: web::Query<DestinationQuery>,
    filters: web::Query<FilterQuery>,
) -> impl Responder {
    let hotels = match client.accommodations_in(destination.destination.as_deref()).await {
        Ok(hotels) => hotels,
        Err(err) => {
            warn!("Could not list accommodations: {}", err);
            Vec::new()
        }
    };

    match select_accommodations(&hotels, &filters) {
        Ok(selected) => HttpResponse::Ok().json(selected),
        Err(err) => {
            HttpResponse::BadRequest().json(ErrorResponse::new("invalid_filter", err.to_string()))
        }
    }
}
