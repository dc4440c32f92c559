use actix_web::{web, HttpResponse, Responder};
use log::warn;
use serde::Deserialize;

use crate::{
    routes::ErrorResponse,
    services::{
        backend::BackendClient,
        selector::{select_flights, FilterQuery},
    },
};

#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    pub origin: Option<String>,
    pub destination: Option<String>,
}

// GET /api/flights?origin=&destination=&q=&filter=
pub async fn list(
    client: web::Data<BackendClient>,
    route: web::Query<RouteQuery>,
    filters: web::Query<FilterQuery>,
) -> impl Responder {
    let flights = match client
        .search_flights(route.origin.as_deref(), route.destination.as_deref())
        .await
    {
        Ok(flights) => flights,
        Err(err) => {
            warn!("Could not list flights: {}", err);
            Vec::new()
        }
    };

    match select_flights(&flights, &filters) {
        Ok(selected) => HttpResponse::Ok().json(selected),
        Err(err) => {
            HttpResponse::BadRequest().json(ErrorResponse::new("invalid_filter", err.to_string()))
        }
    }
}
