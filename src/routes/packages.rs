use actix_web::{web, HttpResponse, Responder};
use log::warn;
use serde::Deserialize;

use crate::{
    routes::backend_error_response,
    services::{
        backend::{BackendClient, BookingBackend},
        search_service::matches_query,
    },
};

#[derive(Debug, Deserialize)]
pub struct PackageQuery {
    pub q: Option<String>,
}

// GET /api/packages?q=
pub async fn list(
    client: web::Data<BackendClient>,
    query: web::Query<PackageQuery>,
) -> impl Responder {
    let packages = match client.travel_packages().await {
        Ok(packages) => packages,
        Err(err) => {
            warn!("Could not list travel packages: {}", err);
            Vec::new()
        }
    };

    let text = query.q.as_deref().unwrap_or("");
    let matching: Vec<_> = packages
        .into_iter()
        .filter(|package| {
            matches_query(
                text,
                &[
                    package.title.as_str(),
                    package.destination.as_str(),
                    package.description.as_deref().unwrap_or(""),
                    package.company.as_deref().unwrap_or(""),
                ],
            )
        })
        .collect();

    HttpResponse::Ok().json(matching)
}

// GET /api/packages/{id}
pub async fn get_by_id(client: web::Data<BackendClient>, path: web::Path<i64>) -> impl Responder {
    match client.travel_package(path.into_inner()).await {
        Ok(package) => HttpResponse::Ok().json(package),
        Err(err) => backend_error_response(&err),
    }
}
