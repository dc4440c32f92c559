use std::collections::HashMap;

use actix_web::{web, HttpResponse, Responder};
use log::warn;
use serde::Serialize;

use crate::{
    config::AppConfig,
    services::{backend::BackendClient, handoff_storage::HandoffStorage},
};

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    environment: String,
    version: String,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

pub async fn health_check(
    client: web::Data<BackendClient>,
    storage: web::Data<HandoffStorage>,
    config: web::Data<AppConfig>,
) -> impl Responder {
    let mut health = HealthStatus {
        status: "ok".to_string(),
        services: HashMap::new(),
        environment: config.environment.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let backend_result = check_backend(&client).await;
    health
        .services
        .insert("backend".to_string(), backend_result.clone());

    let storage_result = check_storage(&storage);
    health
        .services
        .insert("handoff_storage".to_string(), storage_result.clone());

    if backend_result.status != "ok" || storage_result.status != "ok" {
        health.status = "degraded".to_string();
    }

    HttpResponse::Ok().json(health)
}

async fn check_backend(client: &BackendClient) -> ServiceStatus {
    match client.ping().await {
        Ok(status) => ServiceStatus {
            status: "ok".to_string(),
            details: Some(format!("{} answered with {}", client.base_url(), status)),
        },
        Err(e) => {
            warn!("Backend health check failed: {}", e);
            ServiceStatus {
                status: "error".to_string(),
                details: Some(format!("Failed to reach {}: {}", client.base_url(), e)),
            }
        }
    }
}

fn check_storage(storage: &HandoffStorage) -> ServiceStatus {
    match std::fs::create_dir_all(storage.root()) {
        Ok(()) => ServiceStatus {
            status: "ok".to_string(),
            details: Some(format!("Writable at {}", storage.root().display())),
        },
        Err(e) => ServiceStatus {
            status: "error".to_string(),
            details: Some(format!("{}: {}", storage.root().display(), e)),
        },
    }
}
