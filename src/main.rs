use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info};

use travel_booking_web::{
    config::AppConfig,
    routes,
    services::{
        backend::BackendClient, checkout_service::ConfirmationLatch,
        handoff_storage::HandoffStorage, price_estimator::PricingHeuristics,
    },
    state::ReservationStore,
};

const SWEEP_INTERVAL_SECONDS: u64 = 300;

/// Periodically forgets idle reservation sessions and finished confirmations.
fn spawn_session_sweeper(
    store: web::Data<ReservationStore>,
    latch: web::Data<ConfirmationLatch>,
    idle: chrono::Duration,
) {
    actix_web::rt::spawn(async move {
        let mut ticks = actix_web::rt::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECONDS));
        loop {
            ticks.tick().await;
            let cutoff = chrono::Utc::now() - idle;
            let sessions = store.evict_idle(cutoff);
            let confirmations = latch.evict_completed(cutoff);
            if sessions + confirmations > 0 {
                info!(
                    "Evicted {} idle sessions and {} finished confirmations",
                    sessions, confirmations
                );
            }
        }
    });
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }

    env_logger::init_from_env(Env::default().default_filter_or("info"));
    info!("Application starting...");

    let config = AppConfig::from_env();
    let client = match BackendClient::new(
        &config.backend_api_url,
        Duration::from_secs(config.backend_timeout_seconds),
    ) {
        Ok(client) => client,
        Err(err) => {
            error!("Cannot create backend client: {}", err);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()));
        }
    };
    info!("Using booking backend at {}", client.base_url());

    let client = web::Data::new(client);
    let store = web::Data::new(ReservationStore::new());
    let storage = web::Data::new(HandoffStorage::new(config.handoff_storage_dir.clone()));
    let heuristics = web::Data::new(PricingHeuristics::from_env());
    let latch = web::Data::new(ConfirmationLatch::new());
    spawn_session_sweeper(
        store.clone(),
        latch.clone(),
        chrono::Duration::minutes(config.session_idle_minutes as i64),
    );
    let bind = (config.host.clone(), config.port);
    let config = web::Data::new(config);

    info!("Attempting to bind to {}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .app_data(client.clone())
            .app_data(store.clone())
            .app_data(storage.clone())
            .app_data(heuristics.clone())
            .app_data(latch.clone())
            .app_data(config.clone())
            .configure(routes::configure)
    })
    .bind(bind)?
    .run()
    .await
}
