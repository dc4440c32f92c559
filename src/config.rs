use std::{env, path::PathBuf};

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;
const BACKEND_API_URL: &str = "http://localhost:5000/api/";
const PUBLIC_APP_URL: &str = "http://localhost:3000/";
const HANDOFF_STORAGE_DIR: &str = "data/handoff";
const DEFAULT_PACKAGE_ID: i64 = 1;
const BACKEND_TIMEOUT_SECONDS: u64 = 10;
const CHECKOUT_CURRENCY: &str = "brl";
const SESSION_IDLE_MINUTES: u64 = 240;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Root of the booking REST API, e.g. `https://bookings.example.com/api/`
    pub backend_api_url: String,
    /// Public origin of the browser app, used for hosted checkout return URLs
    pub public_app_url: String,
    pub handoff_storage_dir: PathBuf,
    /// Package opened when the reservation page is mounted without navigation state
    pub default_package_id: i64,
    pub backend_timeout_seconds: u64,
    /// ISO currency code sent with hosted checkout sessions
    pub checkout_currency: String,
    /// Reservation sessions and finished confirmations untouched this long are forgotten
    pub session_idle_minutes: u64,
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: HOST.to_string(),
            port: PORT,
            backend_api_url: BACKEND_API_URL.to_string(),
            public_app_url: PUBLIC_APP_URL.to_string(),
            handoff_storage_dir: PathBuf::from(HANDOFF_STORAGE_DIR),
            default_package_id: DEFAULT_PACKAGE_ID,
            backend_timeout_seconds: BACKEND_TIMEOUT_SECONDS,
            checkout_currency: CHECKOUT_CURRENCY.to_string(),
            session_idle_minutes: SESSION_IDLE_MINUTES,
            environment: "development".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            backend_api_url: env::var("BACKEND_API_URL").unwrap_or(defaults.backend_api_url),
            public_app_url: env::var("PUBLIC_APP_URL").unwrap_or(defaults.public_app_url),
            handoff_storage_dir: env::var("HANDOFF_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.handoff_storage_dir),
            default_package_id: env::var("DEFAULT_PACKAGE_ID")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_package_id),
            backend_timeout_seconds: env::var("BACKEND_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.backend_timeout_seconds),
            checkout_currency: env::var("CHECKOUT_CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or(defaults.checkout_currency),
            session_idle_minutes: env::var("SESSION_IDLE_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|minutes| *minutes > 0)
                .unwrap_or(defaults.session_idle_minutes),
            environment: env::var("RUST_ENV").unwrap_or(defaults.environment),
        }
    }
}
