use crate::models::{
    accommodation::Accommodation,
    flight::Flight,
    payment::{
        CheckoutSession, CheckoutSessionRequest, CheckoutSessionStatus, NewPayment, PaymentRecord,
    },
    pricing::PriceRecalculationRequest,
    reservation::{NewReservation, Reservation},
    travel_package::TravelPackage,
    traveler::{NewTravelerRecord, TravelerAssociation, TravelerRecord},
};

#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    InvalidUrl(String),
    RequestError(String),
    NotFound(String),
    ApiError { status: u16, body: String },
    DecodeError(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::InvalidUrl(err) => write!(f, "Invalid backend URL: {}", err),
            BackendError::RequestError(err) => write!(f, "Request error: {}", err),
            BackendError::NotFound(path) => write!(f, "Not found: {}", path),
            BackendError::ApiError { status, body } => {
                write!(f, "API error: Status: {}, Body: {}", status, body)
            }
            BackendError::DecodeError(err) => write!(f, "Decode error: {}", err),
        }
    }
}

impl std::error::Error for BackendError {}

/// Backend lookups the price recalculation depends on.
pub trait BookingBackend {
    async fn travel_package(&self, package_id: i64) -> Result<TravelPackage, BackendError>;
    async fn flight(&self, flight_id: i64) -> Result<Flight, BackendError>;
    async fn accommodation(&self, accommodation_id: i64) -> Result<Accommodation, BackendError>;
    async fn calculate_package_price(
        &self,
        request: &PriceRecalculationRequest,
    ) -> Result<f64, BackendError>;
}

/// Hosted checkout and the backend writes performed once it reports a payment.
pub trait CheckoutBackend {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, BackendError>;
    async fn checkout_session_status(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSessionStatus, BackendError>;
    async fn create_payment(&self, payment: &NewPayment) -> Result<PaymentRecord, BackendError>;
    async fn create_reservation(
        &self,
        reservation: &NewReservation,
    ) -> Result<Reservation, BackendError>;
    async fn create_traveler(
        &self,
        traveler: &NewTravelerRecord,
    ) -> Result<TravelerRecord, BackendError>;
    async fn associate_traveler(&self, association: &TravelerAssociation)
        -> Result<(), BackendError>;
}
