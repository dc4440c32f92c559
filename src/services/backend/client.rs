use std::time::Duration;

use log::debug;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use url::Url;

use super::interface::{BackendError, BookingBackend, CheckoutBackend};
use crate::models::{
    accommodation::Accommodation,
    envelope::unwrap_envelopes,
    flight::Flight,
    payment::{
        CheckoutSession, CheckoutSessionRequest, CheckoutSessionStatus, NewPayment, PaymentRecord,
    },
    pricing::{CalculatedPrice, PriceRecalculationRequest},
    reservation::{NewReservation, Reservation},
    travel_package::TravelPackage,
    traveler::{NewTravelerRecord, TravelerAssociation, TravelerRecord},
    user::{
        AuthResponse, EmailRequest, LoginRequest, PasswordResetConfirm, ProfileUpdate,
        RegisterRequest, User,
    },
};

/// REST client for the booking backend. Every response body goes through
/// [`decode_body`], the only place `$values` envelopes are unwrapped.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url =
            Url::parse(base_url).map_err(|e| BackendError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::RequestError(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        url: Url,
        token: Option<&str>,
    ) -> RequestBuilder {
        let request = self.http.request(method, url);
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        token: Option<&str>,
    ) -> Result<T, BackendError> {
        let url = self.endpoint(segments)?;
        let path = url.path().to_string();
        let request = self.request(Method::GET, url, token).query(query);
        self.execute(request, &path).await
    }

    async fn send<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
        token: Option<&str>,
    ) -> Result<T, BackendError> {
        let url = self.endpoint(segments)?;
        let path = url.path().to_string();
        let request = self.request(method, url, token).json(body);
        self.execute(request, &path).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<T, BackendError> {
        debug!("backend request {}", path);
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::RequestError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::RequestError(e.to_string()))?;

        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(BackendError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        decode_body(&body)
    }

    /// Any HTTP answer from the API root counts as reachable.
    pub async fn ping(&self) -> Result<u16, BackendError> {
        self.http
            .get(self.base_url.clone())
            .send()
            .await
            .map(|response| response.status().as_u16())
            .map_err(|e| BackendError::RequestError(e.to_string()))
    }

    // Travel packages

    pub async fn travel_packages(&self) -> Result<Vec<TravelPackage>, BackendError> {
        self.get(&["TravelPackage"], &[], None).await
    }

    // Flights

    pub async fn flights(&self) -> Result<Vec<Flight>, BackendError> {
        self.get(&["Flight"], &[], None).await
    }

    /// Route-scoped flight list; falls back to the full list when no route is known
    pub async fn search_flights(
        &self,
        origin: Option<&str>,
        destination: Option<&str>,
    ) -> Result<Vec<Flight>, BackendError> {
        let mut query = Vec::new();
        if let Some(origin) = origin.filter(|o| !o.trim().is_empty()) {
            query.push(("origin", origin));
        }
        if let Some(destination) = destination.filter(|d| !d.trim().is_empty()) {
            query.push(("destination", destination));
        }

        if query.is_empty() {
            self.flights().await
        } else {
            self.get(&["Flight", "search"], &query, None).await
        }
    }

    // Accommodations

    pub async fn accommodations(&self) -> Result<Vec<Accommodation>, BackendError> {
        self.get(&["Accommodation"], &[], None).await
    }

    pub async fn accommodations_in(
        &self,
        destination: Option<&str>,
    ) -> Result<Vec<Accommodation>, BackendError> {
        match destination.filter(|d| !d.trim().is_empty()) {
            Some(destination) => {
                self.get(&["Accommodation", "destination", destination], &[], None)
                    .await
            }
            None => self.accommodations().await,
        }
    }

    // Reservations and travelers

    pub async fn create_reservation(
        &self,
        reservation: &NewReservation,
    ) -> Result<Reservation, BackendError> {
        self.send(Method::POST, &["Reservation"], reservation, None).await
    }

    pub async fn user_reservations(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<Vec<Reservation>, BackendError> {
        self.get(&["Reservation", "user", user_id], &[], Some(token)).await
    }

    pub async fn create_traveler(
        &self,
        traveler: &NewTravelerRecord,
    ) -> Result<TravelerRecord, BackendError> {
        self.send(Method::POST, &["Traveler"], traveler, None).await
    }

    pub async fn associate_traveler(
        &self,
        association: &TravelerAssociation,
    ) -> Result<(), BackendError> {
        let _: Value = self
            .send(Method::POST, &["Traveler", "associate"], association, None)
            .await?;
        Ok(())
    }

    // Payments

    pub async fn create_payment(&self, payment: &NewPayment) -> Result<PaymentRecord, BackendError> {
        self.send(Method::POST, &["Payment"], payment, None).await
    }

    pub async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, BackendError> {
        self.send(Method::POST, &["Checkout", "create-session"], request, None)
            .await
    }

    pub async fn checkout_session_status(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSessionStatus, BackendError> {
        self.get(&["Checkout", "session-status", session_id], &[], None)
            .await
    }

    // Users

    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, BackendError> {
        self.send(Method::POST, &["User", "login"], credentials, None).await
    }

    pub async fn register(&self, registration: &RegisterRequest) -> Result<User, BackendError> {
        self.send(Method::POST, &["User", "register"], registration, None)
            .await
    }

    pub async fn user(&self, user_id: &str, token: &str) -> Result<User, BackendError> {
        self.get(&["User", user_id], &[], Some(token)).await
    }

    pub async fn update_user(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
        token: &str,
    ) -> Result<User, BackendError> {
        self.send(Method::PUT, &["User", user_id], update, Some(token))
            .await
    }

    pub async fn forgot_password(&self, request: &EmailRequest) -> Result<(), BackendError> {
        let _: Value = self
            .send(Method::POST, &["User", "forgot-password"], request, None)
            .await?;
        Ok(())
    }

    pub async fn reset_password(&self, request: &PasswordResetConfirm) -> Result<(), BackendError> {
        let _: Value = self
            .send(Method::POST, &["User", "reset-password"], request, None)
            .await?;
        Ok(())
    }

    pub async fn confirm_email(&self, user_id: &str, token: &str) -> Result<(), BackendError> {
        let _: Value = self
            .get(
                &["User", "confirm-email"],
                &[("userId", user_id), ("token", token)],
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn resend_confirmation(&self, request: &EmailRequest) -> Result<(), BackendError> {
        let _: Value = self
            .send(Method::POST, &["User", "resend-confirmation"], request, None)
            .await?;
        Ok(())
    }
}

impl BookingBackend for BackendClient {
    async fn travel_package(&self, package_id: i64) -> Result<TravelPackage, BackendError> {
        self.get(&["TravelPackage", &package_id.to_string()], &[], None)
            .await
    }

    async fn flight(&self, flight_id: i64) -> Result<Flight, BackendError> {
        self.get(&["Flight", &flight_id.to_string()], &[], None).await
    }

    async fn accommodation(&self, accommodation_id: i64) -> Result<Accommodation, BackendError> {
        self.get(&["Accommodation", &accommodation_id.to_string()], &[], None)
            .await
    }

    async fn calculate_package_price(
        &self,
        request: &PriceRecalculationRequest,
    ) -> Result<f64, BackendError> {
        let price: CalculatedPrice = self
            .send(Method::POST, &["TravelPackage", "calculate-price"], request, None)
            .await?;
        Ok(price.total())
    }
}

impl CheckoutBackend for BackendClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, BackendError> {
        BackendClient::create_checkout_session(self, request).await
    }

    async fn checkout_session_status(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSessionStatus, BackendError> {
        BackendClient::checkout_session_status(self, session_id).await
    }

    async fn create_payment(&self, payment: &NewPayment) -> Result<PaymentRecord, BackendError> {
        BackendClient::create_payment(self, payment).await
    }

    async fn create_reservation(
        &self,
        reservation: &NewReservation,
    ) -> Result<Reservation, BackendError> {
        BackendClient::create_reservation(self, reservation).await
    }

    async fn create_traveler(
        &self,
        traveler: &NewTravelerRecord,
    ) -> Result<TravelerRecord, BackendError> {
        BackendClient::create_traveler(self, traveler).await
    }

    async fn associate_traveler(
        &self,
        association: &TravelerAssociation,
    ) -> Result<(), BackendError> {
        BackendClient::associate_traveler(self, association).await
    }
}

/// Decodes a backend body into `T` after unwrapping reference envelopes.
/// An empty body decodes as JSON `null`.
pub fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    let value = if body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(body).map_err(|e| BackendError::DecodeError(e.to_string()))?
    };

    serde_json::from_value(unwrap_envelopes(value))
        .map_err(|e| BackendError::DecodeError(e.to_string()))
}
