use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use serde::Serialize;
use url::Url;

use crate::{
    models::{
        payment::{CheckoutSession, CheckoutSessionRequest, NewPayment, PendingPayment},
        reservation::{NewReservation, ReservationData},
        traveler::{NewTravelerRecord, Traveler, TravelerAssociation},
    },
    services::{
        backend::{BackendError, CheckoutBackend},
        handoff_storage::{HandoffStorage, StorageError, StorageKey},
        traveler_service::{validate_travelers, TravelerValidationError},
    },
};

/// Placeholder the payment provider replaces with the real checkout session id.
const CHECKOUT_SESSION_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

#[derive(Debug)]
pub enum CheckoutError {
    InvalidTravelers(TravelerValidationError),
    InvalidAmount(f64),
    InvalidReturnUrl(String),
    NothingPending,
    SessionMismatch { expected: String, received: String },
    PaymentNotCompleted { status: String },
    AlreadyProcessed(LatchState),
    StorageError(StorageError),
    BackendError(BackendError),
}

impl std::fmt::Display for CheckoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckoutError::InvalidTravelers(err) => write!(f, "{}", err),
            CheckoutError::InvalidAmount(amount) => write!(f, "Invalid checkout amount {}", amount),
            CheckoutError::InvalidReturnUrl(err) => write!(f, "Invalid return URL: {}", err),
            CheckoutError::NothingPending => write!(f, "No pending payment for this session"),
            CheckoutError::SessionMismatch { expected, received } => write!(
                f,
                "Checkout session {} does not match pending session {}",
                received, expected
            ),
            CheckoutError::PaymentNotCompleted { status } => {
                write!(f, "Payment not completed (status: {})", status)
            }
            CheckoutError::AlreadyProcessed(state) => {
                write!(f, "Confirmation already {}", state.describe())
            }
            CheckoutError::StorageError(err) => write!(f, "{}", err),
            CheckoutError::BackendError(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CheckoutError {}

impl From<BackendError> for CheckoutError {
    fn from(err: BackendError) -> Self {
        CheckoutError::BackendError(err)
    }
}

impl From<StorageError> for CheckoutError {
    fn from(err: StorageError) -> Self {
        CheckoutError::StorageError(err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum LatchState {
    InProgress,
    #[serde(rename_all = "camelCase")]
    Completed { reservation_id: i64 },
}

impl LatchState {
    fn describe(&self) -> String {
        match self {
            LatchState::InProgress => "in progress".to_string(),
            LatchState::Completed { reservation_id } => {
                format!("completed (reservation {})", reservation_id)
            }
        }
    }
}

struct LatchEntry {
    state: LatchState,
    since: DateTime<Utc>,
}

/// Ensures each checkout session is confirmed once, no matter how often the
/// return page fires.
#[derive(Default)]
pub struct ConfirmationLatch {
    sessions: Mutex<HashMap<String, LatchEntry>>,
}

impl ConfirmationLatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, LatchEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, checkout_session_id: &str, state: LatchState) {
        self.lock().insert(
            checkout_session_id.to_string(),
            LatchEntry {
                state,
                since: Utc::now(),
            },
        );
    }

    pub fn try_acquire(&self, checkout_session_id: &str) -> Result<(), LatchState> {
        let mut sessions = self.lock();
        if let Some(entry) = sessions.get(checkout_session_id) {
            return Err(entry.state.clone());
        }
        sessions.insert(
            checkout_session_id.to_string(),
            LatchEntry {
                state: LatchState::InProgress,
                since: Utc::now(),
            },
        );
        Ok(())
    }

    pub fn complete(&self, checkout_session_id: &str, reservation_id: i64) {
        self.set(checkout_session_id, LatchState::Completed { reservation_id });
    }

    /// Lets a failed confirmation be retried.
    pub fn release(&self, checkout_session_id: &str) {
        self.lock().remove(checkout_session_id);
    }

    pub fn state(&self, checkout_session_id: &str) -> Option<LatchState> {
        self.lock()
            .get(checkout_session_id)
            .map(|entry| entry.state.clone())
    }

    /// Forgets completed confirmations older than `cutoff`. In-progress ones are kept.
    pub fn evict_completed(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, entry| {
            matches!(entry.state, LatchState::InProgress) || entry.since >= cutoff
        });
        before - sessions.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CheckoutCustomer {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationOutcome {
    pub reservation_id: i64,
    pub payment_id: i64,
    pub travelers_saved: usize,
    /// Traveler records that could not be saved; the reservation stands regardless
    pub warnings: Vec<String>,
}

/// Success and cancel URLs for the hosted checkout page.
pub fn return_urls(public_app_url: &str, session_id: &str) -> Result<(String, String), CheckoutError> {
    let base = Url::parse(public_app_url)
        .map_err(|e| CheckoutError::InvalidReturnUrl(format!("{}: {}", public_app_url, e)))?;

    let mut success = base
        .join("reservation/confirmation")
        .map_err(|e| CheckoutError::InvalidReturnUrl(e.to_string()))?;
    success.set_query(Some(&format!(
        "sid={}&session_id={}",
        session_id, CHECKOUT_SESSION_PLACEHOLDER
    )));

    let mut cancel = base
        .join("reservation/cancel")
        .map_err(|e| CheckoutError::InvalidReturnUrl(e.to_string()))?;
    cancel.set_query(Some(&format!("sid={}", session_id)));

    Ok((success.to_string(), cancel.to_string()))
}

/// Travelers for checkout: the reservation's own list, else the one saved by the traveler step.
pub fn checkout_travelers(
    storage: &HandoffStorage,
    session_id: &str,
    data: &ReservationData,
) -> Vec<Traveler> {
    if !data.travelers.is_empty() {
        return data.travelers.clone();
    }
    storage
        .read_travelers(session_id, StorageKey::TravelersData)
        .unwrap_or_default()
}

/// Validates the reservation, parks everything the confirmation step needs in
/// handoff storage and opens a hosted checkout session.
#[allow(clippy::too_many_arguments)]
pub async fn begin_checkout<B: CheckoutBackend>(
    backend: &B,
    storage: &HandoffStorage,
    public_app_url: &str,
    currency: &str,
    session_id: &str,
    data: &ReservationData,
    customer: CheckoutCustomer,
    today: NaiveDate,
) -> Result<CheckoutSession, CheckoutError> {
    let travelers = checkout_travelers(storage, session_id, data);
    validate_travelers(&travelers, today).map_err(CheckoutError::InvalidTravelers)?;

    let amount = data.total_price;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(CheckoutError::InvalidAmount(amount));
    }

    let (success_url, cancel_url) = return_urls(public_app_url, session_id)?;
    let request = CheckoutSessionRequest {
        travel_package_id: data.travel_package.id,
        description: data.travel_package.title.clone(),
        amount,
        currency: currency.to_string(),
        customer_email: customer.email.clone(),
        success_url,
        cancel_url,
    };

    let mut reservation = data.clone();
    reservation.travelers = travelers.clone();
    storage.write(session_id, StorageKey::PendingTravelers, &travelers)?;
    storage.write(session_id, StorageKey::ReservationData, &reservation)?;

    let checkout = backend.create_checkout_session(&request).await?;

    let pending = PendingPayment {
        travel_package_id: data.travel_package.id,
        amount,
        currency: currency.to_string(),
        checkout_session_id: Some(checkout.session_id.clone()),
        user_id: customer.user_id,
        customer_email: customer.email,
        payment_id: None,
        created_at: Utc::now(),
    };
    storage.write(session_id, StorageKey::PendingPayment, &pending)?;

    info!(
        "Opened checkout {} for session {} ({:.2} {})",
        checkout.session_id, session_id, amount, currency
    );
    Ok(checkout)
}

/// Records a paid checkout once: payment, reservation, then travelers.
pub async fn confirm_payment<B: CheckoutBackend>(
    backend: &B,
    storage: &HandoffStorage,
    latch: &ConfirmationLatch,
    session_id: &str,
    checkout_session_id: &str,
    today: NaiveDate,
) -> Result<ConfirmationOutcome, CheckoutError> {
    latch
        .try_acquire(checkout_session_id)
        .map_err(CheckoutError::AlreadyProcessed)?;

    match finalize(backend, storage, session_id, checkout_session_id, today).await {
        Ok(outcome) => {
            latch.complete(checkout_session_id, outcome.reservation_id);
            Ok(outcome)
        }
        Err(err) => {
            latch.release(checkout_session_id);
            Err(err)
        }
    }
}

async fn finalize<B: CheckoutBackend>(
    backend: &B,
    storage: &HandoffStorage,
    session_id: &str,
    checkout_session_id: &str,
    today: NaiveDate,
) -> Result<ConfirmationOutcome, CheckoutError> {
    let pending: PendingPayment = storage
        .read(session_id, StorageKey::PendingPayment)
        .ok_or(CheckoutError::NothingPending)?;

    if let Some(expected) = pending.checkout_session_id.as_deref() {
        if expected != checkout_session_id {
            return Err(CheckoutError::SessionMismatch {
                expected: expected.to_string(),
                received: checkout_session_id.to_string(),
            });
        }
    }

    let status = backend.checkout_session_status(checkout_session_id).await?;
    if !status.is_paid() {
        return Err(CheckoutError::PaymentNotCompleted {
            status: status.payment_status,
        });
    }

    let payment_id =
        record_payment(backend, storage, session_id, checkout_session_id, &pending).await?;

    let data: Option<ReservationData> = storage.read(session_id, StorageKey::ReservationData);
    let selected = data.as_ref().and_then(|d| d.selected_accommodation.as_ref());
    let reservation = backend
        .create_reservation(&NewReservation {
            travel_package_id: pending.travel_package_id,
            user_id: pending.user_id.clone(),
            payment_id,
            flight_id: data.as_ref().and_then(|d| d.selected_flight.as_ref()).map(|f| f.id),
            accommodation_id: selected.map(|a| a.accommodation.id),
            room_type: selected.and_then(|a| a.room_type.clone()),
            start_date: data
                .as_ref()
                .and_then(|d| d.travel_package.next_available(today))
                .map(|d| d.start_date),
            total_price: pending.amount,
            includes_insurance: data.as_ref().map_or(false, |d| d.includes_insurance),
            status: "Confirmed".to_string(),
        })
        .await?;
    info!(
        "Reservation {} created for checkout {} (payment {})",
        reservation.id, checkout_session_id, payment_id
    );

    let travelers = storage
        .read_travelers(session_id, StorageKey::PendingTravelers)
        .unwrap_or_default();
    let mut warnings = Vec::new();
    if travelers.is_empty() {
        warnings.push("No travelers were pending for this reservation".to_string());
    }

    let mut travelers_saved = 0;
    for traveler in &travelers {
        match save_traveler(backend, traveler, reservation.id).await {
            Ok(()) => travelers_saved += 1,
            Err(err) => {
                warn!(
                    "Traveler {} not saved for reservation {}: {}",
                    traveler.full_name(),
                    reservation.id,
                    err
                );
                warnings.push(format!("{}: {}", traveler.full_name(), err));
            }
        }
    }

    storage.clear(
        session_id,
        &[
            StorageKey::PendingPayment,
            StorageKey::PendingTravelers,
            StorageKey::TravelersData,
            StorageKey::ReservationData,
        ],
    );

    Ok(ConfirmationOutcome {
        reservation_id: reservation.id,
        payment_id,
        travelers_saved,
        warnings,
    })
}

/// Posts the payment once per checkout. The id is written back to the pending
/// payment, where a retried confirmation picks it up instead of paying again.
async fn record_payment<B: CheckoutBackend>(
    backend: &B,
    storage: &HandoffStorage,
    session_id: &str,
    checkout_session_id: &str,
    pending: &PendingPayment,
) -> Result<i64, CheckoutError> {
    if let Some(payment_id) = pending.payment_id {
        info!(
            "Reusing payment {} already recorded for checkout {}",
            payment_id, checkout_session_id
        );
        return Ok(payment_id);
    }

    let payment = backend
        .create_payment(&NewPayment {
            amount: pending.amount,
            currency: pending.currency.clone(),
            method: "card".to_string(),
            transaction_id: checkout_session_id.to_string(),
            status: "Completed".to_string(),
            user_id: pending.user_id.clone(),
        })
        .await?;

    let recorded = PendingPayment {
        payment_id: Some(payment.id),
        ..pending.clone()
    };
    if let Err(err) = storage.write(session_id, StorageKey::PendingPayment, &recorded) {
        warn!(
            "Payment {} for checkout {} not saved to the pending payment: {}",
            payment.id, checkout_session_id, err
        );
    }
    Ok(payment.id)
}

async fn save_traveler<B: CheckoutBackend>(
    backend: &B,
    traveler: &Traveler,
    reservation_id: i64,
) -> Result<(), BackendError> {
    let record = backend
        .create_traveler(&NewTravelerRecord::from(traveler))
        .await?;
    backend
        .associate_traveler(&TravelerAssociation {
            traveler_id: record.id,
            reservation_id,
        })
        .await
}

/// The browser came back from the hosted page without paying.
pub fn cancel_checkout(storage: &HandoffStorage, session_id: &str) {
    storage.remove(session_id, StorageKey::PendingPayment);
    info!("Checkout cancelled for session {}", session_id);
}
