use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

/// Body of `POST Checkout/create-session`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionRequest {
    pub travel_package_id: i64,
    pub description: String,
    pub amount: f64,
    pub currency: String,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    #[serde(alias = "id")]
    pub session_id: String,
    #[serde(alias = "checkoutUrl")]
    pub url: String,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionStatus {
    #[serde(alias = "sessionId")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub status: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub payment_status: String,
    /// Amount charged by the provider in minor units
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub customer_email: Option<String>,
}

impl CheckoutSessionStatus {
    pub fn is_paid(&self) -> bool {
        self.payment_status.eq_ignore_ascii_case("paid")
    }
}

/// Body of `POST Payment`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub amount: f64,
    pub currency: String,
    pub method: String,
    pub transaction_id: String,
    pub status: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: i64,
}

/// Payment data parked in handoff storage while the browser is on the hosted checkout page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPayment {
    pub travel_package_id: i64,
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub checkout_session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Backend payment already recorded for this checkout, reused by a retried confirmation
    #[serde(default)]
    pub payment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}
