use serde::{Deserialize, Serialize};

/// Where a reservation total came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PriceSource {
    /// Computed by the backend's price calculation
    Backend,
    /// Local heuristic estimate after the backend calculation failed
    Estimated,
    /// Markup over the previous total when no base price could be obtained
    PageFallback,
}

impl PriceSource {
    pub fn is_authoritative(&self) -> bool {
        matches!(self, PriceSource::Backend)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecalculationRequest {
    pub travel_package_id: i64,
    pub custom_flight_id: Option<i64>,
    pub custom_flight_price: Option<f64>,
    pub custom_accommodation_id: Option<i64>,
    pub custom_accommodation_price: Option<f64>,
    pub includes_insurance: Option<bool>,
    /// Base price already known to the caller, used when the package lookup fails.
    /// Never sent to the backend.
    #[serde(skip)]
    pub base_price_hint: Option<f64>,
}

impl PriceRecalculationRequest {
    pub fn wants_flight(&self) -> bool {
        self.custom_flight_id.is_some() || self.custom_flight_price.is_some()
    }

    pub fn wants_accommodation(&self) -> bool {
        self.custom_accommodation_id.is_some() || self.custom_accommodation_price.is_some()
    }

    pub fn insurance(&self) -> bool {
        self.includes_insurance.unwrap_or(false)
    }
}

/// Response of `POST TravelPackage/calculate-price`; older deployments return a bare number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CalculatedPrice {
    Bare(f64),
    Wrapped {
        #[serde(rename = "totalPrice", alias = "newPrice", alias = "price")]
        total_price: f64,
    },
}

impl CalculatedPrice {
    pub fn total(&self) -> f64 {
        match self {
            CalculatedPrice::Bare(total) => *total,
            CalculatedPrice::Wrapped { total_price } => *total_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub total_price: f64,
    pub source: PriceSource,
    pub base_price: Option<f64>,
}

impl PriceQuote {
    pub fn backend(total_price: f64) -> Self {
        Self {
            total_price: total_price.max(0.0),
            source: PriceSource::Backend,
            base_price: None,
        }
    }

    pub fn estimated(total_price: f64, base_price: f64) -> Self {
        Self {
            total_price: total_price.max(0.0),
            source: PriceSource::Estimated,
            base_price: Some(base_price),
        }
    }

    pub fn page_fallback(total_price: f64) -> Self {
        Self {
            total_price: total_price.max(0.0),
            source: PriceSource::PageFallback,
            base_price: None,
        }
    }
}
