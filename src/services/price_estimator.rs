//! Heuristic package costing used when the backend cannot price a customization.
//!
//! A package price is assumed to contain a "standard" flight worth a fixed share
//! of the base price and a "standard" hotel stay worth another share. Swapping
//! either one moves the total by the difference between the chosen option and
//! that standard share. None of the ratios has a documented derivation, so all
//! of them can be overridden from the environment.

use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingHeuristics {
    /// Nights assumed for every hotel stay
    pub nights: u32,
    /// Share of the base price assumed to pay for the standard flight
    pub flight_baseline_ratio: f64,
    /// Share of the base price assumed to pay for the standard hotel stay
    pub hotel_baseline_ratio: f64,
    /// Nightly price guessed for a hotel with no known price
    pub nightly_estimate_ratio: f64,
    /// Flight price guessed for a flight with no known price
    pub flight_estimate_ratio: f64,
    /// Travel insurance surcharge
    pub insurance_ratio: f64,
    /// Markup applied to the previous total when nothing else can be priced
    pub page_fallback_markup: f64,
}

impl Default for PricingHeuristics {
    fn default() -> Self {
        Self {
            nights: 5,
            flight_baseline_ratio: 0.50,
            hotel_baseline_ratio: 0.30,
            nightly_estimate_ratio: 0.08,
            flight_estimate_ratio: 0.12,
            insurance_ratio: 0.05,
            page_fallback_markup: 0.10,
        }
    }
}

impl PricingHeuristics {
    /// Create heuristics from environment variables or use defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let heuristics = Self {
            nights: std::env::var("PRICING_NIGHTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.nights),
            flight_baseline_ratio: ratio_from_env("PRICING_FLIGHT_BASELINE")
                .unwrap_or(defaults.flight_baseline_ratio),
            hotel_baseline_ratio: ratio_from_env("PRICING_HOTEL_BASELINE")
                .unwrap_or(defaults.hotel_baseline_ratio),
            nightly_estimate_ratio: ratio_from_env("PRICING_NIGHTLY_ESTIMATE")
                .unwrap_or(defaults.nightly_estimate_ratio),
            flight_estimate_ratio: ratio_from_env("PRICING_FLIGHT_ESTIMATE")
                .unwrap_or(defaults.flight_estimate_ratio),
            insurance_ratio: ratio_from_env("PRICING_INSURANCE")
                .unwrap_or(defaults.insurance_ratio),
            page_fallback_markup: ratio_from_env("PRICING_PAGE_FALLBACK_MARKUP")
                .unwrap_or(defaults.page_fallback_markup),
        };

        info!("Pricing heuristics: {:?}", heuristics);
        heuristics
    }

    pub fn estimated_nightly_price(&self, base_price: f64) -> f64 {
        base_price * self.nightly_estimate_ratio
    }

    pub fn estimated_flight_price(&self, base_price: f64) -> f64 {
        base_price * self.flight_estimate_ratio
    }

    /// Cost change of replacing the standard hotel with one at `nightly_price`
    pub fn accommodation_delta(&self, base_price: f64, nightly_price: f64) -> f64 {
        nightly_price * self.nights as f64 - base_price * self.hotel_baseline_ratio
    }

    /// Cost change of replacing the standard flight with one at `flight_price`
    pub fn flight_delta(&self, base_price: f64, flight_price: f64) -> f64 {
        flight_price - base_price * self.flight_baseline_ratio
    }

    pub fn insurance_cost(&self, base_price: f64) -> f64 {
        base_price * self.insurance_ratio
    }

    /// Total for a package with optional substitutions; never negative.
    pub fn estimate_total(
        &self,
        base_price: f64,
        flight_price: Option<f64>,
        nightly_price: Option<f64>,
        includes_insurance: bool,
    ) -> f64 {
        let mut total = base_price;

        if let Some(nightly_price) = nightly_price {
            total += self.accommodation_delta(base_price, nightly_price);
        }
        if let Some(flight_price) = flight_price {
            total += self.flight_delta(base_price, flight_price);
        }
        if includes_insurance {
            total += self.insurance_cost(base_price);
        }

        clamp_price(total)
    }

    pub fn page_fallback(&self, current_total: f64) -> f64 {
        clamp_price(current_total * (1.0 + self.page_fallback_markup))
    }
}

/// Clamps into `[0, f64::MAX]`; NaN becomes zero.
pub fn clamp_price(price: f64) -> f64 {
    if price.is_nan() {
        0.0
    } else {
        price.clamp(0.0, f64::MAX)
    }
}

fn ratio_from_env(key: &str) -> Option<f64> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|r| r.is_finite() && *r >= 0.0)
}
