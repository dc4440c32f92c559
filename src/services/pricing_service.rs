use log::{info, warn};

use crate::{
    models::pricing::{PriceQuote, PriceRecalculationRequest},
    services::{
        backend::{BackendError, BookingBackend},
        price_estimator::PricingHeuristics,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub enum PricingError {
    /// Neither the backend nor the caller could provide the package base price
    BasePriceUnavailable { package_id: i64, reason: String },
}

impl std::fmt::Display for PricingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PricingError::BasePriceUnavailable { package_id, reason } => write!(
                f,
                "Base price for package {} unavailable: {}",
                package_id, reason
            ),
        }
    }
}

impl std::error::Error for PricingError {}

/// Recalculates package totals, preferring the backend and degrading to
/// [`PricingHeuristics`] estimates.
pub struct PricingService<'a, B> {
    backend: &'a B,
    heuristics: &'a PricingHeuristics,
}

impl<'a, B: BookingBackend> PricingService<'a, B> {
    pub fn new(backend: &'a B, heuristics: &'a PricingHeuristics) -> Self {
        Self {
            backend,
            heuristics,
        }
    }

    pub async fn recalculate(
        &self,
        request: &PriceRecalculationRequest,
    ) -> Result<PriceQuote, PricingError> {
        match self.authoritative(request).await {
            Ok(quote) => return Ok(quote),
            Err(err) => warn!(
                "Backend price calculation failed for package {}, estimating: {}",
                request.travel_package_id, err
            ),
        }

        let quote = self.estimate(request).await?;
        info!(
            "Estimated total {:.2} for package {} (base {:?})",
            quote.total_price, request.travel_package_id, quote.base_price
        );
        Ok(quote)
    }

    /// The backend's own calculation, with no local fallback
    pub async fn authoritative(
        &self,
        request: &PriceRecalculationRequest,
    ) -> Result<PriceQuote, BackendError> {
        let total = self.backend.calculate_package_price(request).await?;
        if !total.is_finite() {
            return Err(BackendError::DecodeError(format!(
                "unusable price {}",
                total
            )));
        }
        Ok(PriceQuote::backend(total))
    }

    /// Local recalculation with whatever prices can still be looked up
    pub async fn estimate(
        &self,
        request: &PriceRecalculationRequest,
    ) -> Result<PriceQuote, PricingError> {
        let base_price = self.base_price(request).await?;

        let (flight_price, nightly_price) = futures::join!(
            self.flight_price(request, base_price),
            self.nightly_price(request, base_price)
        );

        let total = self.heuristics.estimate_total(
            base_price,
            flight_price,
            nightly_price,
            request.insurance(),
        );

        Ok(PriceQuote::estimated(total, base_price))
    }

    async fn base_price(&self, request: &PriceRecalculationRequest) -> Result<f64, PricingError> {
        match self.backend.travel_package(request.travel_package_id).await {
            Ok(package) => Ok(package.price),
            Err(err) => match request.base_price_hint {
                Some(hint) => {
                    warn!(
                        "Package {} lookup failed, using known base price {}: {}",
                        request.travel_package_id, hint, err
                    );
                    Ok(hint)
                }
                None => Err(PricingError::BasePriceUnavailable {
                    package_id: request.travel_package_id,
                    reason: err.to_string(),
                }),
            },
        }
    }

    async fn flight_price(
        &self,
        request: &PriceRecalculationRequest,
        base_price: f64,
    ) -> Option<f64> {
        if !request.wants_flight() {
            return None;
        }

        let looked_up = match request.custom_flight_id {
            Some(id) => log_lookup("flight", id, self.backend.flight(id).await.map(|f| f.price)),
            None => None,
        };

        Some(
            looked_up
                .or(request.custom_flight_price)
                .unwrap_or_else(|| self.heuristics.estimated_flight_price(base_price)),
        )
    }

    async fn nightly_price(
        &self,
        request: &PriceRecalculationRequest,
        base_price: f64,
    ) -> Option<f64> {
        if !request.wants_accommodation() {
            return None;
        }

        let looked_up = match request.custom_accommodation_id {
            Some(id) => log_lookup(
                "accommodation",
                id,
                self.backend.accommodation(id).await.map(|a| a.price_per_night),
            ),
            None => None,
        };

        Some(
            looked_up
                .or(request.custom_accommodation_price)
                .unwrap_or_else(|| self.heuristics.estimated_nightly_price(base_price)),
        )
    }
}

fn log_lookup(kind: &str, id: i64, result: Result<f64, BackendError>) -> Option<f64> {
    match result {
        Ok(price) if price.is_finite() => Some(price),
        Ok(price) => {
            warn!("Ignoring {} {} price {}", kind, id, price);
            None
        }
        Err(err) => {
            warn!("Could not fetch {} {} price: {}", kind, id, err);
            None
        }
    }
}
