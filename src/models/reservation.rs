use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

use super::{
    accommodation::SelectedAccommodation, dates, flight::Flight, pricing::PriceRecalculationRequest,
    travel_package::TravelPackage, traveler::Traveler,
};

/// Client-side state of the reservation page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationData {
    pub travel_package: TravelPackage,
    #[serde(default)]
    pub selected_flight: Option<Flight>,
    #[serde(default)]
    pub selected_accommodation: Option<SelectedAccommodation>,
    #[serde(default)]
    pub travelers: Vec<Traveler>,
    #[serde(default)]
    pub includes_insurance: bool,
    /// Cached total, recomputed on every customization
    pub total_price: f64,
}

impl ReservationData {
    pub fn for_package(travel_package: TravelPackage) -> Self {
        let total_price = travel_package.price.max(0.0);
        Self {
            travel_package,
            selected_flight: None,
            selected_accommodation: None,
            travelers: Vec::new(),
            includes_insurance: false,
            total_price,
        }
    }

    /// Recalculation input covering every customization currently applied.
    /// A package without a usable price contributes no base price hint.
    pub fn price_request(&self) -> PriceRecalculationRequest {
        PriceRecalculationRequest {
            travel_package_id: self.travel_package.id,
            custom_flight_id: self.selected_flight.as_ref().map(|f| f.id),
            custom_flight_price: self.selected_flight.as_ref().map(|f| f.price),
            custom_accommodation_id: self
                .selected_accommodation
                .as_ref()
                .map(|a| a.accommodation.id),
            custom_accommodation_price: self
                .selected_accommodation
                .as_ref()
                .map(|a| a.price_per_night),
            includes_insurance: Some(self.includes_insurance),
            base_price_hint: Some(self.travel_package.price)
                .filter(|price| price.is_finite() && *price > 0.0),
        }
    }

    pub fn main_buyer(&self) -> Option<&Traveler> {
        self.travelers.iter().find(|t| t.is_main_buyer)
    }
}

/// Body of `POST Reservation`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReservation {
    pub travel_package_id: i64,
    pub user_id: Option<String>,
    pub payment_id: i64,
    pub flight_id: Option<i64>,
    pub accommodation_id: Option<i64>,
    pub room_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub total_price: f64,
    pub includes_insurance: bool,
    pub status: String,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: i64,
    #[serde(default)]
    pub travel_package_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub total_price: Option<f64>,
    #[serde(default, deserialize_with = "dates::option_date")]
    pub start_date: Option<NaiveDate>,
}
