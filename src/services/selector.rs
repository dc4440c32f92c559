//! Client-side filtering for the flight and hotel selector panels.
//!
//! Panels fetch their whole candidate list once and re-scan it on every filter
//! change. Exactly one filter is active at a time.

use serde::Deserialize;

use crate::{
    models::{accommodation::Accommodation, flight::Flight},
    services::search_service::{matches_query, normalize},
};

/// Raw query parameters shared by both panels
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterQuery {
    pub filter: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
    pub amenity: Option<String>,
    /// Free-text search applied before the filter
    pub q: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
    UnknownFilter(String),
    MissingParameter(&'static str),
    InvalidRange { min: f64, max: f64 },
    InvalidRating(f64),
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::UnknownFilter(name) => write!(f, "Unknown filter `{}`", name),
            FilterError::MissingParameter(name) => write!(f, "Missing parameter `{}`", name),
            FilterError::InvalidRange { min, max } => {
                write!(f, "Invalid price range {} - {}", min, max)
            }
            FilterError::InvalidRating(rating) => {
                write!(f, "Rating must be between 0 and 5, got {}", rating)
            }
        }
    }
}

impl std::error::Error for FilterError {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    fn from_query(query: &FilterQuery) -> Result<Self, FilterError> {
        match (query.min_price, query.max_price) {
            (None, None) => Err(FilterError::MissingParameter("minPrice or maxPrice")),
            (Some(min), Some(max)) if min > max => Err(FilterError::InvalidRange { min, max }),
            (min, max) => Ok(Self { min, max }),
        }
    }

    pub fn contains(&self, price: f64) -> bool {
        self.min.map_or(true, |min| price >= min) && self.max.map_or(true, |max| price <= max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlightFilter {
    All,
    Price(PriceRange),
    Direct,
    Connecting,
}

impl FlightFilter {
    pub fn from_query(query: &FilterQuery) -> Result<Self, FilterError> {
        let name = query.filter.as_deref().map(str::trim).unwrap_or("all");
        match name.to_lowercase().as_str() {
            "" | "all" => Ok(FlightFilter::All),
            "price" => Ok(FlightFilter::Price(PriceRange::from_query(query)?)),
            "direct" => Ok(FlightFilter::Direct),
            "connecting" | "stops" => Ok(FlightFilter::Connecting),
            other => Err(FilterError::UnknownFilter(other.to_string())),
        }
    }

    pub fn matches(&self, flight: &Flight) -> bool {
        match self {
            FlightFilter::All => true,
            FlightFilter::Price(range) => range.contains(flight.price),
            FlightFilter::Direct => flight.is_direct(),
            FlightFilter::Connecting => !flight.is_direct(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HotelFilter {
    All,
    Price(PriceRange),
    MinRating(f64),
    /// Normalized amenity keyword
    Amenity(String),
}

impl HotelFilter {
    pub fn from_query(query: &FilterQuery) -> Result<Self, FilterError> {
        let name = query.filter.as_deref().map(str::trim).unwrap_or("all");
        match name.to_lowercase().as_str() {
            "" | "all" => Ok(HotelFilter::All),
            "price" => Ok(HotelFilter::Price(PriceRange::from_query(query)?)),
            "rating" => {
                let rating = query
                    .min_rating
                    .ok_or(FilterError::MissingParameter("minRating"))?;
                if !(0.0..=5.0).contains(&rating) {
                    return Err(FilterError::InvalidRating(rating));
                }
                Ok(HotelFilter::MinRating(rating))
            }
            "amenity" => {
                let keyword = query
                    .amenity
                    .as_deref()
                    .map(normalize)
                    .filter(|k| !k.is_empty())
                    .ok_or(FilterError::MissingParameter("amenity"))?;
                Ok(HotelFilter::Amenity(keyword))
            }
            other => Err(FilterError::UnknownFilter(other.to_string())),
        }
    }

    pub fn matches(&self, hotel: &Accommodation) -> bool {
        match self {
            HotelFilter::All => true,
            HotelFilter::Price(range) => range.contains(hotel.price_per_night),
            HotelFilter::MinRating(rating) => hotel.rating >= *rating,
            HotelFilter::Amenity(keyword) => hotel
                .amenities
                .iter()
                .any(|amenity| normalize(amenity).contains(keyword.as_str())),
        }
    }
}

pub fn select_flights(flights: &[Flight], query: &FilterQuery) -> Result<Vec<Flight>, FilterError> {
    let filter = FlightFilter::from_query(query)?;
    let text = query.q.as_deref().unwrap_or("");

    Ok(flights
        .iter()
        .filter(|flight| {
            let airline = flight.airline.as_deref().unwrap_or("");
            matches_query(
                text,
                &[flight.origin.as_str(), flight.destination.as_str(), airline],
            )
        })
        .filter(|flight| filter.matches(flight))
        .cloned()
        .collect())
}

pub fn select_accommodations(
    hotels: &[Accommodation],
    query: &FilterQuery,
) -> Result<Vec<Accommodation>, FilterError> {
    let filter = HotelFilter::from_query(query)?;
    let text = query.q.as_deref().unwrap_or("");

    Ok(hotels
        .iter()
        .filter(|hotel| matches_query(text, &[hotel.name.as_str(), hotel.city.as_str()]))
        .filter(|hotel| filter.matches(hotel))
        .cloned()
        .collect())
}
