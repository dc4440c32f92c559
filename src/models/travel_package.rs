use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

use super::dates;

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelPackage {
    pub id: i64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub destination: String,
    #[serde(default, alias = "companyName")]
    pub company: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub available_dates: Vec<AvailableDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableDate {
    pub id: i64,
    #[serde(deserialize_with = "dates::date")]
    pub start_date: NaiveDate,
    #[serde(deserialize_with = "dates::date")]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub capacity: u32,
}

impl TravelPackage {
    /// Earliest date range starting on or after `today` that still has capacity
    pub fn next_available(&self, today: NaiveDate) -> Option<&AvailableDate> {
        self.available_dates
            .iter()
            .filter(|range| range.capacity > 0 && range.start_date >= today)
            .min_by_key(|range| range.start_date)
    }
}
