use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

use super::dates;

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: i64,
    #[serde(default)]
    pub airline: Option<String>,
    #[serde(default)]
    pub flight_number: Option<String>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub origin: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub destination: String,
    #[serde(deserialize_with = "dates::datetime")]
    pub departure_time: NaiveDateTime,
    #[serde(deserialize_with = "dates::datetime")]
    pub arrival_time: NaiveDateTime,
    pub price: f64,
    /// Number of intermediate stops, 0 for a direct flight
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub stops: u32,
    #[serde(default)]
    pub available_seats: Option<u32>,
}

impl Flight {
    pub fn is_direct(&self) -> bool {
        self.stops == 0
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.arrival_time - self.departure_time).num_minutes()
    }
}
