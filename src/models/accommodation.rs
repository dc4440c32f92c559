use serde::{Deserialize, Deserializer, Serialize};
use serde_with::{serde_as, DefaultOnNull};

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accommodation {
    pub id: i64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default, alias = "destination")]
    pub city: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub rating: f64,
    pub price_per_night: f64,
    #[serde(default, deserialize_with = "amenity_list")]
    pub amenities: Vec<String>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub room_types: Vec<RoomType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomType {
    pub name: String,
    pub price_per_night: f64,
}

/// Hotel chosen in the reservation flow, with the room type that fixed its nightly price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedAccommodation {
    pub accommodation: Accommodation,
    pub room_type: Option<String>,
    pub price_per_night: f64,
}

impl Accommodation {
    pub fn room(&self, name: &str) -> Option<&RoomType> {
        self.room_types
            .iter()
            .find(|room| room.name.eq_ignore_ascii_case(name))
    }

    /// Picks the nightly price for an optional room type; `None` when the room type is unknown.
    pub fn select(self, room_type: Option<&str>) -> Option<SelectedAccommodation> {
        let (room_type, price_per_night) = match room_type {
            Some(name) => {
                let room = self.room(name)?;
                (Some(room.name.clone()), room.price_per_night)
            }
            None => (None, self.price_per_night),
        };

        Some(SelectedAccommodation {
            accommodation: self,
            room_type,
            price_per_night,
        })
    }
}

/// Amenities arrive either as a list or as one comma-separated string.
fn amenity_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
    }

    let raw = Option::<Raw>::deserialize(deserializer)?;
    let amenities = match raw {
        None => Vec::new(),
        Some(Raw::List(items)) => items,
        Some(Raw::Joined(joined)) => joined.split(',').map(str::to_string).collect(),
    };

    Ok(amenities
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect())
}
