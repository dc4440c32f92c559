use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::dates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentType {
    Passport,
    NationalId,
    DriverLicense,
    Other,
}

impl DocumentType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().replace(['_', '-', ' '], "").as_str() {
            "passport" | "passaporte" => DocumentType::Passport,
            "nationalid" | "rg" | "identity" => DocumentType::NationalId,
            "driverlicense" | "cnh" => DocumentType::DriverLicense,
            _ => DocumentType::Other,
        }
    }
}

impl<'de> Deserialize<'de> for DocumentType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(DocumentType::parse(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerDocument {
    #[serde(rename = "type", alias = "documentType")]
    pub document_type: DocumentType,
    pub number: String,
    pub issuing_country: String,
    #[serde(default)]
    pub issuing_state: Option<String>,
    #[serde(deserialize_with = "dates::date")]
    pub issue_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Traveler {
    pub first_name: String,
    pub last_name: String,
    pub document: TravelerDocument,
    #[serde(deserialize_with = "dates::date")]
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub is_main_buyer: bool,
}

impl Traveler {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

/// Flat traveler shape accepted by `POST Traveler`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTravelerRecord {
    pub first_name: String,
    pub last_name: String,
    pub document_type: DocumentType,
    pub document_number: String,
    pub issuing_country: String,
    pub issuing_state: Option<String>,
    pub issue_date: NaiveDate,
    pub birth_date: NaiveDate,
    pub is_main_buyer: bool,
}

impl From<&Traveler> for NewTravelerRecord {
    fn from(traveler: &Traveler) -> Self {
        Self {
            first_name: traveler.first_name.trim().to_string(),
            last_name: traveler.last_name.trim().to_string(),
            document_type: traveler.document.document_type,
            document_number: traveler.document.number.trim().to_uppercase(),
            issuing_country: traveler.document.issuing_country.trim().to_string(),
            issuing_state: traveler.document.issuing_state.clone(),
            issue_date: traveler.document.issue_date,
            birth_date: traveler.birth_date,
            is_main_buyer: traveler.is_main_buyer,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerRecord {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerAssociation {
    pub traveler_id: i64,
    pub reservation_id: i64,
}
