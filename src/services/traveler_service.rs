use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::models::traveler::{DocumentType, Traveler};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum TravelerValidationError {
    NoTravelers,
    MainBuyerCount { count: usize },
    MissingName { index: usize },
    InvalidDocument { index: usize, number: String },
    MissingIssuingCountry { index: usize },
    InvalidBirthDate { index: usize },
    InvalidIssueDate { index: usize },
}

impl std::fmt::Display for TravelerValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TravelerValidationError::NoTravelers => write!(f, "At least one traveler is required"),
            TravelerValidationError::MainBuyerCount { count } => write!(
                f,
                "Exactly one traveler must be the main buyer, found {}",
                count
            ),
            TravelerValidationError::MissingName { index } => {
                write!(f, "Traveler {} is missing a first or last name", index + 1)
            }
            TravelerValidationError::InvalidDocument { index, number } => write!(
                f,
                "Traveler {} has an invalid document number `{}`",
                index + 1,
                number
            ),
            TravelerValidationError::MissingIssuingCountry { index } => {
                write!(f, "Traveler {} is missing the document issuing country", index + 1)
            }
            TravelerValidationError::InvalidBirthDate { index } => {
                write!(f, "Traveler {} has a birth date in the future", index + 1)
            }
            TravelerValidationError::InvalidIssueDate { index } => write!(
                f,
                "Traveler {} has a document issued in the future or before birth",
                index + 1
            ),
        }
    }
}

impl std::error::Error for TravelerValidationError {}

fn passport_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z0-9]{6,9}$").expect("valid passport pattern"))
}

fn document_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z0-9][A-Z0-9.\-/]{3,19}$").expect("valid document pattern"))
}

pub fn valid_document_number(document_type: DocumentType, number: &str) -> bool {
    let number = number.trim().to_uppercase();
    match document_type {
        DocumentType::Passport => passport_pattern().is_match(&number),
        _ => document_pattern().is_match(&number),
    }
}

/// Checks the traveler list before it may be submitted for payment.
pub fn validate_travelers(
    travelers: &[Traveler],
    today: NaiveDate,
) -> Result<(), TravelerValidationError> {
    if travelers.is_empty() {
        return Err(TravelerValidationError::NoTravelers);
    }

    let main_buyers = travelers.iter().filter(|t| t.is_main_buyer).count();
    if main_buyers != 1 {
        return Err(TravelerValidationError::MainBuyerCount { count: main_buyers });
    }

    for (index, traveler) in travelers.iter().enumerate() {
        if traveler.first_name.trim().is_empty() || traveler.last_name.trim().is_empty() {
            return Err(TravelerValidationError::MissingName { index });
        }

        let document = &traveler.document;
        if !valid_document_number(document.document_type, &document.number) {
            return Err(TravelerValidationError::InvalidDocument {
                index,
                number: document.number.clone(),
            });
        }
        if document.issuing_country.trim().is_empty() {
            return Err(TravelerValidationError::MissingIssuingCountry { index });
        }
        if traveler.birth_date > today {
            return Err(TravelerValidationError::InvalidBirthDate { index });
        }
        if document.issue_date > today || document.issue_date < traveler.birth_date {
            return Err(TravelerValidationError::InvalidIssueDate { index });
        }
    }

    Ok(())
}
