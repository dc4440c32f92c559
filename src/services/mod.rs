pub mod backend;
pub mod checkout_service;
pub mod handoff_storage;
pub mod price_estimator;
pub mod pricing_service;
pub mod search_service;
pub mod selector;
pub mod traveler_service;
