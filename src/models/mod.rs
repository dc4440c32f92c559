pub mod accommodation;
pub mod dates;
pub mod envelope;
pub mod flight;
pub mod payment;
pub mod pricing;
pub mod reservation;
pub mod travel_package;
pub mod traveler;
pub mod user;
