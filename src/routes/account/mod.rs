pub mod auth;
pub mod email_verification;
pub mod password_reset;
pub mod profile;
pub mod reservations;

const MIN_PASSWORD_LENGTH: usize = 8;
