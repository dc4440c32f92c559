pub mod client;
pub mod interface;

pub use client::BackendClient;
pub use interface::{BackendError, BookingBackend, CheckoutBackend};
