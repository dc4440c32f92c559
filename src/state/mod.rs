pub mod reservation_store;

pub use reservation_store::{ReservationSnapshot, ReservationStore, StoreError, UpdateTicket};
