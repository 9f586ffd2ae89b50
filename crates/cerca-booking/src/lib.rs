//! Cerca Booking — the service request lifecycle between a client and a
//! professional.
//!
//! Every transition is a single conditional write on the stored status.
//! Of any number of callers racing for the same request, exactly one wins
//! and the rest get `InvalidState`.

pub mod config;
pub mod error;
pub mod service;

pub use config::BookingConfig;
pub use error::BookingError;
pub use service::{ApproveInput, BookingService, CreateRequestInput, FinishOutput};
