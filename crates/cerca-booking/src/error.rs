//! Booking error types.

use cerca_core::error::CercaError;
use cerca_core::models::service_request::{BookingAction, Party, RequestStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("price must be a positive amount")]
    InvalidPrice,

    #[error("unsupported duration: {0} minutes")]
    UnsupportedDuration(u32),

    #[error("{field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("agreed location must not be blank")]
    BlankLocation,

    #[error("at least one review tag is required")]
    EmptyTags,

    #[error("unknown review tag: {0}")]
    UnknownTag(String),

    #[error("a client cannot request their own profile")]
    SelfRequest,

    #[error("not a party to this request")]
    NotAParty,

    #[error("only the client may tag a service")]
    NotTheClient,

    #[error("only the {required:?} may {action}")]
    WrongParty {
        action: BookingAction,
        required: Party,
    },

    #[error("cannot {action} a request in state {status}")]
    TransitionRejected {
        action: BookingAction,
        status: RequestStatus,
    },

    #[error("request changed before {action} could apply")]
    LostRace { action: BookingAction },

    #[error("review tags can only be submitted once, after the service finished")]
    TagsClosed,
}

impl From<BookingError> for CercaError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::InvalidPrice
            | BookingError::UnsupportedDuration(_)
            | BookingError::TooLong { .. }
            | BookingError::BlankLocation
            | BookingError::EmptyTags
            | BookingError::UnknownTag(_) => CercaError::invalid_input(err.to_string()),
            BookingError::SelfRequest
            | BookingError::NotAParty
            | BookingError::NotTheClient
            | BookingError::WrongParty { .. } => CercaError::forbidden(err.to_string()),
            BookingError::TransitionRejected { .. }
            | BookingError::LostRace { .. }
            | BookingError::TagsClosed => CercaError::invalid_state(err.to_string()),
        }
    }
}
