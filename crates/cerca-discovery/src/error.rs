//! Discovery error types.

use cerca_core::error::CercaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("viewer location out of range: ({latitude}, {longitude})")]
    InvalidViewer { latitude: f64, longitude: f64 },

    #[error("max_distance_km must be a positive number")]
    InvalidDistance,

    #[error("max_distance_km requires a viewer location")]
    DistanceWithoutViewer,
}

impl From<DiscoveryError> for CercaError {
    fn from(err: DiscoveryError) -> Self {
        CercaError::invalid_input(err.to_string())
    }
}
