//! Error types for the cerca system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CercaError {
    /// Malformed or out-of-range parameters. Never reaches the state machine.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// The actor is not a party to the request, or not the party allowed
    /// to perform this transition.
    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// The transition is not legal from the current state. Includes lost
    /// optimistic-concurrency races.
    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },

    /// A persistence or transport collaborator failed.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CercaError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Whether the caller should re-fetch the entity instead of showing a
    /// generic failure. Both cases usually mean the other party acted first.
    pub fn is_refresh_outcome(&self) -> bool {
        matches!(self, Self::InvalidState { .. } | Self::Forbidden { .. })
    }
}

pub type CercaResult<T> = Result<T, CercaError>;
