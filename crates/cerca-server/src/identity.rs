//! Caller identity.
//!
//! Authentication happens upstream; by the time a request reaches this
//! service the authenticated user id is carried in `x-user-id`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct Actor(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .map(Actor)
            .ok_or(ApiError::MissingIdentity)
    }
}
