//! HTTP error mapping.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use cerca_core::error::CercaError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] CercaError),

    #[error("missing or malformed x-user-id header")]
    MissingIdentity,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::MissingIdentity => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            ApiError::Domain(err) => match err {
                CercaError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "invalid_input"),
                CercaError::Forbidden { .. } => (StatusCode::FORBIDDEN, "forbidden"),
                CercaError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
                CercaError::InvalidState { .. } => (StatusCode::CONFLICT, "invalid_state"),
                CercaError::UpstreamUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "upstream_unavailable")
                }
                CercaError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }

        // Internal details stay in the log.
        let message = match &self {
            ApiError::Domain(CercaError::Internal(_)) => "internal error".to_string(),
            other => other.to_string(),
        };

        let mut response =
            (status, Json(json!({ "error": { "code": code, "message": message } }))).into_response();
        if matches!(
            status,
            StatusCode::CONFLICT | StatusCode::SERVICE_UNAVAILABLE
        ) {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
