//! Maps [`GatewayError`] to the `{"error": "<message>"}` envelope and
//! HTTP status from the error-handling design table. Nothing here ever
//! reconstructs a more specific message than the kind allows.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use sentinel_core::GatewayError;

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        Self(e)
    }
}

impl From<sentinel_core::RepoError> for ApiError {
    fn from(e: sentinel_core::RepoError) -> Self {
        Self(GatewayError::from(e))
    }
}

impl From<sentinel_envelope::CryptoError> for ApiError {
    fn from(_: sentinel_envelope::CryptoError) -> Self {
        Self(GatewayError::CryptoFailure)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            GatewayError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            GatewayError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            GatewayError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".to_string()),
            GatewayError::NotFound(kind) => (StatusCode::NOT_FOUND, format!("{kind} not found")),
            GatewayError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            GatewayError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            GatewayError::CryptoFailure => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CryptoFailure".to_string())
            }
            GatewayError::BackendFailure => {
                (StatusCode::BAD_GATEWAY, "backend failure".to_string())
            }
            GatewayError::UpstreamTimeout => {
                (StatusCode::GATEWAY_TIMEOUT, "upstream timeout".to_string())
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
