//! Shared API plumbing: the error type every handler returns and the
//! helper that moves blocking storage calls off the async runtime.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use courier_ledger::LedgerError;
use courier_registry::RegistryError;
use courier_types::{DeliveryId, SubscriptionId};
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::Validation(v) => ApiError::BadRequest(v.to_string()),
            other => ApiError::InternalServerError(other.to_string()),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError::InternalServerError(e.to_string())
    }
}

/// Runs a blocking storage call on the blocking thread pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))?
}

pub(crate) fn parse_subscription_id(raw: &str) -> Result<SubscriptionId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid subscription id: {}", raw)))
}

pub(crate) fn parse_delivery_id(raw: &str) -> Result<DeliveryId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid delivery id: {}", raw)))
}
