//! Event intake.
//!
//! `POST /api/events` accepts an event and returns `202` immediately;
//! delivery runs in the background and its results land in the ledger.

use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::ApiError;
use crate::AppState;

/// Request body for `POST /api/events`.
#[derive(Debug, Deserialize)]
pub struct PublishEventRequest {
    /// Event name, matched exactly against subscription event sets.
    pub event: String,
    /// Arbitrary JSON delivered as the envelope's `data`.
    #[serde(default)]
    pub payload: Value,
}

/// Handler for `POST /api/events`.
pub async fn publish_event_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<PublishEventRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let event = body.event.trim();
    if event.is_empty() {
        return Err(ApiError::BadRequest("event name must not be blank".to_string()));
    }

    tracing::debug!(event, "event accepted");
    state.dispatcher.fire(event, body.payload);

    Ok((StatusCode::ACCEPTED, Json(json!({ "accepted": true }))))
}
