//! Delivery ledger handlers.
//!
//! Read-only: the ledger has no write path over HTTP.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use courier_ledger::DeliverySummary;
use courier_types::{parse_timestamp, DeliveryFilter, DeliveryLedger, DeliveryRecord};
use serde::{Deserialize, Serialize};

use crate::api::{blocking, parse_delivery_id, parse_subscription_id, ApiError};
use crate::AppState;

/// Query parameters for `GET /api/deliveries`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveriesQuery {
    /// Only records for this subscription.
    pub subscription_id: Option<String>,
    /// Only records for this event name.
    pub event: Option<String>,
    /// Only successful (`true`) or failed (`false`) attempts.
    pub success: Option<bool>,
    /// Only records created at or after this RFC 3339 timestamp.
    pub since: Option<String>,
    /// Maximum number of records to return (default: 100, max: 1000).
    pub limit: Option<i64>,
}

/// Response wrapper for ledger queries.
#[derive(Debug, Serialize)]
pub struct DeliveriesResponse {
    /// Matching records, newest first.
    pub deliveries: Vec<DeliveryRecord>,
    /// The number of records returned.
    pub count: usize,
}

/// Handler for `GET /api/deliveries`.
pub async fn list_deliveries_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<DeliveriesQuery>,
) -> Result<Json<DeliveriesResponse>, ApiError> {
    let subscription_id = params
        .subscription_id
        .as_deref()
        .map(parse_subscription_id)
        .transpose()?;

    let since = params
        .since
        .as_deref()
        .map(|raw| {
            parse_timestamp(raw)
                .map_err(|e| ApiError::BadRequest(format!("invalid since '{}': {}", raw, e)))
        })
        .transpose()?;

    let filter = DeliveryFilter {
        subscription_id,
        event: params.event,
        success: params.success,
        since,
        limit: Some(params.limit.unwrap_or(100).clamp(1, 1000)),
    };

    let ledger = Arc::clone(&state.ledger);
    let deliveries = blocking(move || Ok(ledger.query(&filter)?)).await?;

    let count = deliveries.len();
    Ok(Json(DeliveriesResponse { deliveries, count }))
}

/// Handler for `GET /api/deliveries/{id}`.
pub async fn get_delivery_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<DeliveryRecord>, ApiError> {
    let id = parse_delivery_id(&raw_id)?;
    let ledger = Arc::clone(&state.ledger);

    blocking(move || Ok(ledger.get(id)?))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("delivery not found: {}", id)))
}

/// Handler for `GET /api/subscriptions/{id}/deliveries/summary`.
pub async fn subscription_summary_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<DeliverySummary>, ApiError> {
    let id = parse_subscription_id(&raw_id)?;
    let registry = Arc::clone(&state.registry);
    let ledger = Arc::clone(&state.ledger);

    let summary = blocking(move || {
        if registry.get(id)?.is_none() {
            return Err(ApiError::NotFound(format!("subscription not found: {}", id)));
        }
        Ok(ledger.summary(id)?)
    })
    .await?;

    Ok(Json(summary))
}
