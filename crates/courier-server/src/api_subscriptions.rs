//! Subscription management handlers.
//!
//! - `POST /api/subscriptions`: register a callback URL for a set of events
//! - `GET /api/subscriptions`: list subscriptions (never includes secrets)
//! - `GET /api/subscriptions/{id}`: fetch one subscription
//! - `DELETE /api/subscriptions/{id}`: unsubscribe (soft, idempotent)

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use courier_types::{Subscription, SubscriptionRegistry};
use serde::{Deserialize, Serialize};

use crate::api::{blocking, parse_subscription_id, ApiError};
use crate::AppState;

/// Request body for `POST /api/subscriptions`.
#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    /// Absolute `http` or `https` callback URL.
    pub url: String,
    /// Event names to receive.
    pub events: Vec<String>,
}

/// Response body for a newly created subscription.
///
/// This is the only response that carries the signing secret.
#[derive(Debug, Serialize)]
pub struct CreatedSubscription {
    #[serde(flatten)]
    pub subscription: Subscription,
    /// Hex HMAC key for verifying `X-Courier-Signature`.
    pub secret: String,
}

/// Query parameters for `GET /api/subscriptions`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSubscriptionsQuery {
    /// Include deactivated subscriptions (default: false).
    #[serde(default)]
    pub include_inactive: bool,
}

/// Response wrapper for subscription listings.
#[derive(Debug, Serialize)]
pub struct SubscriptionsResponse {
    pub subscriptions: Vec<Subscription>,
    pub count: usize,
}

/// Handler for `POST /api/subscriptions`.
pub async fn create_subscription_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<CreatedSubscription>), ApiError> {
    let registry = Arc::clone(&state.registry);
    let subscription =
        blocking(move || Ok(registry.create(&body.url, &body.events)?)).await?;

    let secret = subscription.secret.expose().to_string();
    Ok((
        StatusCode::CREATED,
        Json(CreatedSubscription {
            subscription,
            secret,
        }),
    ))
}

/// Handler for `GET /api/subscriptions`.
pub async fn list_subscriptions_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ListSubscriptionsQuery>,
) -> Result<Json<SubscriptionsResponse>, ApiError> {
    let registry = Arc::clone(&state.registry);
    let subscriptions =
        blocking(move || Ok(registry.list(params.include_inactive)?)).await?;

    let count = subscriptions.len();
    Ok(Json(SubscriptionsResponse {
        subscriptions,
        count,
    }))
}

/// Handler for `GET /api/subscriptions/{id}`.
pub async fn get_subscription_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Subscription>, ApiError> {
    let id = parse_subscription_id(&raw_id)?;
    let registry = Arc::clone(&state.registry);

    blocking(move || Ok(registry.get(id)?))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("subscription not found: {}", id)))
}

/// Handler for `DELETE /api/subscriptions/{id}`.
///
/// Always `204` for a well-formed id, whether or not it existed or was
/// still active.
pub async fn delete_subscription_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_subscription_id(&raw_id)?;
    let registry = Arc::clone(&state.registry);

    blocking(move || Ok(registry.deactivate(id)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}
