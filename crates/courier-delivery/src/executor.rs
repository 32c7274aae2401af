//! Single-attempt HTTP delivery.

use std::error::Error as _;
use std::time::{Duration, Instant};

use courier_types::{
    now, DeliveryId, DeliveryOutcome, DeliveryRecord, Subscription, DEFAULT_DELIVERY_TIMEOUT,
    DELIVERY_HEADER, EVENT_HEADER, SIGNATURE_HEADER,
};
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};

use crate::error::DeliveryError;
use crate::signer::sign;

/// Default `User-Agent` sent with every delivery.
pub fn default_user_agent() -> String {
    format!("courier/{}", env!("CARGO_PKG_VERSION"))
}

/// Builds the request body: `{"data": <payload>, "event": <name>}`.
///
/// `serde_json` maps are ordered by key, so the same event and payload
/// always produce the same bytes and therefore the same signature.
pub fn envelope(event: &str, payload: &Value) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&json!({ "event": event, "data": payload }))
}

/// Performs exactly one signed POST per call and reports the outcome as a
/// [`DeliveryRecord`].
///
/// The underlying client is built once and shared; it never follows
/// redirects, so a 3xx is recorded as a rejection rather than silently
/// re-targeted.
#[derive(Debug, Clone)]
pub struct DeliveryExecutor {
    client: reqwest::Client,
    timeout: Duration,
}

impl DeliveryExecutor {
    /// Creates an executor with the given per-attempt timeout.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Client` if the TLS backend cannot be
    /// initialised.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client, timeout })
    }

    /// Creates an executor with the five second timeout and default user agent.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Client` if the client cannot be built.
    pub fn with_defaults() -> Result<Self, DeliveryError> {
        Self::new(DEFAULT_DELIVERY_TIMEOUT, &default_user_agent())
    }

    /// The per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Delivers `payload` for `event` to one subscriber.
    ///
    /// Never fails: transport errors, timeouts and non-2xx responses all
    /// come back as a record with `success = false`.
    pub async fn deliver(
        &self,
        subscription: &Subscription,
        event: &str,
        payload: &Value,
    ) -> DeliveryRecord {
        let id = DeliveryId::new();
        let created_at = now();
        let started = Instant::now();

        let outcome = match envelope(event, payload) {
            Ok(body) => self.post(subscription, event, id, body).await,
            Err(e) => DeliveryOutcome::Failed {
                message: format!("failed to serialize payload: {e}"),
            },
        };

        let record = DeliveryRecord::finish(
            id,
            subscription.id,
            event,
            payload.clone(),
            created_at,
            now(),
            outcome,
        );
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if record.success {
            tracing::info!(
                delivery_id = %record.id,
                subscription_id = %subscription.id,
                event,
                status = record.response_status,
                duration_ms = elapsed_ms,
                "webhook delivered"
            );
        } else {
            tracing::warn!(
                delivery_id = %record.id,
                subscription_id = %subscription.id,
                event,
                status = record.response_status,
                duration_ms = elapsed_ms,
                error = record.error_message.as_deref().unwrap_or_default(),
                "webhook delivery failed"
            );
        }

        record
    }

    async fn post(
        &self,
        subscription: &Subscription,
        event: &str,
        id: DeliveryId,
        body: Vec<u8>,
    ) -> DeliveryOutcome {
        let signature = sign(subscription.secret.expose(), &body);

        let result = self
            .client
            .post(&subscription.url)
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .header(EVENT_HEADER, event)
            .header(DELIVERY_HEADER, id.to_string())
            .body(body)
            .send()
            .await;

        match result {
            Ok(response) => classify_status(response.status()),
            Err(e) => DeliveryOutcome::Failed {
                message: describe_transport_error(&e, self.timeout),
            },
        }
    }
}

fn classify_status(status: reqwest::StatusCode) -> DeliveryOutcome {
    let code = status.as_u16();
    if status.is_success() {
        return DeliveryOutcome::Delivered { status: code };
    }
    let message = match status.canonical_reason() {
        Some(reason) => format!("HTTP {code} {reason}"),
        None => format!("HTTP {code}"),
    };
    DeliveryOutcome::Rejected {
        status: code,
        message,
    }
}

fn describe_transport_error(err: &reqwest::Error, timeout: Duration) -> String {
    if err.is_timeout() {
        return format!("request timed out after {}ms", timeout.as_millis());
    }

    // reqwest's top-level message is generic; the useful detail (refused,
    // DNS failure, TLS) lives further down the source chain.
    let mut message = if err.is_connect() {
        "connection failed".to_string()
    } else {
        "request failed".to_string()
    };
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
