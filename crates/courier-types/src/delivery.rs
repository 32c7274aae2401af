//! Delivery attempt records and ledger filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DeliveryId, SubscriptionId};

/// How a single delivery attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The endpoint answered with a 2xx status inside the timeout.
    Delivered {
        /// HTTP status code.
        status: u16,
    },
    /// The endpoint answered, but not with a 2xx status.
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Human-readable cause.
        message: String,
    },
    /// No usable response: timeout, DNS, connection or transport failure.
    Failed {
        /// Human-readable cause.
        message: String,
    },
}

impl DeliveryOutcome {
    /// `true` only for [`DeliveryOutcome::Delivered`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    /// The HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Delivered { status } | Self::Rejected { status, .. } => Some(*status),
            Self::Failed { .. } => None,
        }
    }

    /// The failure reason, absent on success.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Delivered { .. } => None,
            Self::Rejected { message, .. } | Self::Failed { message } => Some(message),
        }
    }
}

/// One immutable ledger entry per delivery attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    /// Record identifier, also sent to the receiver as the delivery id.
    pub id: DeliveryId,
    /// The targeted subscription. Survives deactivation.
    pub subscription_id: SubscriptionId,
    /// The event name that triggered the attempt.
    pub event: String,
    /// Snapshot of the payload that was sent.
    pub payload: serde_json::Value,
    /// HTTP status, if any response was received.
    pub response_status: Option<u16>,
    /// `true` only for a 2xx response within the timeout.
    pub success: bool,
    /// Failure reason; present iff `success` is `false`.
    pub error_message: Option<String>,
    /// When the attempt finished.
    pub delivered_at: DateTime<Utc>,
    /// When the attempt was opened, before the network call.
    pub created_at: DateTime<Utc>,
    /// Wall-clock duration of the attempt.
    pub duration_ms: u64,
}

impl DeliveryRecord {
    /// Builds a finished record from an attempt's outcome.
    pub fn finish(
        id: DeliveryId,
        subscription_id: SubscriptionId,
        event: impl Into<String>,
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
        delivered_at: DateTime<Utc>,
        outcome: DeliveryOutcome,
    ) -> Self {
        let duration_ms = (delivered_at - created_at).num_milliseconds().max(0) as u64;
        Self {
            id,
            subscription_id,
            event: event.into(),
            payload,
            response_status: outcome.status(),
            success: outcome.is_success(),
            error_message: outcome.error_message().map(str::to_string),
            delivered_at,
            created_at,
            duration_ms,
        }
    }
}

/// Filter criteria for querying the delivery ledger.
#[derive(Debug, Clone, Default)]
pub struct DeliveryFilter {
    /// Only records for this subscription.
    pub subscription_id: Option<SubscriptionId>,
    /// Only records for this event name.
    pub event: Option<String>,
    /// Only successful (`true`) or failed (`false`) attempts.
    pub success: Option<bool>,
    /// Only records opened at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Maximum number of records to return (default: 100).
    pub limit: Option<i64>,
}
