//! Subscriber records.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::SubscriptionId;

/// A subscriber's signing secret.
///
/// The hex token is handed to the subscriber once, at creation. Afterwards
/// it only flows into the signer: `Debug` is redacted and the type has no
/// `Serialize` impl, so it cannot leak through logs or listings.
#[derive(Clone, PartialEq, Eq)]
pub struct SubscriptionSecret(String);

impl SubscriptionSecret {
    /// Wraps an existing hex token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token for signing or for the one-time creation response.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SubscriptionSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SubscriptionSecret([redacted])")
    }
}

/// An external party registered to receive a set of event types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Immutable identifier assigned at creation.
    pub id: SubscriptionId,
    /// Absolute callback URL.
    pub url: String,
    /// Event names this subscriber wants. Never empty.
    pub events: BTreeSet<String>,
    /// HMAC key. Immutable for the life of the subscription.
    #[serde(skip)]
    pub secret: SubscriptionSecret,
    /// `false` once unsubscribed. Subscriptions are never deleted.
    pub active: bool,
    /// When the subscription was created.
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether this subscription should receive `event` right now.
    pub fn wants(&self, event: &str) -> bool {
        self.active && self.events.contains(event)
    }
}

/// A subscription request that cannot be accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The URL could not be parsed as an absolute URL.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl {
        /// The rejected input.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// The URL uses a protocol other than `http` or `https`.
    #[error("unsupported url scheme '{0}', expected http or https")]
    UnsupportedScheme(String),

    /// The URL has no host component.
    #[error("url '{0}' has no host")]
    MissingHost(String),

    /// No event names were supplied.
    #[error("at least one event name is required")]
    NoEvents,

    /// An event name was empty or whitespace.
    #[error("event names must not be blank")]
    BlankEvent,
}
