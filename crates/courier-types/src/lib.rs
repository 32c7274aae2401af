//! Shared types, error definitions, and constants for Courier.
//!
//! This crate provides the foundational types used across all Courier crates:
//! the subscription and delivery-record data model, typed identifiers, the
//! request validation error, and the storage interfaces the dispatcher is
//! written against.
//!
//! The delivery crate sees storage only through [`SubscriptionRegistry`] and
//! [`DeliveryLedger`]; the SQLite implementations are wired in by the server.

use std::time::Duration;

mod delivery;
mod id;
mod subscription;
mod time;

pub use delivery::{DeliveryFilter, DeliveryOutcome, DeliveryRecord};
pub use id::{DeliveryId, ParseIdError, SubscriptionId};
pub use subscription::{Subscription, SubscriptionSecret, ValidationError};
pub use time::{format_timestamp, now, parse_timestamp};

/// Header carrying the `sha256=<hex>` HMAC tag of the request body.
pub const SIGNATURE_HEADER: &str = "X-Courier-Signature";

/// Header carrying the name of the event being delivered.
pub const EVENT_HEADER: &str = "X-Courier-Event";

/// Header carrying the delivery record id, so receivers can de-duplicate.
pub const DELIVERY_HEADER: &str = "X-Courier-Delivery";

/// Fixed upper bound on a single delivery attempt.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Number of random bytes in a subscription secret (hex-encoded to twice this).
pub const SECRET_BYTES: usize = 32;

/// Source of subscribers for the dispatcher.
///
/// Implementations are blocking; async callers run them on the blocking
/// thread pool.
pub trait SubscriptionRegistry: Send + Sync + 'static {
    /// Storage error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Validates and stores a new subscription, generating its secret.
    fn create(&self, url: &str, events: &[String]) -> Result<Subscription, Self::Error>;

    /// Marks a subscription inactive.
    ///
    /// Unknown or already-inactive ids are not an error. Returns `true` when
    /// a subscription actually changed state.
    fn deactivate(&self, id: SubscriptionId) -> Result<bool, Self::Error>;

    /// Returns every active subscription whose event set contains `event`.
    fn find_active(&self, event: &str) -> Result<Vec<Subscription>, Self::Error>;
}

/// Append-only store of delivery attempts.
pub trait DeliveryLedger: Send + Sync + 'static {
    /// Storage error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Appends one finished delivery record.
    fn record(&self, record: &DeliveryRecord) -> Result<(), Self::Error>;

    /// Returns records matching `filter`, newest first.
    fn query(&self, filter: &DeliveryFilter) -> Result<Vec<DeliveryRecord>, Self::Error>;
}
