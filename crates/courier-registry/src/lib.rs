//! Subscription registry for Courier.
//!
//! Stores subscriber records (callback URL, event set, signing secret,
//! active flag) and resolves the active subscribers for an event name.
//!
//! Unsubscribing is a soft operation: rows are flipped to `active = 0` and
//! never removed, so delivery history keeps pointing at a real record.
//!
//! The free functions in this crate operate on a borrowed
//! [`rusqlite::Connection`]; [`SqliteRegistry`] wraps a pool and implements
//! [`courier_types::SubscriptionRegistry`] for the dispatcher.

mod error;
mod sqlite;
mod store;
mod validation;

pub use error::RegistryError;
pub use sqlite::SqliteRegistry;
pub use store::{
    create_subscription, deactivate_subscription, find_active_subscriptions, get_subscription,
    list_subscriptions,
};
pub use validation::{generate_secret, validate_request};
