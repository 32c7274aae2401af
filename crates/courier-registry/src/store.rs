//! Persistence operations for subscriptions.

use std::collections::BTreeSet;

use courier_types::{
    format_timestamp, now, parse_timestamp, Subscription, SubscriptionId, SubscriptionSecret,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::RegistryError;
use crate::validation::{generate_secret, validate_request};

/// Columns selected for every subscription read. The last column folds the
/// event set into a JSON array so a subscription is decoded from one row.
const SUBSCRIPTION_COLUMNS: &str = "s.id, s.url, s.secret, s.active, s.created_at,
    (SELECT json_group_array(event) FROM subscription_events WHERE subscription_id = s.id)";

/// Validates and stores a new subscription.
///
/// The subscription row and its event rows are written in one transaction.
/// The returned value carries the freshly generated secret; this is the
/// only point at which callers can hand it to the subscriber.
///
/// # Errors
///
/// Returns `RegistryError::Validation` before touching the database if the
/// request is malformed, or `RegistryError::Database` on SQL failure.
pub fn create_subscription(
    conn: &Connection,
    url: &str,
    events: &[String],
) -> Result<Subscription, RegistryError> {
    let (url, events) = validate_request(url, events)?;

    let subscription = Subscription {
        id: SubscriptionId::new(),
        url,
        events,
        secret: generate_secret(),
        active: true,
        created_at: now(),
    };

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO subscriptions (id, url, secret, active, created_at)
         VALUES (?1, ?2, ?3, 1, ?4)",
        params![
            subscription.id.to_string(),
            subscription.url,
            subscription.secret.expose(),
            format_timestamp(&subscription.created_at),
        ],
    )?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO subscription_events (subscription_id, event) VALUES (?1, ?2)",
        )?;
        for event in &subscription.events {
            stmt.execute(params![subscription.id.to_string(), event])?;
        }
    }
    tx.commit()?;

    tracing::info!(
        subscription_id = %subscription.id,
        url = %subscription.url,
        events = subscription.events.len(),
        "subscription created"
    );

    Ok(subscription)
}

/// Marks a subscription inactive.
///
/// Idempotent: unknown ids and already-inactive subscriptions are left
/// alone and reported as `Ok(false)`.
///
/// # Errors
///
/// Returns `RegistryError::Database` on SQL failure.
pub fn deactivate_subscription(conn: &Connection, id: SubscriptionId) -> Result<bool, RegistryError> {
    let changed = conn.execute(
        "UPDATE subscriptions SET active = 0 WHERE id = ?1 AND active = 1",
        params![id.to_string()],
    )?;

    if changed > 0 {
        tracing::info!(subscription_id = %id, "subscription deactivated");
    } else {
        tracing::debug!(subscription_id = %id, "deactivate was a no-op");
    }

    Ok(changed > 0)
}

/// Returns every active subscription whose event set contains `event`.
///
/// This is a single `SELECT`, so it observes one consistent snapshot even
/// while other connections deactivate subscriptions. Results are ordered by
/// creation time; callers must not rely on delivery order.
///
/// # Errors
///
/// Returns `RegistryError::Database` on SQL failure or
/// `RegistryError::Corrupt` if a stored row cannot be decoded.
pub fn find_active_subscriptions(
    conn: &Connection,
    event: &str,
) -> Result<Vec<Subscription>, RegistryError> {
    let sql = format!(
        "SELECT {SUBSCRIPTION_COLUMNS}
         FROM subscriptions s
         WHERE s.active = 1
           AND EXISTS (
               SELECT 1 FROM subscription_events e
               WHERE e.subscription_id = s.id AND e.event = ?1
           )
         ORDER BY s.created_at ASC, s.id ASC"
    );
    collect(conn, &sql, params![event])
}

/// Retrieves a subscription by id, active or not.
///
/// # Errors
///
/// Returns `RegistryError::Database` on SQL failure or
/// `RegistryError::Corrupt` if the row cannot be decoded.
pub fn get_subscription(
    conn: &Connection,
    id: SubscriptionId,
) -> Result<Option<Subscription>, RegistryError> {
    let sql = format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions s WHERE s.id = ?1");
    let raw = conn
        .query_row(&sql, params![id.to_string()], RawSubscription::from_row)
        .optional()?;
    raw.map(RawSubscription::decode).transpose()
}

/// Lists subscriptions, oldest first.
///
/// # Errors
///
/// Returns `RegistryError::Database` on SQL failure or
/// `RegistryError::Corrupt` if a row cannot be decoded.
pub fn list_subscriptions(
    conn: &Connection,
    include_inactive: bool,
) -> Result<Vec<Subscription>, RegistryError> {
    let sql = format!(
        "SELECT {SUBSCRIPTION_COLUMNS}
         FROM subscriptions s
         WHERE (?1 OR s.active = 1)
         ORDER BY s.created_at ASC, s.id ASC"
    );
    collect(conn, &sql, params![include_inactive])
}

fn collect(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Subscription>, RegistryError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, RawSubscription::from_row)?;

    let mut subscriptions = Vec::new();
    for row in rows {
        subscriptions.push(row?.decode()?);
    }
    Ok(subscriptions)
}

/// A subscription row before text columns are parsed.
struct RawSubscription {
    id: String,
    url: String,
    secret: String,
    active: bool,
    created_at: String,
    events_json: String,
}

impl RawSubscription {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            url: row.get(1)?,
            secret: row.get(2)?,
            active: row.get(3)?,
            created_at: row.get(4)?,
            events_json: row.get(5)?,
        })
    }

    fn decode(self) -> Result<Subscription, RegistryError> {
        let id = self
            .id
            .parse::<SubscriptionId>()
            .map_err(|e| RegistryError::Corrupt(format!("{e}")))?;
        let created_at = parse_timestamp(&self.created_at)
            .map_err(|e| RegistryError::Corrupt(format!("created_at '{}': {e}", self.created_at)))?;
        let events: BTreeSet<String> = serde_json::from_str(&self.events_json)
            .map_err(|e| RegistryError::Corrupt(format!("events for {}: {e}", self.id)))?;

        Ok(Subscription {
            id,
            url: self.url,
            events,
            secret: SubscriptionSecret::new(self.secret),
            active: self.active,
            created_at,
        })
    }
}
