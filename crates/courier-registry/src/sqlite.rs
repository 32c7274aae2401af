//! Pool-backed registry handle.

use courier_db::DbPool;
use courier_types::{Subscription, SubscriptionId, SubscriptionRegistry};

use crate::error::RegistryError;
use crate::store;

/// [`SubscriptionRegistry`] over a shared SQLite pool.
///
/// Each call checks out its own connection, so reads never hold a lock
/// across a dispatch fan-out.
#[derive(Clone)]
pub struct SqliteRegistry {
    pool: DbPool,
}

impl SqliteRegistry {
    /// Wraps an already-migrated pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Retrieves a subscription by id, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` on pool or SQL failure.
    pub fn get(&self, id: SubscriptionId) -> Result<Option<Subscription>, RegistryError> {
        let conn = self.pool.get()?;
        store::get_subscription(&conn, id)
    }

    /// Lists subscriptions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` on pool or SQL failure.
    pub fn list(&self, include_inactive: bool) -> Result<Vec<Subscription>, RegistryError> {
        let conn = self.pool.get()?;
        store::list_subscriptions(&conn, include_inactive)
    }
}

impl SubscriptionRegistry for SqliteRegistry {
    type Error = RegistryError;

    fn create(&self, url: &str, events: &[String]) -> Result<Subscription, RegistryError> {
        // Validate before checking out a connection so malformed requests
        // never touch storage.
        crate::validation::validate_request(url, events)?;
        let conn = self.pool.get()?;
        store::create_subscription(&conn, url, events)
    }

    fn deactivate(&self, id: SubscriptionId) -> Result<bool, RegistryError> {
        let conn = self.pool.get()?;
        store::deactivate_subscription(&conn, id)
    }

    fn find_active(&self, event: &str) -> Result<Vec<Subscription>, RegistryError> {
        let conn = self.pool.get()?;
        store::find_active_subscriptions(&conn, event)
    }
}
