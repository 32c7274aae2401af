//! Pool-backed ledger handle.

use courier_db::DbPool;
use courier_types::{DeliveryFilter, DeliveryId, DeliveryLedger, DeliveryRecord, SubscriptionId};

use crate::error::LedgerError;
use crate::store::{self, DeliverySummary};

/// [`DeliveryLedger`] over a shared SQLite pool.
///
/// Every append checks out its own connection, so concurrent deliveries
/// only serialize on SQLite's write lock for the length of one insert.
#[derive(Clone)]
pub struct SqliteLedger {
    pool: DbPool,
}

impl SqliteLedger {
    /// Wraps an already-migrated pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Retrieves a single record by id.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` on pool or SQL failure.
    pub fn get(&self, id: DeliveryId) -> Result<Option<DeliveryRecord>, LedgerError> {
        let conn = self.pool.get()?;
        store::get_delivery(&conn, id)
    }

    /// Summarises the ledger for one subscription.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` on pool or SQL failure.
    pub fn summary(&self, subscription_id: SubscriptionId) -> Result<DeliverySummary, LedgerError> {
        let conn = self.pool.get()?;
        store::delivery_summary(&conn, subscription_id)
    }
}

impl DeliveryLedger for SqliteLedger {
    type Error = LedgerError;

    fn record(&self, record: &DeliveryRecord) -> Result<(), LedgerError> {
        let conn = self.pool.get()?;
        store::record_delivery(&conn, record)
    }

    fn query(&self, filter: &DeliveryFilter) -> Result<Vec<DeliveryRecord>, LedgerError> {
        let conn = self.pool.get()?;
        store::query_deliveries(&conn, filter)
    }
}
