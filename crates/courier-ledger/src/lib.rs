//! Delivery ledger for Courier.
//!
//! Every delivery attempt, successful or not, is written here exactly once.
//! The ledger is the audit trail operators use to answer "did subscriber X
//! get event Y, and if not, why": it stores the payload snapshot that was
//! sent, the HTTP status (if any), the failure reason, and when the attempt
//! was opened and finished.
//!
//! There is no update or delete path. The schema backs this up with
//! triggers that abort any `UPDATE` or `DELETE` on `delivery_records`;
//! corrections are made by dispatching again, which appends a new record.
//!
//! # Usage
//!
//! ```rust,ignore
//! use courier_ledger::{query_deliveries, record_delivery};
//! use courier_types::DeliveryFilter;
//!
//! record_delivery(&conn, &record)?;
//! let failures = query_deliveries(
//!     &conn,
//!     &DeliveryFilter { success: Some(false), ..Default::default() },
//! )?;
//! ```

mod error;
mod sqlite;
mod store;

pub use error::LedgerError;
pub use sqlite::SqliteLedger;
pub use store::{delivery_summary, get_delivery, query_deliveries, record_delivery, DeliverySummary};

#[cfg(test)]
mod tests;
