//! Database layer for Courier.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! and embedded SQL migrations. The subscription registry and the delivery
//! ledger both live in the same SQLite file and share one pool.
//!
//! WAL mode lets registry reads proceed while the ledger appends, and every
//! ledger insert takes its own pooled connection, so concurrent deliveries
//! only contend on SQLite's write lock for the duration of one `INSERT`.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, open, DbError, DbPool, DbRuntimeSettings, PoolError};
