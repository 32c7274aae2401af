//! Signed webhook delivery for Courier.
//!
//! - [`signer`]: HMAC-SHA256 tags over request bodies.
//! - [`DeliveryExecutor`]: one signed POST per call, always yielding a
//!   [`DeliveryRecord`](courier_types::DeliveryRecord).
//! - [`Dispatcher`]: resolves subscribers for an event and fans deliveries
//!   out under a shared concurrency bound, appending every attempt to the
//!   ledger.
//!
//! There is no retry. A caller that wants another attempt dispatches again,
//! which appends new records.

mod dispatcher;
mod error;
mod executor;
pub mod signer;

pub use dispatcher::{DispatchSummary, Dispatcher, DEFAULT_MAX_CONCURRENCY};
pub use error::{DeliveryError, DispatchError};
pub use executor::{default_user_agent, envelope, DeliveryExecutor};
pub use signer::{sign, verify};
