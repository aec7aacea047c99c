//! On-log binary format for prepared transaction operations and their
//! tombstones: the records that make the lock-and-commit protocol
//! crash-safe.

mod error;
mod log_store;
mod participant;
mod record;
mod tombstone;

pub use error::TxLogError;
pub use log_store::LogStore;
pub use participant::TxParticipant;
pub use record::{PreparedOpRecord, PreparedOpRecordHeader};
pub use tombstone::{PreparedOpTombstone, PreparedOpTombstoneHeader};

pub use log_store::testing;
