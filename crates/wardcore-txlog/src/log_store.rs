//! The log store is an external collaborator: an opaque append-only byte
//! store. Segment replication, cleaning, and on-disk layout live outside
//! this crate; only the interface the prepared-op format consumes is pinned
//! here.

use crate::error::TxLogError;
use bytes::Bytes;
use wardcore_types::LogRef;

/// An opaque append-only log store.
pub trait LogStore: Send + Sync {
    /// Appends `bytes` and returns a handle to the written record.
    fn append(&self, bytes: &[u8]) -> Result<LogRef, TxLogError>;

    /// Reads back the bytes previously written at `log_ref`.
    fn read(&self, log_ref: LogRef) -> Result<Bytes, TxLogError>;
}

/// An in-memory `LogStore`, for tests throughout the workspace that need a
/// real (if non-durable) implementation rather than a mock.
pub mod testing {
    use super::{LogStore, TxLogError};
    use bytes::Bytes;
    use std::sync::Mutex;
    use wardcore_types::LogRef;

    pub struct MemoryLogStore {
        records: Mutex<Vec<Bytes>>,
    }

    impl MemoryLogStore {
        #[must_use]
        pub fn new() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
            }
        }
    }

    impl Default for MemoryLogStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl LogStore for MemoryLogStore {
        fn append(&self, bytes: &[u8]) -> Result<LogRef, TxLogError> {
            let mut records = self.records.lock().unwrap();
            let log_ref = LogRef::new(records.len() as u64);
            records.push(Bytes::copy_from_slice(bytes));
            Ok(log_ref)
        }

        fn read(&self, log_ref: LogRef) -> Result<Bytes, TxLogError> {
            let records = self.records.lock().unwrap();
            records
                .get(log_ref.0 as usize)
                .cloned()
                .ok_or(TxLogError::Truncated { need: 1, have: 0 })
        }
    }
}
