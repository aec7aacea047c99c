//! `PreparedOps`: the in-memory map of active prepared operations, each
//! holding a lock on its log reference and an armed watchdog.

use crate::error::TxTableError;
use crate::object_manager::ObjectManager;
use crate::watchdog::WatchdogQueue;
use std::collections::HashMap;
use std::sync::Mutex;
use wardcore_clock::Clock;
use wardcore_txlog::{LogStore, PreparedOpRecord};
use wardcore_types::{ClientLeaseId, LogRef, OpKey, RpcId};

#[derive(Debug, Clone, Copy)]
struct PreparedItem {
    log_ref: LogRef,
    deleted: bool,
    watchdog_token: u64,
}

struct Inner {
    items: HashMap<OpKey, PreparedItem>,
    watchdogs: WatchdogQueue,
}

/// In-memory table of prepared two-phase-commit locks, keyed by
/// `(clientLeaseId, rpcId)`. All operations run under a single monitor lock;
/// the lock is never held across log I/O.
pub struct PreparedOps<C> {
    inner: Mutex<Inner>,
    clock: C,
    tx_timeout_micros: u64,
}

impl<C: Clock> PreparedOps<C> {
    #[must_use]
    pub fn new(clock: C, tx_timeout_micros: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: HashMap::new(),
                watchdogs: WatchdogQueue::new(),
            }),
            clock,
            tx_timeout_micros,
        }
    }

    /// Inserts `(leaseId, rpcId) -> logRef` and arms its watchdog.
    ///
    /// Fails with `TxTableError::Duplicate` if the key already exists,
    /// unless `in_recovery` is set, in which case the existing entry is
    /// replaced and its watchdog restarted.
    pub fn buffer_op(
        &self,
        lease_id: ClientLeaseId,
        rpc_id: RpcId,
        log_ref: LogRef,
        in_recovery: bool,
    ) -> Result<(), TxTableError> {
        let key = (lease_id, rpc_id);
        let mut inner = self.inner.lock().expect("prepared ops mutex poisoned");

        if inner.items.contains_key(&key) && !in_recovery {
            return Err(TxTableError::Duplicate { lease_id, rpc_id });
        }

        let now = self.clock.now_micros();
        let watchdog_token = inner.watchdogs.arm(key, now, self.tx_timeout_micros);
        inner.items.insert(
            key,
            PreparedItem {
                log_ref,
                deleted: false,
                watchdog_token,
            },
        );
        Ok(())
    }

    /// Removes the entry and returns its log reference, stopping its
    /// watchdog. Returns `LogRef::NULL` if absent.
    pub fn pop_op(&self, lease_id: ClientLeaseId, rpc_id: RpcId) -> LogRef {
        let mut inner = self.inner.lock().expect("prepared ops mutex poisoned");
        inner
            .items
            .remove(&(lease_id, rpc_id))
            .map_or(LogRef::NULL, |item| item.log_ref)
    }

    /// Read-only lookup; `LogRef::NULL` if absent.
    #[must_use]
    pub fn peek_op(&self, lease_id: ClientLeaseId, rpc_id: RpcId) -> LogRef {
        let inner = self.inner.lock().expect("prepared ops mutex poisoned");
        inner
            .items
            .get(&(lease_id, rpc_id))
            .map_or(LogRef::NULL, |item| item.log_ref)
    }

    /// Atomically replaces an entry's log reference (used by the log
    /// cleaner when records move). The watchdog is left armed as-is.
    /// Returns `false` if the entry does not exist.
    pub fn update_ptr(&self, lease_id: ClientLeaseId, rpc_id: RpcId, new_log_ref: LogRef) -> bool {
        let mut inner = self.inner.lock().expect("prepared ops mutex poisoned");
        if let Some(item) = inner.items.get_mut(&(lease_id, rpc_id)) {
            item.log_ref = new_log_ref;
            true
        } else {
            false
        }
    }

    /// Sets the monotonic "deleted" marker. No-op if the entry is absent.
    pub fn mark_deleted(&self, lease_id: ClientLeaseId, rpc_id: RpcId) {
        let mut inner = self.inner.lock().expect("prepared ops mutex poisoned");
        if let Some(item) = inner.items.get_mut(&(lease_id, rpc_id)) {
            item.deleted = true;
        }
    }

    #[must_use]
    pub fn is_deleted(&self, lease_id: ClientLeaseId, rpc_id: RpcId) -> bool {
        let inner = self.inner.lock().expect("prepared ops mutex poisoned");
        inner
            .items
            .get(&(lease_id, rpc_id))
            .is_some_and(|item| item.deleted)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("prepared ops mutex poisoned").items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pops every watchdog entry whose deadline has passed and that still
    /// matches a live table entry, removing each from the table as it is
    /// claimed. This is the single point where a watchdog firing and a
    /// concurrent `pop_op` are reconciled: whichever call removes the map
    /// entry first wins, and the loser sees it already gone.
    pub fn drain_expired_watchdogs(&self) -> Vec<(OpKey, LogRef)> {
        let now = self.clock.now_micros();
        let mut inner = self.inner.lock().expect("prepared ops mutex poisoned");
        let due = inner.watchdogs.drain_due(now);

        let mut fired = Vec::new();
        for (key, token) in due {
            let still_current = inner
                .items
                .get(&key)
                .is_some_and(|item| item.watchdog_token == token);
            if still_current {
                if let Some(item) = inner.items.remove(&key) {
                    fired.push((key, item.log_ref));
                }
            }
        }
        fired
    }

    /// Microseconds until the earliest armed watchdog fires.
    #[must_use]
    pub fn micros_until_next_watchdog(&self) -> u64 {
        let now = self.clock.now_micros();
        self.inner
            .lock()
            .expect("prepared ops mutex poisoned")
            .watchdogs
            .micros_until_next(now)
    }

    /// Scans the table and re-asserts object locks on `object_manager`,
    /// reading each entry's record from `log_store` to recover its
    /// `(tableId, keyHash)`. Used after master restart replays prepared-op
    /// records.
    pub fn regrab_locks_after_recovery(
        &self,
        log_store: &dyn LogStore,
        object_manager: &dyn ObjectManager,
    ) {
        let refs: Vec<LogRef> = {
            let inner = self.inner.lock().expect("prepared ops mutex poisoned");
            inner
                .items
                .values()
                .filter(|item| !item.deleted && !item.log_ref.is_null())
                .map(|item| item.log_ref)
                .collect()
        };

        for log_ref in refs {
            let Ok(bytes) = log_store.read(log_ref) else {
                tracing::warn!(?log_ref, "failed to read prepared-op record during recovery");
                continue;
            };
            let Ok(record) = PreparedOpRecord::from_bytes(&bytes) else {
                tracing::warn!(?log_ref, "prepared-op record failed integrity check during recovery");
                continue;
            };
            for participant in &record.participants {
                object_manager.lock(participant.table_id, participant.key_hash);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_manager::ObjectManager;
    use std::sync::Mutex as StdMutex;
    use wardcore_clock::FakeClock;
    use wardcore_txlog::testing::MemoryLogStore;
    use wardcore_txlog::{PreparedOpRecord, TxParticipant};
    use wardcore_types::{KeyHash, OpType, TableId};

    const TX_TIMEOUT_MICROS: u64 = 500;

    fn key(lease: u64, rpc: u64) -> OpKey {
        (ClientLeaseId::new(lease), RpcId::new(rpc))
    }

    #[test]
    fn buffer_then_pop_round_trips() {
        let table = PreparedOps::new(FakeClock::new(), TX_TIMEOUT_MICROS);
        table
            .buffer_op(ClientLeaseId::new(7), RpcId::new(11), LogRef::new(0xCAFE), false)
            .unwrap();

        assert_eq!(table.peek_op(ClientLeaseId::new(7), RpcId::new(11)), LogRef::new(0xCAFE));
        assert_eq!(table.pop_op(ClientLeaseId::new(7), RpcId::new(11)), LogRef::new(0xCAFE));
        assert_eq!(table.peek_op(ClientLeaseId::new(7), RpcId::new(11)), LogRef::NULL);
    }

    #[test]
    fn duplicate_buffer_is_rejected_outside_recovery() {
        let table = PreparedOps::new(FakeClock::new(), TX_TIMEOUT_MICROS);
        table
            .buffer_op(ClientLeaseId::new(7), RpcId::new(11), LogRef::new(1), false)
            .unwrap();

        let err = table
            .buffer_op(ClientLeaseId::new(7), RpcId::new(11), LogRef::new(2), false)
            .unwrap_err();
        assert_eq!(
            err,
            TxTableError::Duplicate {
                lease_id: ClientLeaseId::new(7),
                rpc_id: RpcId::new(11)
            }
        );
    }

    #[test]
    fn duplicate_buffer_during_recovery_replaces_entry() {
        let table = PreparedOps::new(FakeClock::new(), TX_TIMEOUT_MICROS);
        table
            .buffer_op(ClientLeaseId::new(7), RpcId::new(11), LogRef::new(1), false)
            .unwrap();
        table
            .buffer_op(ClientLeaseId::new(7), RpcId::new(11), LogRef::new(2), true)
            .unwrap();

        assert_eq!(table.peek_op(ClientLeaseId::new(7), RpcId::new(11)), LogRef::new(2));
    }

    #[test]
    fn update_ptr_replaces_log_ref_without_disturbing_watchdog() {
        let clock = FakeClock::new();
        let table = PreparedOps::new(clock.clone(), TX_TIMEOUT_MICROS);
        table
            .buffer_op(ClientLeaseId::new(7), RpcId::new(11), LogRef::new(1), false)
            .unwrap();

        assert!(table.update_ptr(ClientLeaseId::new(7), RpcId::new(11), LogRef::new(2)));
        assert_eq!(table.peek_op(ClientLeaseId::new(7), RpcId::new(11)), LogRef::new(2));

        clock.advance(TX_TIMEOUT_MICROS + 1);
        let fired = table.drain_expired_watchdogs();
        assert_eq!(fired, vec![(key(7, 11), LogRef::new(2))]);
    }

    #[test]
    fn update_ptr_on_missing_entry_returns_false() {
        let table = PreparedOps::new(FakeClock::new(), TX_TIMEOUT_MICROS);
        assert!(!table.update_ptr(ClientLeaseId::new(1), RpcId::new(1), LogRef::new(9)));
    }

    #[test]
    fn mark_deleted_is_monotonic_and_visible() {
        let table = PreparedOps::new(FakeClock::new(), TX_TIMEOUT_MICROS);
        table
            .buffer_op(ClientLeaseId::new(7), RpcId::new(11), LogRef::new(1), false)
            .unwrap();
        assert!(!table.is_deleted(ClientLeaseId::new(7), RpcId::new(11)));
        table.mark_deleted(ClientLeaseId::new(7), RpcId::new(11));
        assert!(table.is_deleted(ClientLeaseId::new(7), RpcId::new(11)));
    }

    #[test]
    fn watchdog_fires_exactly_once_for_unresolved_entry() {
        let clock = FakeClock::new();
        let table = PreparedOps::new(clock.clone(), TX_TIMEOUT_MICROS);
        table
            .buffer_op(ClientLeaseId::new(7), RpcId::new(11), LogRef::new(0xCAFE), false)
            .unwrap();

        assert!(table.drain_expired_watchdogs().is_empty());

        clock.advance(TX_TIMEOUT_MICROS + 1);
        let fired = table.drain_expired_watchdogs();
        assert_eq!(fired, vec![(key(7, 11), LogRef::new(0xCAFE))]);

        // Table entry was claimed by the watchdog; a second drain is a no-op
        // and the entry is gone from the table.
        assert!(table.drain_expired_watchdogs().is_empty());
        assert_eq!(table.peek_op(ClientLeaseId::new(7), RpcId::new(11)), LogRef::NULL);
    }

    #[test]
    fn pop_before_watchdog_fires_suppresses_the_watchdog() {
        let clock = FakeClock::new();
        let table = PreparedOps::new(clock.clone(), TX_TIMEOUT_MICROS);
        table
            .buffer_op(ClientLeaseId::new(7), RpcId::new(11), LogRef::new(0xCAFE), false)
            .unwrap();

        assert_eq!(table.pop_op(ClientLeaseId::new(7), RpcId::new(11)), LogRef::new(0xCAFE));

        clock.advance(TX_TIMEOUT_MICROS + 1);
        // The stale heap entry still drains, but the token no longer
        // matches any table entry, so nothing fires.
        assert!(table.drain_expired_watchdogs().is_empty());
    }

    struct RecordingObjectManager {
        locked: StdMutex<Vec<(TableId, KeyHash)>>,
    }

    impl RecordingObjectManager {
        fn new() -> Self {
            Self {
                locked: StdMutex::new(Vec::new()),
            }
        }
    }

    impl ObjectManager for RecordingObjectManager {
        fn lock(&self, table_id: TableId, key_hash: KeyHash) {
            self.locked.lock().unwrap().push((table_id, key_hash));
        }

        fn unlock(&self, _table_id: TableId, _key_hash: KeyHash) {}
    }

    #[test]
    fn regrab_locks_after_recovery_relocks_every_participant() {
        let log_store = MemoryLogStore::new();
        let record = PreparedOpRecord::new(
            OpType::Write,
            ClientLeaseId::new(7),
            RpcId::new(11),
            vec![TxParticipant {
                table_id: TableId::new(1),
                key_hash: KeyHash::new(42),
                rpc_id: RpcId::new(11),
            }],
            bytes::Bytes::from_static(b"k=v"),
        );
        let mut buf = bytes::BytesMut::new();
        record.assemble_for_log(&mut buf);
        let log_ref = log_store.append(&buf).unwrap();

        let table = PreparedOps::new(FakeClock::new(), TX_TIMEOUT_MICROS);
        table
            .buffer_op(ClientLeaseId::new(7), RpcId::new(11), log_ref, false)
            .unwrap();

        let object_manager = RecordingObjectManager::new();
        table.regrab_locks_after_recovery(&log_store, &object_manager);

        assert_eq!(
            *object_manager.locked.lock().unwrap(),
            vec![(TableId::new(1), KeyHash::new(42))]
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use wardcore_clock::FakeClock;

    #[derive(Debug, Clone)]
    enum Op {
        Buffer { lease: u64, rpc: u64, log_ref: u64 },
        Pop { lease: u64, rpc: u64 },
        UpdatePtr { lease: u64, rpc: u64, new_ref: u64 },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u64..4, 0u64..4, 0u64..1000)
                .prop_map(|(lease, rpc, log_ref)| Op::Buffer { lease, rpc, log_ref }),
            (0u64..4, 0u64..4).prop_map(|(lease, rpc)| Op::Pop { lease, rpc }),
            (0u64..4, 0u64..4, 0u64..1000)
                .prop_map(|(lease, rpc, new_ref)| Op::UpdatePtr { lease, rpc, new_ref }),
        ]
    }

    proptest! {
        /// After any interleaving of `buffer_op`/`pop_op`/`update_ptr`, the
        /// table never reports more than one live entry per `(leaseId,
        /// rpcId)` key — `len()` always matches a plain re-derivation of
        /// "currently buffered keys" from the same operation sequence.
        #[test]
        fn no_duplicate_keys_under_any_interleaving(ops in proptest::collection::vec(op_strategy(), 1..50)) {
            let table = PreparedOps::new(FakeClock::new(), 500);
            let mut model: std::collections::HashSet<(u64, u64)> = std::collections::HashSet::new();

            for op in ops {
                match op {
                    Op::Buffer { lease, rpc, log_ref } => {
                        let key = (lease, rpc);
                        let result = table.buffer_op(
                            ClientLeaseId::new(lease),
                            RpcId::new(rpc),
                            LogRef::new(log_ref),
                            false,
                        );
                        if result.is_ok() {
                            model.insert(key);
                        } else {
                            prop_assert!(model.contains(&key));
                        }
                    }
                    Op::Pop { lease, rpc } => {
                        let key = (lease, rpc);
                        let log_ref = table.pop_op(ClientLeaseId::new(lease), RpcId::new(rpc));
                        if model.remove(&key) {
                            prop_assert!(!log_ref.is_null());
                        } else {
                            prop_assert!(log_ref.is_null());
                        }
                    }
                    Op::UpdatePtr { lease, rpc, new_ref } => {
                        let key = (lease, rpc);
                        let updated = table.update_ptr(
                            ClientLeaseId::new(lease),
                            RpcId::new(rpc),
                            LogRef::new(new_ref),
                        );
                        prop_assert_eq!(updated, model.contains(&key));
                    }
                }
            }

            prop_assert_eq!(table.len(), model.len());
        }
    }
}
