//! `TimeoutQueue`: a FIFO of outstanding probes sharing one timeout.
//!
//! Entries are appended in non-decreasing `start_micros` order, so checking
//! whether the head has expired is enough to answer "any expired?" in O(1)
//! amortized — no need to scan or re-sort.

use std::collections::VecDeque;

/// One outstanding probe: when it was sent, to whom, and its correlating
/// nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutEntry {
    pub start_micros: u64,
    pub locator: String,
    pub nonce: u64,
}

/// A FIFO of `TimeoutEntry` values, all sharing `timeout_micros`.
#[derive(Debug)]
pub struct TimeoutQueue {
    entries: VecDeque<TimeoutEntry>,
    timeout_micros: u64,
}

impl TimeoutQueue {
    #[must_use]
    pub fn new(timeout_micros: u64) -> Self {
        Self {
            entries: VecDeque::new(),
            timeout_micros,
        }
    }

    /// Records `now` as the entry's start time and appends it to the tail.
    pub fn enqueue(&mut self, locator: String, nonce: u64, now_micros: u64) {
        self.entries.push_back(TimeoutEntry {
            start_micros: now_micros,
            locator,
            nonce,
        });
    }

    /// Pops the head iff it has expired by `now`. Entries are in
    /// non-decreasing `start_micros` order, so a non-expired head means
    /// nothing in the queue has expired.
    pub fn dequeue_expired(&mut self, now_micros: u64) -> Option<TimeoutEntry> {
        let expired = self
            .entries
            .front()
            .is_some_and(|entry| entry.start_micros + self.timeout_micros <= now_micros);
        if expired {
            self.entries.pop_front()
        } else {
            None
        }
    }

    /// Removes the first (oldest) entry matching `nonce`, if any duplicate
    /// nonces are outstanding. Returns `None` if the nonce is unknown or has
    /// already timed out and been drained.
    pub fn dequeue_by_nonce(&mut self, nonce: u64) -> Option<TimeoutEntry> {
        let index = self.entries.iter().position(|entry| entry.nonce == nonce)?;
        self.entries.remove(index)
    }

    /// Microseconds until the head entry expires, saturating to zero;
    /// `u64::MAX` when the queue is empty.
    #[must_use]
    pub fn micros_until_next_timeout(&self, now_micros: u64) -> u64 {
        self.entries.front().map_or(u64::MAX, |entry| {
            (entry.start_micros + self.timeout_micros).saturating_sub(now_micros)
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_preserved() {
        let mut queue = TimeoutQueue::new(100);
        queue.enqueue("a".into(), 1, 0);
        queue.enqueue("b".into(), 2, 10);

        assert_eq!(queue.dequeue_expired(100).unwrap().nonce, 1);
        assert_eq!(queue.dequeue_expired(110).unwrap().nonce, 2);
        assert!(queue.dequeue_expired(200).is_none());
    }

    #[test]
    fn not_expired_yields_none() {
        let mut queue = TimeoutQueue::new(100);
        queue.enqueue("a".into(), 1, 0);
        assert!(queue.dequeue_expired(50).is_none());
    }

    #[test]
    fn dequeue_by_nonce_removes_oldest_match() {
        let mut queue = TimeoutQueue::new(100);
        queue.enqueue("a".into(), 42, 0);
        queue.enqueue("b".into(), 42, 10);

        let removed = queue.dequeue_by_nonce(42).unwrap();
        assert_eq!(removed.locator, "a");
        assert_eq!(queue.len(), 1);

        // Second response with the same nonce finds nothing.
        assert!(queue.dequeue_by_nonce(42).is_none());
    }

    #[test]
    fn dequeue_by_nonce_unknown_returns_none() {
        let mut queue = TimeoutQueue::new(100);
        queue.enqueue("a".into(), 1, 0);
        assert!(queue.dequeue_by_nonce(999).is_none());
    }

    #[test]
    fn micros_until_next_timeout_saturates_and_signals_empty() {
        let mut queue = TimeoutQueue::new(100);
        assert_eq!(queue.micros_until_next_timeout(0), u64::MAX);

        queue.enqueue("a".into(), 1, 50);
        assert_eq!(queue.micros_until_next_timeout(60), 90);
        assert_eq!(queue.micros_until_next_timeout(200), 0);
    }

    #[test]
    fn every_entry_removed_exactly_once() {
        let mut queue = TimeoutQueue::new(100);
        for i in 0..10 {
            queue.enqueue(format!("peer-{i}"), i, i * 5);
        }

        // Dequeue half by nonce, drain the rest by expiry.
        for i in 0..5 {
            assert!(queue.dequeue_by_nonce(i).is_some());
        }
        let mut drained = 0;
        while queue.dequeue_expired(10_000).is_some() {
            drained += 1;
        }
        assert_eq!(drained, 5);
        assert!(queue.is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    proptest! {
        /// For any interleaving of `enqueue`, `dequeue_by_nonce`, and
        /// `dequeue_expired`, every enqueued entry is removed exactly once —
        /// either by nonce match or by expiry, never both, never neither.
        #[test]
        fn every_enqueued_entry_removed_exactly_once(
            nonces in proptest::collection::vec(0u64..8, 1..20),
            nonce_probe_order in proptest::collection::vec(0u64..8, 0..20),
        ) {
            let mut queue = TimeoutQueue::new(100);
            for (i, &nonce) in nonces.iter().enumerate() {
                queue.enqueue(format!("peer-{i}"), nonce, (i as u64) * 10);
            }
            let total = nonces.len();

            let mut removed_once: HashSet<usize> = HashSet::new();
            let mut removed_count = 0usize;

            for nonce in nonce_probe_order {
                if queue.dequeue_by_nonce(nonce).is_some() {
                    removed_count += 1;
                }
            }

            while let Some(entry) = queue.dequeue_expired(u64::MAX) {
                removed_count += 1;
                // Expired dequeues come out in FIFO order; nothing left
                // should ever repeat a start time we've already counted
                // past `total` distinct entries.
                let _ = removed_once.insert(entry.start_micros as usize);
            }

            prop_assert_eq!(removed_count, total);
            prop_assert!(queue.is_empty());
        }

        #[test]
        fn micros_until_next_timeout_is_zero_iff_something_expired(
            start in 0u64..1000,
            now in 0u64..2000,
        ) {
            let mut queue = TimeoutQueue::new(100);
            queue.enqueue("a".into(), 1, start);

            let remaining = queue.micros_until_next_timeout(now);
            let expired = start + 100 <= now;
            prop_assert_eq!(remaining == 0, expired);
        }
    }
}
