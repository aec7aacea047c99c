//! Watchdog timer bookkeeping for prepared ops.
//!
//! The original placed a timer object inside each table entry. Embedding an
//! OS-level timer inside a `HashMap` value is awkward in Rust (the timer
//! would need a handle back to its own map slot), so this instead keeps a
//! single min-heap of deadlines shared by every entry. Each entry records
//! the `token` it was armed with; `updatePtr` leaves the token untouched, so
//! the timer survives it for free. A watchdog firing and a concurrent
//! `popOp` are resolved by whichever one removes the table entry first: the
//! loser observes it already gone.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use wardcore_types::OpKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WatchdogEntry {
    deadline_micros: u64,
    token: u64,
    key: OpKey,
}

// `BinaryHeap` is a max-heap; reverse the ordering on `deadline_micros` so
// the earliest deadline sorts to the top.
impl Ord for WatchdogEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline_micros
            .cmp(&self.deadline_micros)
            .then_with(|| other.token.cmp(&self.token))
    }
}

impl PartialOrd for WatchdogEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A min-heap of armed watchdog deadlines, keyed by `(leaseId, rpcId)`.
#[derive(Debug, Default)]
pub struct WatchdogQueue {
    heap: BinaryHeap<WatchdogEntry>,
    next_token: u64,
}

impl WatchdogQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a new deadline for `key` and returns the token the caller should
    /// store alongside its table entry to validate later firings.
    pub fn arm(&mut self, key: OpKey, now_micros: u64, delay_micros: u64) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        self.heap.push(WatchdogEntry {
            deadline_micros: now_micros.saturating_add(delay_micros),
            token,
            key,
        });
        token
    }

    /// Pops every entry whose deadline has passed. Callers must check the
    /// returned token against their own bookkeeping before acting: an entry
    /// popped here may belong to a prepared op that has since been popped or
    /// re-armed.
    pub fn drain_due(&mut self, now_micros: u64) -> Vec<(OpKey, u64)> {
        let mut due = Vec::new();
        while let Some(entry) = self.heap.peek() {
            if entry.deadline_micros > now_micros {
                break;
            }
            let entry = self.heap.pop().expect("peeked entry must pop");
            due.push((entry.key, entry.token));
        }
        due
    }

    /// Microseconds until the earliest armed deadline, saturating to zero;
    /// `u64::MAX` when nothing is armed.
    #[must_use]
    pub fn micros_until_next(&self, now_micros: u64) -> u64 {
        self.heap.peek().map_or(u64::MAX, |entry| {
            entry.deadline_micros.saturating_sub(now_micros)
        })
    }
}
