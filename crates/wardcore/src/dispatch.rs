//! The worker→dispatch hop.
//!
//! `FailureDetector` state is exclusive to one thread. Worker threads that
//! need to affect it do so through a `DispatchHandle` instead of a shared
//! lock: a fire-and-forget `DispatchCommand` is pushed onto a bounded
//! `crossbeam_queue::ArrayQueue` that the dispatch thread drains at the top
//! of its loop, while a synchronous `DispatchQuery` rendezvous-blocks the
//! caller for a reply. Both mirror distinct hop strategies used elsewhere for
//! operations like `cancelRequest`/`sendRequest` (fire-and-forget) versus
//! `abort`/`getRpcInfo` (blocking).

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;

use crossbeam_queue::ArrayQueue;

use crate::error::WardcoreError;

/// A fire-and-forget instruction for the dispatch thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchCommand {
    /// Ask the `FailureDetector` to fetch a fresh server list on its next
    /// loop iteration.
    RefreshServerList { server_type_filter: u32 },
    /// Ask the `FailureDetector` to probe a specific locator out of cadence.
    ForceProbe { locator: String },
}

/// A synchronous question for the dispatch thread, answered inline before
/// the caller resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchQuery {
    /// How many probes are currently outstanding in the timeout queue.
    QueueDepth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchReply {
    QueueDepth(usize),
}

type QueryEnvelope = (DispatchQuery, SyncSender<DispatchReply>);

/// The worker-facing half of the channel. Cheaply cloneable; every clone
/// shares the same underlying queue and rendezvous channel.
#[derive(Clone)]
pub struct DispatchHandle {
    commands: Arc<ArrayQueue<DispatchCommand>>,
    queries: SyncSender<QueryEnvelope>,
}

impl DispatchHandle {
    /// Enqueues `command` without blocking. Fails if the bounded queue is
    /// full — the dispatch thread is falling behind and callers should not
    /// pile on more fire-and-forget work.
    pub fn send_command(&self, command: DispatchCommand) -> Result<(), WardcoreError> {
        self.commands
            .push(command)
            .map_err(|_| WardcoreError::DispatchQueueFull)
    }

    /// Blocks until the dispatch thread answers `query`. Returns an error if
    /// the dispatch thread has shut down.
    pub fn query(&self, query: DispatchQuery) -> Result<DispatchReply, WardcoreError> {
        let (reply_tx, reply_rx) = mpsc::sync_channel(0);
        self.queries
            .send((query, reply_tx))
            .map_err(|_| WardcoreError::DispatchUnreachable)?;
        reply_rx.recv().map_err(|_| WardcoreError::DispatchUnreachable)
    }
}

/// The dispatch-thread-facing half of the channel, polled at the top of the
/// main loop.
pub struct DispatchReceiver {
    commands: Arc<ArrayQueue<DispatchCommand>>,
    queries: Receiver<QueryEnvelope>,
}

impl DispatchReceiver {
    /// Drains every queued fire-and-forget command without blocking.
    pub fn drain_commands(&self) -> Vec<DispatchCommand> {
        let mut drained = Vec::new();
        while let Some(command) = self.commands.pop() {
            drained.push(command);
        }
        drained
    }

    /// Answers one pending synchronous query, if any is waiting.
    pub fn try_answer_one(&self, answer: impl FnOnce(DispatchQuery) -> DispatchReply) -> bool {
        match self.queries.try_recv() {
            Ok((query, reply_tx)) => {
                let _ = reply_tx.send(answer(query));
                true
            }
            Err(_) => false,
        }
    }
}

/// Creates a connected `(DispatchHandle, DispatchReceiver)` pair with a
/// bounded fire-and-forget command queue of `capacity`.
#[must_use]
pub fn dispatch_channel(capacity: usize) -> (DispatchHandle, DispatchReceiver) {
    let commands = Arc::new(ArrayQueue::new(capacity));
    let (queries_tx, queries_rx) = mpsc::sync_channel(capacity);
    (
        DispatchHandle {
            commands: Arc::clone(&commands),
            queries: queries_tx,
        },
        DispatchReceiver {
            commands,
            queries: queries_rx,
        },
    )
}
