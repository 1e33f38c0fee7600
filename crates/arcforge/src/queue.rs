//! The Task Queue (§4.F) — per-transition accumulator of outbound
//! messages and disconnect intents, flushed after the global critical
//! section is released.
//!
//! The engine never touches the network; it only ever calls
//! [`TaskQueue::send`] and [`TaskQueue::disconnect`]. This keeps logic
//! failures (a precondition violation) and I/O failures (a send erroring
//! out) in entirely separate layers.

use std::collections::HashSet;

use arcforge_protocol::Envelope;
use arcforge_transport::ConnectionId;

/// One pending send: an envelope addressed to a specific live transport.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub connection: ConnectionId,
    pub envelope: Envelope,
}

/// Accumulates the effects of one transition (a request, a sub-transition
/// cascade, or a sweep) until the critical section releases the lock.
#[derive(Debug, Default)]
pub struct TaskQueue {
    sends: Vec<Outbound>,
    disconnects: HashSet<ConnectionId>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues `envelope` for delivery to `connection`.
    pub fn send(&mut self, connection: ConnectionId, envelope: Envelope) {
        self.sends.push(Outbound {
            connection,
            envelope,
        });
    }

    /// Marks `connection` for closure once this queue is flushed.
    pub fn disconnect(&mut self, connection: ConnectionId) {
        self.disconnects.insert(connection);
    }

    pub fn is_empty(&self) -> bool {
        self.sends.is_empty() && self.disconnects.is_empty()
    }

    /// Drains the queue, applying the discipline from §5 "Task queue
    /// discipline": disconnect intents are applied before sends, so any
    /// send addressed to a transport also marked for disconnect is
    /// suppressed; remaining sends are deduplicated per (transport,
    /// envelope) pair.
    pub fn drain(&mut self) -> (Vec<Outbound>, Vec<ConnectionId>) {
        let disconnects: Vec<ConnectionId> = self.disconnects.drain().collect();
        let mut deduped: Vec<Outbound> = Vec::new();
        for outbound in self.sends.drain(..) {
            if disconnects.contains(&outbound.connection) {
                continue;
            }
            let already_queued = deduped.iter().any(|o| {
                o.connection == outbound.connection && o.envelope == outbound.envelope
            });
            if !already_queued {
                deduped.push(outbound);
            }
        }
        (deduped, disconnects)
    }
}
