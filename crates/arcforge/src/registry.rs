//! The Connection Registry (§4.B) — the only place the server holds a
//! live handle to an open socket.
//!
//! `Player.transport_ref` inside the locked [`EntityStore`](crate::entity::EntityStore)
//! is just a [`ConnectionId`] — a lookup key, not something you can call
//! `.send()` on. The registry is the other half: a map from that key to
//! an actual [`WebSocketConnection`], maintained outside the lock by
//! each connection's own task (insert on accept, remove on close) and
//! read only while flushing a drained [`TaskQueue`](crate::queue::TaskQueue).
//! It tolerates looking up a connection that has already closed —
//! the flush simply drops that send rather than treating it as an error.

use std::sync::Arc;

use arcforge_transport::{Connection, ConnectionId, WebSocketConnection};
use dashmap::DashMap;

/// Maps live connections to their transport handles.
///
/// Cheap to clone and share across tasks: internally an `Arc<DashMap<..>>`,
/// sharded for concurrent insert/remove without a single global lock —
/// this is deliberately a *different* lock from the one guarding
/// `EntityStore`, since registry churn (accept/close) shouldn't contend
/// with request processing.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<DashMap<ConnectionId, WebSocketConnection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, conn: WebSocketConnection) {
        self.connections.insert(conn.id(), conn);
    }

    pub fn remove(&self, id: ConnectionId) {
        self.connections.remove(&id);
    }

    pub fn get(&self, id: ConnectionId) -> Option<WebSocketConnection> {
        self.connections.get(&id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
