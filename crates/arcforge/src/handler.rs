//! Per-connection dispatcher (§4.G): read a frame, decode it, resolve
//! the caller's identity, run it through the engine under the global
//! lock, then flush whatever the engine queued once the lock is
//! released.
//!
//! Each accepted connection gets its own Tokio task running this loop.
//! Nothing here ever touches `EntityStore` directly — that's the
//! engine's job — and nothing in the engine ever touches a socket —
//! that's this module's job. The split exists so a slow or failing
//! send can never hold the global critical section open.

use std::sync::Arc;

use arcforge_protocol::{Codec, Envelope, PlayerId};
use arcforge_session::parse_authorization_header;
use arcforge_transport::{Connection, ConnectionId, WebSocketConnection};
use chrono::Utc;

use crate::engine::RequestContext;
use crate::queue::{Outbound, TaskQueue};
use crate::server::ServerState;

/// Handles one connection from accept to close.
pub(crate) async fn handle_connection(conn: WebSocketConnection, state: Arc<ServerState>) {
    let conn_id = conn.id();
    state.registry.insert(conn.clone());

    // A connection that already carries a bearer token (a reconnect) is
    // authenticated for its whole lifetime; one with none must spend its
    // first request on `RegisterPlayer`, after which this same binding is
    // updated so later frames on this socket don't need to repeat it.
    let mut player_id: Option<PlayerId> = parse_authorization_header(conn.auth_header());
    tracing::debug!(%conn_id, authenticated = player_id.is_some(), "connection accepted");

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv failed");
                break;
            }
        };

        let envelope = match state.codec.decode_request(&data) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "dropping malformed frame");
                send_one(
                    &state,
                    conn_id,
                    Envelope::RequestFailed {
                        reason: arcforge_protocol::FailureReason::InvalidRequest,
                        comment: Some(e.to_string()),
                    },
                )
                .await;
                continue;
            }
        };

        tracing::debug!(%conn_id, kind = envelope.kind(), "dispatching request");

        let (sends, disconnects) = {
            let mut store = state.store.lock().await;
            let mut queue = TaskQueue::new();
            let mut ctx = RequestContext::new(&mut store, &mut queue, Utc::now());
            state
                .engine
                .dispatch(&mut ctx, conn_id, player_id.as_ref(), envelope);
            queue.drain()
        };

        if let Some(newly_registered) = sends.iter().find_map(|o| match &o.envelope {
            Envelope::PlayerRegistered { player_id } if o.connection == conn_id => {
                Some(player_id.clone())
            }
            _ => None,
        }) {
            player_id = Some(newly_registered);
        }

        deliver(&state, sends, disconnects).await;
    }

    {
        let mut store = state.store.lock().await;
        let mut queue = TaskQueue::new();
        let mut ctx = RequestContext::new(&mut store, &mut queue, Utc::now());
        state.engine.disconnect_player(&mut ctx, conn_id).ok();
        let (sends, disconnects) = queue.drain();
        deliver(&state, sends, disconnects).await;
    }

    state.registry.remove(conn_id);
}

/// Delivers every queued send and closes every queued disconnect,
/// tolerant of a transport that has already gone away by the time the
/// lock was released (§4.B). Shared by the per-connection loop above
/// and by the server's sweep/shutdown paths, which drain a queue
/// outside of any connection task.
pub(crate) async fn deliver(state: &Arc<ServerState>, sends: Vec<Outbound>, disconnects: Vec<ConnectionId>) {
    for outbound in sends {
        send_one(state, outbound.connection, outbound.envelope).await;
    }
    for connection in disconnects {
        if let Some(conn) = state.registry.get(connection) {
            if let Err(e) = conn.close().await {
                tracing::debug!(%connection, error = %e, "close failed (already gone)");
            }
        }
    }
}

async fn send_one(state: &Arc<ServerState>, connection: ConnectionId, envelope: Envelope) {
    let Some(conn) = state.registry.get(connection) else {
        tracing::debug!(%connection, "dropping send to vanished connection");
        return;
    };
    let bytes = match state.codec.encode(&envelope) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(%connection, error = %e, "failed to encode outbound envelope");
            return;
        }
    };
    if let Err(e) = conn.send(&bytes).await {
        tracing::debug!(%connection, error = %e, "send failed (connection likely closed)");
    }
}
