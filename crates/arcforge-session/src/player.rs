//! The `Player` record — the server's bookkeeping for one registered
//! identity (§3).

use std::fmt;

use arcforge_protocol::{
    ActivityState, ConnectionState, GameId, Handle, ParticipationState, PlayerId,
    RegisteredPlayerView,
};
use arcforge_transport::ConnectionId;
use chrono::{DateTime, Utc};

/// A single registered player.
///
/// Created on `RegisterPlayer`, destroyed on `UnregisterPlayer` or by
/// inactivity eviction (the idle-player sweep). Lives inside the Entity
/// Store, guarded by the global critical section — nothing here is
/// shared across tasks on its own.
#[derive(Clone)]
pub struct Player {
    /// Opaque bearer credential. Immutable. Never logged.
    pub player_id: PlayerId,
    /// Client-chosen display name. Immutable after registration.
    pub handle: Handle,
    /// The connection currently bound to this player, if any.
    pub transport_ref: Option<ConnectionId>,
    pub registration_time: DateTime<Utc>,
    pub last_active_time: DateTime<Utc>,
    pub activity: ActivityState,
    pub connection: ConnectionState,
    pub participation: ParticipationState,
    pub current_game_id: Option<GameId>,
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("handle", &self.handle)
            .field("transport_ref", &self.transport_ref)
            .field("registration_time", &self.registration_time)
            .field("last_active_time", &self.last_active_time)
            .field("activity", &self.activity)
            .field("connection", &self.connection)
            .field("participation", &self.participation)
            .field("current_game_id", &self.current_game_id)
            .finish()
    }
}

impl Player {
    /// Creates a freshly registered player bound to `transport`.
    pub fn register(handle: Handle, transport: ConnectionId, now: DateTime<Utc>) -> Self {
        Self {
            player_id: PlayerId::new(),
            handle,
            transport_ref: Some(transport),
            registration_time: now,
            last_active_time: now,
            activity: ActivityState::Active,
            connection: ConnectionState::Connected,
            participation: ParticipationState::Waiting,
            current_game_id: None,
        }
    }

    /// Marks the player as just having made a successful request — the
    /// "active-marking" policy applied to every request handler (§4.E).
    pub fn mark_active(&mut self, now: DateTime<Utc>) {
        self.last_active_time = now;
        self.activity = ActivityState::Active;
    }

    /// Rebinds this player's transport (REREGISTER, idempotent rebind —
    /// §9 open questions: no implicit close of the prior transport).
    pub fn rebind(&mut self, transport: ConnectionId, now: DateTime<Utc>) {
        self.transport_ref = Some(transport);
        self.connection = ConnectionState::Connected;
        self.mark_active(now);
    }

    /// Clears the game the player was participating in and resets
    /// participation to `Waiting` for its next lifecycle (quit/disconnect
    /// sub-transitions, §4.E).
    pub fn leave_game(&mut self) {
        self.current_game_id = None;
        self.participation = ParticipationState::Waiting;
    }

    /// Builds the public, player-id-free snapshot sent in `RegisteredPlayers`.
    pub fn to_view(&self) -> RegisteredPlayerView {
        RegisteredPlayerView {
            handle: self.handle.clone(),
            connection: self.connection,
            activity: self.activity,
            registration_time: self.registration_time,
            last_active_time: self.last_active_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn registers_waiting_and_active() {
        let p = Player::register("leela".into(), ConnectionId::new(1), now());
        assert_eq!(p.participation, ParticipationState::Waiting);
        assert_eq!(p.activity, ActivityState::Active);
        assert_eq!(p.connection, ConnectionState::Connected);
        assert_eq!(p.transport_ref, Some(ConnectionId::new(1)));
    }

    #[test]
    fn leave_game_resets_to_waiting() {
        let mut p = Player::register("leela".into(), ConnectionId::new(1), now());
        p.current_game_id = Some(GameId::from("g1".to_string()));
        p.participation = ParticipationState::Playing;
        p.leave_game();
        assert!(p.current_game_id.is_none());
        assert_eq!(p.participation, ParticipationState::Waiting);
    }

    #[test]
    fn view_omits_player_id() {
        let p = Player::register("leela".into(), ConnectionId::new(1), now());
        let view = p.to_view();
        assert_eq!(view.handle, "leela");
    }

    #[test]
    fn debug_omits_player_id() {
        let p = Player::register("leela".into(), ConnectionId::new(1), now());
        let debug = format!("{:?}", p);
        assert!(!debug.contains(&p.player_id.to_string()));
        assert!(debug.contains("leela"));
    }
}
