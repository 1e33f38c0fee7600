//! The Entity Store (§4.C) — the sole owner of every `Player` and `Game`
//! record, keyed both by id and by handle.
//!
//! Every method here assumes the caller already holds the global
//! critical section (§5); the store has no locking of its own.

use std::collections::HashMap;

use arcforge_protocol::{GameId, Handle, PlayerId};
use arcforge_room::Game;
use arcforge_session::Player;
use arcforge_transport::ConnectionId;
use chrono::{DateTime, Utc};

/// Owns all live `Player` and `Game` records.
#[derive(Debug, Default)]
pub struct EntityStore {
    players: HashMap<PlayerId, Player>,
    handles: HashMap<Handle, PlayerId>,
    games: HashMap<GameId, Game>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Players ---------------------------------------------------------

    /// Registers a new player bound to `transport`. Fails if `handle` is
    /// already in use by a live player.
    pub fn create_player(
        &mut self,
        handle: Handle,
        transport: ConnectionId,
        now: DateTime<Utc>,
    ) -> Result<PlayerId, Handle> {
        if self.handles.contains_key(&handle) {
            return Err(handle);
        }
        let player = Player::register(handle.clone(), transport, now);
        let player_id = player.player_id.clone();
        self.handles.insert(handle, player_id.clone());
        self.players.insert(player_id.clone(), player);
        Ok(player_id)
    }

    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn player_mut(&mut self, player_id: &PlayerId) -> Option<&mut Player> {
        self.players.get_mut(player_id)
    }

    pub fn player_id_by_handle(&self, handle: &str) -> Option<&PlayerId> {
        self.handles.get(handle)
    }

    pub fn player_by_handle(&self, handle: &str) -> Option<&Player> {
        let id = self.handles.get(handle)?;
        self.players.get(id)
    }

    /// Looks up the player currently bound to `transport`. A linear scan
    /// over the player set — acceptable per §4.B, since this only runs on
    /// disconnect and the set is small.
    pub fn player_by_transport(&self, transport: ConnectionId) -> Option<&Player> {
        self.players
            .values()
            .find(|p| p.transport_ref == Some(transport))
    }

    /// Removes and returns a player record, clearing its handle mapping.
    pub fn remove_player(&mut self, player_id: &PlayerId) -> Option<Player> {
        let player = self.players.remove(player_id)?;
        self.handles.remove(&player.handle);
        Some(player)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn registered_player_count(&self) -> usize {
        self.players.len()
    }

    // --- Games -------------------------------------------------------------

    pub fn insert_game(&mut self, game: Game) -> GameId {
        let id = game.game_id.clone();
        self.games.insert(id.clone(), game);
        id
    }

    pub fn game(&self, game_id: &GameId) -> Option<&Game> {
        self.games.get(game_id)
    }

    pub fn game_mut(&mut self, game_id: &GameId) -> Option<&mut Game> {
        self.games.get_mut(game_id)
    }

    pub fn remove_game(&mut self, game_id: &GameId) -> Option<Game> {
        self.games.remove(game_id)
    }

    pub fn games(&self) -> impl Iterator<Item = &Game> {
        self.games.values()
    }

    pub fn game_ids(&self) -> Vec<GameId> {
        self.games.keys().cloned().collect()
    }

    pub fn total_game_count(&self) -> usize {
        self.games.len()
    }

    /// Games currently `Advertised` or `Playing` — the population the
    /// `in_progress_game_limit` is checked against (testable property 5).
    pub fn in_progress_game_count(&self) -> usize {
        self.games
            .values()
            .filter(|g| {
                matches!(
                    g.state,
                    arcforge_protocol::GameState::Advertised | arcforge_protocol::GameState::Playing
                )
            })
            .count()
    }
}
