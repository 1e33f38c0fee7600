//! The `Game` record — the server's bookkeeping for one advertised or
//! in-progress game (§3).

use std::fmt;

use arcforge_protocol::{
    ActivityState, AdvertisedGameView, CancelledReason, GameId, GamePlayerView, GameState, Handle,
    ParticipationState, PlayerColor, PlayerType, Visibility,
};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;

use crate::adapter::GameRuleAdapter;

/// A single advertised, playing, completed, or cancelled game.
///
/// Created on `AdvertiseGame`, destroyed by the obsolete-game sweep once
/// past `game_retention_thresh` in a terminal state. Lives inside the
/// Entity Store, guarded by the global critical section.
pub struct Game {
    pub game_id: GameId,
    pub advertiser_handle: Handle,
    pub name: String,
    pub mode: String,
    pub target_player_count: u8,
    pub visibility: Visibility,
    pub invited_handles: Vec<Handle>,
    pub advertised_time: DateTime<Utc>,
    pub last_active_time: DateTime<Utc>,
    pub started_time: Option<DateTime<Utc>>,
    pub completed_time: Option<DateTime<Utc>>,
    pub state: GameState,
    pub activity: ActivityState,
    pub cancelled_reason: Option<CancelledReason>,
    pub completed_comment: Option<String>,
    pub game_players: Vec<GamePlayerView>,
    /// The rule engine for this game. `None` until `StartGame` runs.
    pub adapter: Option<Box<dyn GameRuleAdapter>>,
}

impl fmt::Debug for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("game_id", &self.game_id)
            .field("advertiser_handle", &self.advertiser_handle)
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("target_player_count", &self.target_player_count)
            .field("visibility", &self.visibility)
            .field("state", &self.state)
            .field("game_players", &self.game_players)
            .field("adapter", &self.adapter.is_some())
            .finish()
    }
}

impl Game {
    /// Creates a freshly advertised game. The advertiser is seated as the
    /// first game-player, `Joined`, with the deterministic first color.
    pub fn advertise(
        advertiser_handle: Handle,
        name: String,
        mode: String,
        target_player_count: u8,
        visibility: Visibility,
        invited_handles: Vec<Handle>,
        now: DateTime<Utc>,
    ) -> Self {
        let advertiser_view = GamePlayerView {
            handle: advertiser_handle.clone(),
            color: PlayerColor::ORDER[0],
            kind: PlayerType::Human,
            state: ParticipationState::Joined,
        };
        Self {
            game_id: GameId::new(),
            advertiser_handle,
            name,
            mode,
            target_player_count,
            visibility,
            invited_handles,
            advertised_time: now,
            last_active_time: now,
            started_time: None,
            completed_time: None,
            state: GameState::Advertised,
            activity: ActivityState::Active,
            cancelled_reason: None,
            completed_comment: None,
            game_players: vec![advertiser_view],
            adapter: None,
        }
    }

    /// Whether `handle` may join this game: a `Public` game is open to
    /// anyone not already seated; a `Private` game is additionally gated
    /// to its invite list.
    pub fn is_joinable_by(&self, handle: &Handle) -> bool {
        if self.state != GameState::Advertised {
            return false;
        }
        if self.game_players.len() as u8 >= self.target_player_count {
            return false;
        }
        if self.game_players.iter().any(|p| &p.handle == handle) {
            return false;
        }
        match self.visibility {
            Visibility::Public => true,
            Visibility::Private => self.invited_handles.iter().any(|h| h == handle),
        }
    }

    /// The colors already claimed by seated game-players.
    fn used_colors(&self) -> Vec<PlayerColor> {
        self.game_players.iter().map(|p| p.color).collect()
    }

    /// The deterministic next color for a human join: the first entry of
    /// the fixed order, within the target count, not already in use.
    pub fn next_available_color(&self) -> Option<PlayerColor> {
        let used = self.used_colors();
        PlayerColor::ORDER[..self.target_player_count as usize]
            .iter()
            .copied()
            .find(|c| !used.contains(c))
    }

    /// A uniformly random unused color, for programmatic backfill players
    /// at `StartGame` time (§9: backfill draws uniformly from the unused
    /// prefix, unlike the deterministic draw for human joins).
    pub fn random_available_color(&self, rng: &mut impl rand::Rng) -> Option<PlayerColor> {
        let used = self.used_colors();
        let mut available: Vec<PlayerColor> = PlayerColor::ORDER[..self.target_player_count as usize]
            .iter()
            .copied()
            .filter(|c| !used.contains(c))
            .collect();
        available.shuffle(rng);
        available.into_iter().next()
    }

    /// Seats a new human game-player, returning the color it was assigned.
    pub fn join(&mut self, handle: Handle) -> Option<PlayerColor> {
        let color = self.next_available_color()?;
        self.game_players.push(GamePlayerView {
            handle,
            color,
            kind: PlayerType::Human,
            state: ParticipationState::Joined,
        });
        Some(color)
    }

    /// Whether this game still has a reason to exist.
    ///
    /// An `Advertised` game is always viable — it simply waits for more
    /// joins. A `Playing` or `Finished`-in-progress game becomes unviable
    /// once fewer than two of its game-players remain in a state that can
    /// still participate (`Waiting`, `Joined`, `Playing`, `Finished`) —
    /// i.e. once enough players have quit or disconnected that the match
    /// can no longer continue meaningfully.
    pub fn is_viable(&self) -> bool {
        if self.state == GameState::Advertised {
            return true;
        }
        let active = self
            .game_players
            .iter()
            .filter(|p| {
                matches!(
                    p.state,
                    ParticipationState::Waiting
                        | ParticipationState::Joined
                        | ParticipationState::Playing
                        | ParticipationState::Finished
                )
            })
            .count();
        active >= 2
    }

    pub fn mark_active(&mut self, now: DateTime<Utc>) {
        self.last_active_time = now;
        self.activity = ActivityState::Active;
    }

    pub fn current_player_count(&self) -> u8 {
        self.game_players.len() as u8
    }

    /// Looks up one game-player entry by handle.
    pub fn game_player(&self, handle: &str) -> Option<&GamePlayerView> {
        self.game_players.iter().find(|gp| gp.handle == handle)
    }

    /// Looks up one game-player entry by handle, mutably.
    pub fn game_player_mut(&mut self, handle: &str) -> Option<&mut GamePlayerView> {
        self.game_players.iter_mut().find(|gp| gp.handle == handle)
    }

    /// Handles of every seated human game-player, in seat order.
    pub fn human_handles(&self) -> Vec<Handle> {
        self.game_players
            .iter()
            .filter(|gp| gp.kind == PlayerType::Human)
            .map(|gp| gp.handle.clone())
            .collect()
    }

    pub fn to_view(&self) -> AdvertisedGameView {
        AdvertisedGameView {
            game_id: self.game_id.clone(),
            advertiser_handle: self.advertiser_handle.clone(),
            name: self.name.clone(),
            mode: self.mode.clone(),
            target_player_count: self.target_player_count,
            visibility: self.visibility,
            current_player_count: self.current_player_count(),
            advertised_time: self.advertised_time,
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

    fn game() -> Game {
        Game::advertise(
            "arthur".into(),
            "Friday night".into(),
            "standard".into(),
            3,
            Visibility::Public,
            vec![],
            now(),
        )
    }

    #[test]
    fn advertiser_seated_with_first_color() {
        let g = game();
        assert_eq!(g.game_players.len(), 1);
        assert_eq!(g.game_players[0].color, PlayerColor::Red);
    }

    #[test]
    fn next_available_color_skips_used() {
        let mut g = game();
        assert_eq!(g.next_available_color(), Some(PlayerColor::Yellow));
        g.join("ford".into());
        assert_eq!(g.next_available_color(), Some(PlayerColor::Blue));
    }

    #[test]
    fn private_game_rejects_uninvited() {
        let mut g = game();
        g.visibility = Visibility::Private;
        g.invited_handles = vec!["ford".into()];
        assert!(g.is_joinable_by(&"ford".to_string()));
        assert!(!g.is_joinable_by(&"trillian".to_string()));
    }

    #[test]
    fn full_game_is_not_joinable() {
        let mut g = game();
        g.join("ford".into());
        g.join("trillian".into());
        assert!(!g.is_joinable_by(&"zaphod".to_string()));
    }

    #[test]
    fn advertised_game_always_viable() {
        let g = game();
        assert!(g.is_viable());
    }

    #[test]
    fn playing_game_unviable_below_two_active() {
        let mut g = game();
        g.join("ford".into());
        g.join("trillian".into());
        g.state = GameState::Playing;
        g.game_players[1].state = ParticipationState::Quit;
        g.game_players[2].state = ParticipationState::Quit;
        assert!(!g.is_viable());
    }
}
