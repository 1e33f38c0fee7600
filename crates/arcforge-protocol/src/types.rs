//! Wire types for Arcforge: the request/event envelope and every value
//! that travels inside it.
//!
//! Everything here is plain data — `Serialize`/`Deserialize` structs and
//! enums. The wire shape is a single JSON object per frame:
//!
//! ```json
//! {"message": "JoinGame", "context": {"game_id": "c9f1..."}}
//! ```
//!
//! `message` names the kind (§6.2); `context` is kind-specific and is
//! **omitted** for kinds that carry none (`serde`'s adjacently tagged
//! representation already does this for unit variants, so no manual
//! `Option` juggling is needed). [`Envelope`] is the sum of every request
//! and every event kind — one flat tagged enum, matching the "tagged sum
//! + dispatch table" approach called for over reflective method lookup.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Opaque ids
// ---------------------------------------------------------------------------

/// Server-minted, UUID-shaped identifier for a player.
///
/// This is the bearer credential a client presents on every request after
/// registration (`Authorization: Player <id>`, see §6.3). It is never
/// logged at `info` level or above — handlers that need to trace a
/// request use the player's [`Handle`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Mints a fresh, random player id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for PlayerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Server-minted, UUID-shaped identifier for a game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub String);

impl GameId {
    /// Mints a fresh, random game id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for GameId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for GameId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A client-chosen display name. Globally unique while the player exists.
pub type Handle = String;

/// Serializes timestamps as `YYYY-MM-DDTHH:mm:ss,SSSZ` — the one date
/// format used anywhere on the wire.
pub mod timestamp {
    use super::*;
    use serde::{Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S,%3fZ";

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_str(&raw, FORMAT)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => super::serialize(dt, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            match raw {
                Some(raw) => DateTime::parse_from_str(&raw, FORMAT)
                    .map(|dt| Some(dt.with_timezone(&Utc)))
                    .map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Shared enumerations
// ---------------------------------------------------------------------------

/// Whether a game is open to anyone or gated to an invite list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
}

/// Whether a game-player is a human behind a real connection or a
/// server-synthesized stand-in drawn from the name pool at start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerType {
    Human,
    Programmatic,
}

/// Where a player (or a game-player entry) sits in its participation
/// lifecycle. The same six states are used for both — see §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipationState {
    Waiting,
    Joined,
    Playing,
    Finished,
    Quit,
    Disconnected,
}

/// Connection-level reachability of a player's transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Activity classification driven by the idle sweeps (§4.E timer
/// transitions). Strict-greater-than against the configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityState {
    Active,
    Idle,
    Inactive,
}

/// Lifecycle state of a game. Advertised → Playing → Completed, or
/// Advertised|Playing → Cancelled. No transitions out of a terminal state
/// except deletion by the obsolete sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Advertised,
    Playing,
    Completed,
    Cancelled,
}

/// Why a game was cancelled — carried in `GameCancelled` and stashed on
/// the game record as `cancelled_reason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelledReason {
    /// The advertiser called `CancelGame`.
    Cancelled,
    /// Fewer than 2 game-players remain in a playable state.
    NotViable,
    /// The idle-game sweep found the game past `game_inactive_thresh`.
    Inactive,
    /// The server is shutting down (`notify` is always `false` for this one).
    Shutdown,
}

/// Fixed seat-color ordering. Colors are assigned as the unused prefix of
/// this order, sized to a game's `target_player_count` (§9 design notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerColor {
    Red,
    Yellow,
    Blue,
    Green,
}

impl PlayerColor {
    /// The full fixed ordering color assignment draws from.
    pub const ORDER: [PlayerColor; 4] = [
        PlayerColor::Red,
        PlayerColor::Yellow,
        PlayerColor::Blue,
        PlayerColor::Green,
    ];
}

/// Error kinds surfaced to clients via `RequestFailed(reason, comment)` — §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    InvalidRequest,
    MissingAuth,
    InvalidPlayer,
    DuplicateUser,
    UserLimitReached,
    GameLimitReached,
    AlreadyPlaying,
    NotPlaying,
    InvalidGame,
    NotAdvertiser,
    AdvertiserMayNotQuit,
    NoMovePending,
    IllegalMove,
    InternalError,
}

// ---------------------------------------------------------------------------
// Snapshot / view structs embedded in events
// ---------------------------------------------------------------------------

/// One entry of a `game_players` table, embedded in internal snapshots
/// and in the rule adapter's seat assignment calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePlayerView {
    pub handle: Handle,
    pub color: PlayerColor,
    pub kind: PlayerType,
    pub state: ParticipationState,
}

/// Public snapshot of a registered player, as returned by `ListPlayers`.
///
/// Deliberately omits `player_id` — that token is a bearer credential and
/// is only ever handed to its owner (in `PlayerRegistered`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredPlayerView {
    pub handle: Handle,
    pub connection: ConnectionState,
    pub activity: ActivityState,
    #[serde(with = "timestamp")]
    pub registration_time: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub last_active_time: DateTime<Utc>,
}

/// Snapshot of an advertised game, as returned by `ListAvailableGames`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvertisedGameView {
    pub game_id: GameId,
    pub advertiser_handle: Handle,
    pub name: String,
    pub mode: String,
    pub target_player_count: u8,
    pub visibility: Visibility,
    pub current_player_count: u8,
    #[serde(with = "timestamp")]
    pub advertised_time: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The full request/event message catalog (§6.2), tagged adjacently by
/// `message` with an optional `context`. Requests travel client→server;
/// events travel server→client. Both live in one enum because the wire
/// carries both through the same frame type and dispatch is a single
/// table lookup keyed on `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message", content = "context")]
pub enum Envelope {
    // --- Requests ---
    RegisterPlayer {
        handle: Handle,
    },
    ReregisterPlayer,
    UnregisterPlayer,
    ListPlayers,
    AdvertiseGame {
        name: String,
        mode: String,
        players: u8,
        visibility: Visibility,
        invited_handles: Vec<Handle>,
    },
    ListAvailableGames,
    JoinGame {
        game_id: GameId,
    },
    QuitGame,
    StartGame,
    CancelGame,
    ExecuteMove {
        move_id: String,
    },
    RetrieveGameState,
    SendMessage {
        text: String,
        recipient_handles: Vec<Handle>,
    },

    // --- Events ---
    RequestFailed {
        reason: FailureReason,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        comment: Option<String>,
    },
    RegisteredPlayers {
        players: Vec<RegisteredPlayerView>,
    },
    AvailableGames {
        games: Vec<AdvertisedGameView>,
    },
    PlayerRegistered {
        player_id: PlayerId,
    },
    PlayerDisconnected {
        handle: Handle,
    },
    PlayerIdle {
        handle: Handle,
    },
    PlayerInactive {
        handle: Handle,
    },
    PlayerMessageReceived {
        sender: Handle,
        recipients: Vec<Handle>,
        text: String,
    },
    GameAdvertised {
        game_id: GameId,
    },
    GameInvitation {
        game_id: GameId,
        advertiser_handle: Handle,
        name: String,
        mode: String,
        players: u8,
    },
    GameJoined {
        game_id: GameId,
    },
    GameStarted {
        game_id: GameId,
    },
    GameCancelled {
        reason: CancelledReason,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        comment: Option<String>,
    },
    GameCompleted {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        comment: Option<String>,
    },
    GameIdle,
    /// Never emitted by the current engine (the idle-game sweep cancels
    /// inactive games directly rather than announcing this state first);
    /// kept as a recognized wire kind because it is part of the documented
    /// catalog and existing clients may match on it defensively.
    GameInactive,
    /// Never emitted: the obsolete-game sweep deletes silently (§4.E).
    GameObsolete,
    GamePlayerChange {
        comment: String,
    },
    /// `view` is whatever the Game Rule Adapter's `player_view` produced —
    /// opaque to the core, so it travels as a raw JSON value.
    GameStateChange {
        view: serde_json::Value,
    },
    GamePlayerTurn {
        moves: Vec<String>,
    },
    ServerShutdown,
}

impl Envelope {
    /// Runs the field validators from §4.A against a freshly decoded
    /// request. Events (server→client) are always well-formed by
    /// construction and are not validated.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        fn non_empty(field: &str, value: &str) -> Result<(), ProtocolError> {
            if value.is_empty() || value == "None" {
                return Err(ProtocolError::Validation(format!(
                    "{field} must be a non-empty string"
                )));
            }
            Ok(())
        }

        match self {
            Envelope::RegisterPlayer { handle } => non_empty("handle", handle),
            Envelope::AdvertiseGame {
                name,
                players,
                invited_handles,
                ..
            } => {
                non_empty("name", name)?;
                if !(2..=4).contains(players) {
                    return Err(ProtocolError::Validation(format!(
                        "players must be 2, 3, or 4, got {players}"
                    )));
                }
                for handle in invited_handles {
                    non_empty("invited_handles", handle)?;
                }
                Ok(())
            }
            Envelope::JoinGame { game_id } => non_empty("game_id", game_id.as_ref()),
            Envelope::ExecuteMove { move_id } => non_empty("move_id", move_id),
            Envelope::SendMessage {
                recipient_handles, ..
            } => {
                if recipient_handles.is_empty() {
                    return Err(ProtocolError::Validation(
                        "recipient_handles must not be empty".into(),
                    ));
                }
                for handle in recipient_handles {
                    non_empty("recipient_handles", handle)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// The `message` kind name, as it appears on the wire. Useful for
    /// logging without re-serializing the whole envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::RegisterPlayer { .. } => "RegisterPlayer",
            Envelope::ReregisterPlayer => "ReregisterPlayer",
            Envelope::UnregisterPlayer => "UnregisterPlayer",
            Envelope::ListPlayers => "ListPlayers",
            Envelope::AdvertiseGame { .. } => "AdvertiseGame",
            Envelope::ListAvailableGames => "ListAvailableGames",
            Envelope::JoinGame { .. } => "JoinGame",
            Envelope::QuitGame => "QuitGame",
            Envelope::StartGame => "StartGame",
            Envelope::CancelGame => "CancelGame",
            Envelope::ExecuteMove { .. } => "ExecuteMove",
            Envelope::RetrieveGameState => "RetrieveGameState",
            Envelope::SendMessage { .. } => "SendMessage",
            Envelope::RequestFailed { .. } => "RequestFailed",
            Envelope::RegisteredPlayers { .. } => "RegisteredPlayers",
            Envelope::AvailableGames { .. } => "AvailableGames",
            Envelope::PlayerRegistered { .. } => "PlayerRegistered",
            Envelope::PlayerDisconnected { .. } => "PlayerDisconnected",
            Envelope::PlayerIdle { .. } => "PlayerIdle",
            Envelope::PlayerInactive { .. } => "PlayerInactive",
            Envelope::PlayerMessageReceived { .. } => "PlayerMessageReceived",
            Envelope::GameAdvertised { .. } => "GameAdvertised",
            Envelope::GameInvitation { .. } => "GameInvitation",
            Envelope::GameJoined { .. } => "GameJoined",
            Envelope::GameStarted { .. } => "GameStarted",
            Envelope::GameCancelled { .. } => "GameCancelled",
            Envelope::GameCompleted { .. } => "GameCompleted",
            Envelope::GameIdle => "GameIdle",
            Envelope::GameInactive => "GameInactive",
            Envelope::GameObsolete => "GameObsolete",
            Envelope::GamePlayerChange { .. } => "GamePlayerChange",
            Envelope::GameStateChange { .. } => "GameStateChange",
            Envelope::GamePlayerTurn { .. } => "GamePlayerTurn",
            Envelope::ServerShutdown => "ServerShutdown",
        }
    }
}
