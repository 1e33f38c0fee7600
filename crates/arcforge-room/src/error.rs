//! Error types for the game layer.

use arcforge_protocol::GameId;

/// Errors that can occur during game-record operations.
///
/// Narrow and structural, the same way [`arcforge_session::SessionError`]
/// is: the request-precondition errors from §7 (`InvalidGame`,
/// `NotAdvertiser`, …) are the engine's concern, one layer up.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// No game exists with the given id.
    #[error("game {0} not found")]
    NotFound(GameId),

    /// The game is not in a state that allows this operation (e.g.
    /// joining a game that has already started).
    #[error("invalid game state for this operation: {0}")]
    InvalidState(String),
}
