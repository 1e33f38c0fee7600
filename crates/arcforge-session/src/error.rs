//! Error types for the session layer.

use arcforge_protocol::Handle;

/// Errors that can occur while registering or looking up a player.
///
/// These stay narrow and structural; the request-precondition errors
/// from §7 (`UserLimitReached`, `InvalidPlayer`, …) are the engine's
/// concern, one layer up, which converts these into the right
/// `FailureReason`.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// `handle` is already bound to a live player.
    #[error("handle '{0}' is already in use")]
    DuplicateHandle(Handle),

    /// No player exists with the given id.
    #[error("no player with that id")]
    NotFound,

    /// The `Authorization` header was absent or didn't parse as `Player <id>`.
    #[error("missing or malformed authorization header")]
    MissingAuth,
}
