//! Unified error type for the Arcforge framework.
//!
//! [`EngineError`] is what every Event Engine transition function (§4.E)
//! returns on a precondition violation. The dispatcher never inspects the
//! variant structurally beyond calling [`EngineError::reason`] — that
//! mapping is what turns an internal error into the wire-level
//! `RequestFailed(reason, comment)` (§7).

use arcforge_protocol::{FailureReason, ProtocolError};
use arcforge_room::GameError;
use arcforge_session::SessionError;
use arcforge_transport::TransportError;

/// Every way a transition, the transport layer, or bootstrap can fail.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("missing or malformed authorization header")]
    MissingAuth,

    #[error("unknown player id")]
    InvalidPlayer,

    #[error("handle already in use")]
    DuplicateUser,

    #[error("registered player limit reached")]
    UserLimitReached,

    #[error("game limit reached")]
    GameLimitReached,

    #[error("already participating in a game")]
    AlreadyPlaying,

    #[error("not currently participating in a game")]
    NotPlaying,

    #[error("{0}")]
    InvalidGame(String),

    #[error("caller is not the advertiser")]
    NotAdvertiser,

    #[error("the advertiser may not quit their own game")]
    AdvertiserMayNotQuit,

    #[error("no move is currently pending for this player")]
    NoMovePending,

    #[error("illegal move")]
    IllegalMove,

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Game(#[from] GameError),
}

impl EngineError {
    /// Maps this error onto the wire-level failure reason clients see in
    /// `RequestFailed`. Transport/bootstrap errors never reach a client —
    /// `reason()` is only ever called from within request handling, where
    /// those variants can't occur — but they still get a sane default.
    pub fn reason(&self) -> FailureReason {
        match self {
            EngineError::InvalidRequest(_) => FailureReason::InvalidRequest,
            EngineError::MissingAuth => FailureReason::MissingAuth,
            EngineError::InvalidPlayer => FailureReason::InvalidPlayer,
            EngineError::DuplicateUser => FailureReason::DuplicateUser,
            EngineError::UserLimitReached => FailureReason::UserLimitReached,
            EngineError::GameLimitReached => FailureReason::GameLimitReached,
            EngineError::AlreadyPlaying => FailureReason::AlreadyPlaying,
            EngineError::NotPlaying => FailureReason::NotPlaying,
            EngineError::InvalidGame(_) => FailureReason::InvalidGame,
            EngineError::NotAdvertiser => FailureReason::NotAdvertiser,
            EngineError::AdvertiserMayNotQuit => FailureReason::AdvertiserMayNotQuit,
            EngineError::NoMovePending => FailureReason::NoMovePending,
            EngineError::IllegalMove => FailureReason::IllegalMove,
            EngineError::Internal(_)
            | EngineError::Transport(_)
            | EngineError::Protocol(_)
            | EngineError::Session(_)
            | EngineError::Game(_) => FailureReason::InternalError,
        }
    }

    /// The optional human-readable comment attached to `RequestFailed`.
    /// Per §7, internal errors never leak source detail to the client.
    pub fn comment(&self) -> Option<String> {
        match self {
            EngineError::InvalidRequest(msg) | EngineError::InvalidGame(msg) => {
                Some(msg.clone())
            }
            EngineError::Internal(_)
            | EngineError::Transport(_)
            | EngineError::Protocol(_)
            | EngineError::Session(_)
            | EngineError::Game(_) => Some("an internal error occurred".to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_documented_failure_reasons() {
        assert_eq!(EngineError::MissingAuth.reason(), FailureReason::MissingAuth);
        assert_eq!(EngineError::NotAdvertiser.reason(), FailureReason::NotAdvertiser);
        assert_eq!(EngineError::IllegalMove.reason(), FailureReason::IllegalMove);
    }

    #[test]
    fn internal_errors_never_leak_source_detail() {
        let err = EngineError::Session(SessionError::NotFound);
        assert_eq!(err.reason(), FailureReason::InternalError);
        assert_eq!(err.comment().as_deref(), Some("an internal error occurred"));
    }
}
