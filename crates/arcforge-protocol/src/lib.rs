//! Wire protocol for Arcforge.
//!
//! This crate defines the "language" that clients and servers speak:
//!
//! - **Types** ([`Envelope`] and everything it carries) — the message
//!   structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages
//!   are converted to/from bytes, and how requests are validated.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding, decoding, or validation.
//!
//! # Architecture
//!
//! The protocol layer sits below everything else. It doesn't know about
//! connections, players, or games — it only knows how to serialize,
//! deserialize, and validate messages.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Session/Room (domain state)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    timestamp, ActivityState, AdvertisedGameView, CancelledReason, ConnectionState, Envelope,
    FailureReason, GameId, GamePlayerView, GameState, Handle, ParticipationState, PlayerColor,
    PlayerId, PlayerType, RegisteredPlayerView, Visibility,
};
