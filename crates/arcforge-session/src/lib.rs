//! Player identity and authorization for Arcforge.
//!
//! This crate owns the shape of a player record and the one piece of
//! authentication Arcforge does itself: parsing the `Authorization`
//! header a client presents on every request after registration.
//!
//! There is no cryptographic authentication here — identity is a
//! server-minted opaque token (`PlayerId`) that the client echoes back.
//! Validating that the token refers to a *live* player is the Entity
//! Store's job (it needs the lock); this crate only parses the header
//! into a candidate id.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)   ← reads/mutates Player.current_game_id, .participation
//!     ↕
//! Session Layer (this crate)  ← defines the Player record and auth parsing
//!     ↕
//! Protocol Layer (below)  ← provides PlayerId, Handle, enum types
//! ```

mod auth;
mod error;
mod player;

pub use auth::parse_authorization_header;
pub use error::SessionError;
pub use player::Player;
