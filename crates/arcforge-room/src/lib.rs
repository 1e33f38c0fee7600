//! Game record management for Arcforge.
//!
//! A `Game` is plain bookkeeping data (§3) — no actor, no channel, no
//! task of its own. It lives inside the top-level Entity Store alongside
//! `Player` records, all guarded by one lock (§5), and is driven entirely
//! by the Event Engine one request at a time.
//!
//! This crate owns the `Game` record itself, the `GameRuleAdapter`
//! boundary to pluggable rule engines, and the color/name-pool helpers
//! used when seating players.

mod adapter;
mod error;
mod game;
mod names;

pub use adapter::{GameRuleAdapter, GameRuleFactory, MoveOutcome};
pub use error::GameError;
pub use game::Game;
pub use names::{draw_programmatic_names, NAME_POOL};
