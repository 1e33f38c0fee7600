//! # Arcforge
//!
//! The session state manager and event engine for a multiplayer
//! game-session server: identities, advertised/joined/started/cancelled
//! game rooms, chat, and turn-based play against humans and
//! programmatic backfill, all driven through a single global critical
//! section (see `engine` for the transition catalog).
//!
//! Arcforge owns everything client requests, connection-lifecycle
//! signals, and the three periodic sweeps touch; it knows nothing about
//! how a particular game is actually played — that's the one thing an
//! embedding application supplies, via [`arcforge_room::GameRuleFactory`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arcforge::{ArcforgeServer, Config};
//! use arcforge_room::GameRuleFactory;
//!
//! # async fn run(rule_factory: impl GameRuleFactory) -> Result<(), Box<dyn std::error::Error>> {
//! let server = ArcforgeServer::builder()
//!     .config(Config::default())
//!     .bind("0.0.0.0:8080")
//!     .build(rule_factory)
//!     .await?;
//! server.run(std::future::pending()).await;
//! # Ok(())
//! # }
//! ```

mod config;
mod engine;
mod entity;
mod error;
mod handler;
mod queue;
mod registry;
mod server;

pub use config::{Config, ConfigError};
pub use engine::{Engine, RequestContext};
pub use entity::EntityStore;
pub use error::EngineError;
pub use queue::{Outbound, TaskQueue};
pub use registry::ConnectionRegistry;
pub use server::{ArcforgeServer, ArcforgeServerBuilder};

/// Re-exports of the types an embedding application needs most: the
/// wire protocol, the rule-adapter boundary, and the server builder.
pub mod prelude {
    pub use crate::{ArcforgeServer, ArcforgeServerBuilder, Config, EngineError};
    pub use arcforge_protocol::{Envelope, FailureReason, Handle, PlayerId};
    pub use arcforge_room::{GameRuleAdapter, GameRuleFactory, MoveOutcome};
}
