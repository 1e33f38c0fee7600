//! `ArcforgeServer` builder and top-level server loop (§4.H).
//!
//! This is the entry point for running an Arcforge game server: it ties
//! together the transport, the locked entity store, the event engine,
//! the connection registry, and the sweep scheduler, and runs the
//! accept loop alongside the sweeps under one `tokio::select!`.

use std::sync::Arc;

use arcforge_protocol::JsonCodec;
use arcforge_room::GameRuleFactory;
use arcforge_tick::{SweepKind, SweepScheduler};
use arcforge_transport::{Transport, WebSocketTransport};
use chrono::Utc;
use tokio::sync::Mutex;

use crate::config::{Config, ConfigError};
use crate::engine::{Engine, RequestContext};
use crate::entity::EntityStore;
use crate::handler::handle_connection;
use crate::queue::TaskQueue;
use crate::registry::ConnectionRegistry;

/// Shared state handed to every connection task and consulted by the
/// scheduler. `store` is the one global critical section (§5) — nothing
/// else in the server locks anything to read or mutate game/player
/// state.
pub(crate) struct ServerState {
    pub(crate) store: Mutex<EntityStore>,
    pub(crate) engine: Engine,
    pub(crate) registry: ConnectionRegistry,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting an Arcforge server.
///
/// ```rust,ignore
/// use arcforge::{ArcforgeServer, Config};
///
/// let server = ArcforgeServer::builder()
///     .config(Config::load("arcforge.toml")?)
///     .build(my_rule_factory)
///     .await?;
/// server.run().await;
/// ```
pub struct ArcforgeServerBuilder {
    config: Config,
}

impl ArcforgeServerBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Loads configuration from a TOML file, keeping documented defaults
    /// for any field it omits.
    pub fn config_file(mut self, path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        self.config = Config::load(path)?;
        Ok(self)
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Overrides the bind address from whatever the config specified.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        let addr = addr.into();
        if let Some((host, port)) = addr.rsplit_once(':') {
            self.config.server_host = host.to_string();
            if let Ok(port) = port.parse() {
                self.config.server_port = port;
            }
        }
        self
    }

    /// Binds the transport and builds a running server, ready for
    /// [`ArcforgeServer::run`]. `rule_factory` supplies a fresh
    /// [`GameRuleAdapter`](arcforge_room::GameRuleAdapter) for every
    /// game at `StartGame` time — the embedding application's one
    /// required piece of injection (§4.D).
    pub async fn build(
        self,
        rule_factory: impl GameRuleFactory,
    ) -> Result<ArcforgeServer, arcforge_transport::TransportError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr()).await?;
        let sweep_schedule = self.config.sweep_schedule();
        let state = Arc::new(ServerState {
            store: Mutex::new(EntityStore::new()),
            engine: Engine::new(self.config, Arc::new(rule_factory)),
            registry: ConnectionRegistry::new(),
            codec: JsonCodec,
        });
        Ok(ArcforgeServer {
            transport,
            state,
            sweeps: SweepScheduler::new(sweep_schedule),
        })
    }
}

impl Default for ArcforgeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Arcforge game server. Call [`run`](Self::run) to start
/// accepting connections; it returns once `shutdown_signal` resolves.
pub struct ArcforgeServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
    sweeps: SweepScheduler,
}

impl ArcforgeServer {
    pub fn builder() -> ArcforgeServerBuilder {
        ArcforgeServerBuilder::new()
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop and the three sweeps until `shutdown_signal`
    /// resolves, then runs the engine's shutdown transition (notifying
    /// every connected player and cancelling in-progress games) before
    /// returning.
    pub async fn run(mut self, shutdown_signal: impl std::future::Future<Output = ()>) {
        tracing::info!(addr = ?self.local_addr().ok(), "arcforge server running");
        tokio::pin!(shutdown_signal);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => {
                    match accepted {
                        Ok(conn) => {
                            let state = Arc::clone(&self.state);
                            tokio::spawn(handle_connection(conn, state));
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "accept failed");
                        }
                    }
                }
                kind = self.sweeps.wait_next() => {
                    self.run_sweep(kind).await;
                }
                _ = &mut shutdown_signal => {
                    tracing::info!("shutdown signal received");
                    break;
                }
            }
        }

        let mut store = self.state.store.lock().await;
        let mut queue = TaskQueue::new();
        let mut ctx = RequestContext::new(&mut store, &mut queue, Utc::now());
        self.state.engine.shutdown(&mut ctx);
        let (sends, disconnects) = queue.drain();
        drop(store);
        crate::handler::deliver(&self.state, sends, disconnects).await;
        let _ = self.transport.shutdown().await;
    }

    async fn run_sweep(&mut self, kind: SweepKind) {
        let mut store = self.state.store.lock().await;
        let mut queue = TaskQueue::new();
        let mut ctx = RequestContext::new(&mut store, &mut queue, Utc::now());
        match kind {
            SweepKind::IdlePlayer => self.state.engine.idle_player_sweep(&mut ctx),
            SweepKind::IdleGame => self.state.engine.idle_game_sweep(&mut ctx),
            SweepKind::ObsoleteGame => self.state.engine.obsolete_game_sweep(&mut ctx),
        }
        let (sends, disconnects) = queue.drain();
        drop(store);
        crate::handler::deliver(&self.state, sends, disconnects).await;
    }
}
