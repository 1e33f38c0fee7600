//! The Event Engine (§4.E) — the core.
//!
//! Every function here is a pure transition: given a mutable view of the
//! state plus its inputs, it mutates state and appends outbound messages
//! to a [`TaskQueue`]. Nothing in this module touches the network or a
//! clock of its own; `now` and the queue are handed in by the caller
//! (the dispatcher for requests, the scheduler for sweeps), both of
//! which run this under the single global critical section (§5).
//!
//! [`Engine`] itself carries no mutable state — just the configured
//! limits/thresholds and the factory used to build a fresh rule adapter
//! at `StartGame` time. A precondition violation returns `Err` without
//! having mutated anything (§4.E "Failure semantics"); the caller is
//! responsible for converting that into a `RequestFailed` sent back to
//! the offending transport (`dispatch`, below, does this for requests).

use arcforge_protocol::{
    ActivityState, CancelledReason, ConnectionState, Envelope, GameId, GamePlayerView, GameState,
    Handle, ParticipationState, PlayerColor, PlayerId, PlayerType, Visibility,
};
use arcforge_room::{draw_programmatic_names, Game, GameRuleFactory};
use arcforge_transport::ConnectionId;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::Config;
use crate::entity::EntityStore;
use crate::error::EngineError;
use crate::queue::TaskQueue;

/// Bundles the two things every transition needs beyond its own
/// arguments: the entity store to mutate and the queue to emit into.
/// Named after the abstraction spec.md §9 calls for ("invokes E through
/// the RequestContext").
pub struct RequestContext<'a> {
    pub store: &'a mut EntityStore,
    pub queue: &'a mut TaskQueue,
    pub now: DateTime<Utc>,
}

impl<'a> RequestContext<'a> {
    pub fn new(store: &'a mut EntityStore, queue: &'a mut TaskQueue, now: DateTime<Utc>) -> Self {
        Self { store, queue, now }
    }
}

/// The session state manager's transition logic. Stateless beyond its
/// configuration — safe to share behind an `Arc` across every connection
/// task and the scheduler.
pub struct Engine {
    config: Config,
    rule_factory: Arc<dyn GameRuleFactory>,
}

impl Engine {
    pub fn new(config: Config, rule_factory: Arc<dyn GameRuleFactory>) -> Self {
        Self {
            config,
            rule_factory,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // -----------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------

    /// Routes one decoded request envelope to its transition function and
    /// turns a precondition violation into a `RequestFailed` addressed to
    /// the sender only. This is the "dispatch table" of §9's design notes
    /// — a plain `match` over the tagged sum, not reflection.
    pub fn dispatch(
        &self,
        ctx: &mut RequestContext,
        transport: ConnectionId,
        player_id: Option<&PlayerId>,
        envelope: Envelope,
    ) {
        let result = match envelope {
            Envelope::RegisterPlayer { handle } => self.register_player(ctx, transport, handle),
            other => match player_id {
                None => Err(EngineError::MissingAuth),
                Some(pid) => match other {
                    Envelope::ReregisterPlayer => self.reregister_player(ctx, transport, pid),
                    Envelope::UnregisterPlayer => self.unregister_player(ctx, pid),
                    Envelope::ListPlayers => self.list_players(ctx, transport, pid),
                    Envelope::ListAvailableGames => self.list_available_games(ctx, transport, pid),
                    Envelope::AdvertiseGame {
                        name,
                        mode,
                        players,
                        visibility,
                        invited_handles,
                    } => self.advertise_game(
                        ctx,
                        transport,
                        pid,
                        name,
                        mode,
                        players,
                        visibility,
                        invited_handles,
                    ),
                    Envelope::JoinGame { game_id } => self.join_game(ctx, transport, pid, &game_id),
                    Envelope::QuitGame => self.quit_game(ctx, pid),
                    Envelope::StartGame => self.start_game(ctx, pid),
                    Envelope::CancelGame => self.cancel_game(ctx, pid),
                    Envelope::ExecuteMove { move_id } => self.execute_move(ctx, pid, &move_id),
                    Envelope::RetrieveGameState => self.retrieve_game_state(ctx, transport, pid),
                    Envelope::SendMessage {
                        text,
                        recipient_handles,
                    } => self.send_message(ctx, pid, text, recipient_handles),
                    _ => Err(EngineError::InvalidRequest(
                        "not a recognized request kind".to_string(),
                    )),
                },
            },
        };

        if let Err(e) = result {
            ctx.queue.send(
                transport,
                Envelope::RequestFailed {
                    reason: e.reason(),
                    comment: e.comment(),
                },
            );
        }
    }

    // -----------------------------------------------------------------
    // Request transitions
    // -----------------------------------------------------------------

    pub fn register_player(
        &self,
        ctx: &mut RequestContext,
        transport: ConnectionId,
        handle: Handle,
    ) -> Result<(), EngineError> {
        if ctx.store.registered_player_count() >= self.config.registered_player_limit {
            return Err(EngineError::UserLimitReached);
        }
        let player_id = ctx
            .store
            .create_player(handle, transport, ctx.now)
            .map_err(|_| EngineError::DuplicateUser)?;
        ctx.queue
            .send(transport, Envelope::PlayerRegistered { player_id });
        Ok(())
    }

    pub fn reregister_player(
        &self,
        ctx: &mut RequestContext,
        transport: ConnectionId,
        player_id: &PlayerId,
    ) -> Result<(), EngineError> {
        let player = ctx
            .store
            .player_mut(player_id)
            .ok_or(EngineError::InvalidPlayer)?;
        player.rebind(transport, ctx.now);
        ctx.queue.send(
            transport,
            Envelope::PlayerRegistered {
                player_id: player_id.clone(),
            },
        );
        Ok(())
    }

    pub fn unregister_player(
        &self,
        ctx: &mut RequestContext,
        player_id: &PlayerId,
    ) -> Result<(), EngineError> {
        let (handle, game_id) = {
            let player = ctx
                .store
                .player_mut(player_id)
                .ok_or(EngineError::InvalidPlayer)?;
            player.mark_active(ctx.now);
            (player.handle.clone(), player.current_game_id.clone())
        };
        if let Some(game_id) = game_id {
            self.quit_game_player(ctx, &game_id, &handle, format!("Player {handle} unregistered"))?;
        }
        ctx.store.remove_player(player_id);
        Ok(())
    }

    pub fn list_players(
        &self,
        ctx: &mut RequestContext,
        transport: ConnectionId,
        player_id: &PlayerId,
    ) -> Result<(), EngineError> {
        let player = ctx
            .store
            .player_mut(player_id)
            .ok_or(EngineError::InvalidPlayer)?;
        player.mark_active(ctx.now);
        let mut players: Vec<_> = ctx.store.players().map(|p| p.to_view()).collect();
        players.sort_by(|a, b| a.handle.cmp(&b.handle));
        ctx.queue
            .send(transport, Envelope::RegisteredPlayers { players });
        Ok(())
    }

    pub fn list_available_games(
        &self,
        ctx: &mut RequestContext,
        transport: ConnectionId,
        player_id: &PlayerId,
    ) -> Result<(), EngineError> {
        let player = ctx
            .store
            .player_mut(player_id)
            .ok_or(EngineError::InvalidPlayer)?;
        player.mark_active(ctx.now);
        let handle = player.handle.clone();
        let mut games: Vec<_> = ctx
            .store
            .games()
            .filter(|g| {
                g.state == GameState::Advertised
                    && (matches!(g.visibility, Visibility::Public)
                        || g.invited_handles.iter().any(|h| h == &handle))
            })
            .map(|g| (g.advertised_time, g.to_view()))
            .collect();
        games.sort_by_key(|(t, _)| *t);
        ctx.queue.send(
            transport,
            Envelope::AvailableGames {
                games: games.into_iter().map(|(_, g)| g).collect(),
            },
        );
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn advertise_game(
        &self,
        ctx: &mut RequestContext,
        transport: ConnectionId,
        player_id: &PlayerId,
        name: String,
        mode: String,
        players: u8,
        visibility: Visibility,
        invited_handles: Vec<Handle>,
    ) -> Result<(), EngineError> {
        let (handle, already_in_game) = {
            let player = ctx
                .store
                .player_mut(player_id)
                .ok_or(EngineError::InvalidPlayer)?;
            (player.handle.clone(), player.current_game_id.is_some())
        };
        if already_in_game {
            return Err(EngineError::AlreadyPlaying);
        }
        if ctx.store.total_game_count() >= self.config.total_game_limit {
            return Err(EngineError::GameLimitReached);
        }

        let name_for_invites = name.clone();
        let mode_for_invites = mode.clone();
        let game = Game::advertise(
            handle.clone(),
            name,
            mode,
            players,
            visibility,
            invited_handles.clone(),
            ctx.now,
        );
        let game_id = ctx.store.insert_game(game);

        {
            let player = ctx.store.player_mut(player_id).unwrap();
            player.mark_active(ctx.now);
            player.current_game_id = Some(game_id.clone());
            player.participation = ParticipationState::Joined;
        }

        ctx.queue.send(
            transport,
            Envelope::GameAdvertised {
                game_id: game_id.clone(),
            },
        );
        for invited in &invited_handles {
            if let Some(t) = ctx
                .store
                .player_by_handle(invited)
                .and_then(|p| p.transport_ref)
            {
                ctx.queue.send(
                    t,
                    Envelope::GameInvitation {
                        game_id: game_id.clone(),
                        advertiser_handle: handle.clone(),
                        name: name_for_invites.clone(),
                        mode: mode_for_invites.clone(),
                        players,
                    },
                );
            }
        }
        ctx.queue.send(transport, Envelope::GameJoined { game_id });
        Ok(())
    }

    pub fn join_game(
        &self,
        ctx: &mut RequestContext,
        transport: ConnectionId,
        player_id: &PlayerId,
        game_id: &GameId,
    ) -> Result<(), EngineError> {
        let (handle, already_in_game) = {
            let player = ctx
                .store
                .player_mut(player_id)
                .ok_or(EngineError::InvalidPlayer)?;
            (player.handle.clone(), player.current_game_id.is_some())
        };
        if already_in_game {
            return Err(EngineError::AlreadyPlaying);
        }
        let joinable = ctx
            .store
            .game(game_id)
            .map(|g| g.is_joinable_by(&handle))
            .unwrap_or(false);
        if !joinable {
            return Err(EngineError::InvalidGame(format!(
                "game {game_id} is not joinable"
            )));
        }

        let is_full = {
            let game = ctx.store.game_mut(game_id).unwrap();
            game.join(handle.clone());
            game.mark_active(ctx.now);
            game.current_player_count() >= game.target_player_count
        };
        {
            let player = ctx.store.player_mut(player_id).unwrap();
            player.mark_active(ctx.now);
            player.current_game_id = Some(game_id.clone());
            player.participation = ParticipationState::Joined;
        }
        ctx.queue.send(
            transport,
            Envelope::GameJoined {
                game_id: game_id.clone(),
            },
        );

        if is_full {
            match self.do_start(ctx, game_id) {
                Ok(()) | Err(EngineError::GameLimitReached) => {}
                Err(e) => {
                    tracing::error!(error = %e, %game_id, "auto-start cascade failed");
                }
            }
        }
        Ok(())
    }

    pub fn quit_game(&self, ctx: &mut RequestContext, player_id: &PlayerId) -> Result<(), EngineError> {
        let (handle, game_id) = {
            let player = ctx
                .store
                .player_mut(player_id)
                .ok_or(EngineError::InvalidPlayer)?;
            let game_id = player.current_game_id.clone().ok_or(EngineError::NotPlaying)?;
            (player.handle.clone(), game_id)
        };
        {
            let game = ctx
                .store
                .game(&game_id)
                .ok_or_else(|| EngineError::InvalidGame(format!("game {game_id} not found")))?;
            if !matches!(game.state, GameState::Advertised | GameState::Playing) {
                return Err(EngineError::InvalidGame("game is not in progress".to_string()));
            }
            if game.advertiser_handle == handle {
                return Err(EngineError::AdvertiserMayNotQuit);
            }
        }
        ctx.store.player_mut(player_id).unwrap().mark_active(ctx.now);
        self.quit_game_player(ctx, &game_id, &handle, format!("Player {handle} quit"))
    }

    pub fn start_game(&self, ctx: &mut RequestContext, player_id: &PlayerId) -> Result<(), EngineError> {
        let (handle, game_id) = {
            let player = ctx
                .store
                .player_mut(player_id)
                .ok_or(EngineError::InvalidPlayer)?;
            let game_id = player.current_game_id.clone().ok_or(EngineError::NotPlaying)?;
            (player.handle.clone(), game_id)
        };
        {
            let game = ctx
                .store
                .game(&game_id)
                .ok_or_else(|| EngineError::InvalidGame(format!("game {game_id} not found")))?;
            if game.state != GameState::Advertised {
                return Err(EngineError::InvalidGame("game has already started".to_string()));
            }
            if game.advertiser_handle != handle {
                return Err(EngineError::NotAdvertiser);
            }
        }
        if ctx.store.in_progress_game_count() >= self.config.in_progress_game_limit {
            return Err(EngineError::GameLimitReached);
        }
        ctx.store.player_mut(player_id).unwrap().mark_active(ctx.now);
        self.do_start(ctx, &game_id)
    }

    pub fn cancel_game(&self, ctx: &mut RequestContext, player_id: &PlayerId) -> Result<(), EngineError> {
        let (handle, game_id) = {
            let player = ctx
                .store
                .player_mut(player_id)
                .ok_or(EngineError::InvalidPlayer)?;
            let game_id = player.current_game_id.clone().ok_or(EngineError::NotPlaying)?;
            (player.handle.clone(), game_id)
        };
        {
            let game = ctx
                .store
                .game(&game_id)
                .ok_or_else(|| EngineError::InvalidGame(format!("game {game_id} not found")))?;
            if !matches!(game.state, GameState::Advertised | GameState::Playing) {
                return Err(EngineError::InvalidGame("game is not in progress".to_string()));
            }
            if game.advertiser_handle != handle {
                return Err(EngineError::NotAdvertiser);
            }
        }
        ctx.store.player_mut(player_id).unwrap().mark_active(ctx.now);
        self.cancel(ctx, &game_id, CancelledReason::Cancelled, true)
    }

    pub fn execute_move(
        &self,
        ctx: &mut RequestContext,
        player_id: &PlayerId,
        move_id: &str,
    ) -> Result<(), EngineError> {
        let (handle, game_id) = {
            let player = ctx
                .store
                .player_mut(player_id)
                .ok_or(EngineError::InvalidPlayer)?;
            let game_id = player.current_game_id.clone().ok_or(EngineError::NotPlaying)?;
            (player.handle.clone(), game_id)
        };
        {
            let game = ctx
                .store
                .game(&game_id)
                .ok_or_else(|| EngineError::InvalidGame(format!("game {game_id} not found")))?;
            if game.state != GameState::Playing {
                return Err(EngineError::NotPlaying);
            }
            let adapter = game
                .adapter
                .as_ref()
                .ok_or_else(|| EngineError::Internal("game has no rule adapter".to_string()))?;
            if !adapter.is_move_pending(&handle) {
                return Err(EngineError::NoMovePending);
            }
            if !adapter.legal_moves(&handle).iter().any(|m| m == move_id) {
                return Err(EngineError::IllegalMove);
            }
        }
        ctx.store.player_mut(player_id).unwrap().mark_active(ctx.now);

        let outcome = {
            let game = ctx.store.game_mut(&game_id).unwrap();
            let adapter = game.adapter.as_mut().unwrap();
            adapter.execute_move(&handle, move_id)
        };
        ctx.store.game_mut(&game_id).unwrap().mark_active(ctx.now);

        if outcome.completed {
            self.complete(ctx, &game_id, outcome.comment)
        } else {
            self.broadcast_state(ctx, &game_id)?;
            if let Some(next) = outcome.next_turn {
                self.resolve_turn(ctx, &game_id, next)?;
            }
            Ok(())
        }
    }

    pub fn retrieve_game_state(
        &self,
        ctx: &mut RequestContext,
        transport: ConnectionId,
        player_id: &PlayerId,
    ) -> Result<(), EngineError> {
        let (handle, game_id) = {
            let player = ctx
                .store
                .player_mut(player_id)
                .ok_or(EngineError::InvalidPlayer)?;
            player.mark_active(ctx.now);
            let game_id = player.current_game_id.clone().ok_or(EngineError::NotPlaying)?;
            (player.handle.clone(), game_id)
        };
        let game = ctx
            .store
            .game(&game_id)
            .ok_or_else(|| EngineError::InvalidGame(format!("game {game_id} not found")))?;
        if game.state != GameState::Playing {
            return Err(EngineError::NotPlaying);
        }
        let adapter = game
            .adapter
            .as_ref()
            .ok_or_else(|| EngineError::Internal("game has no rule adapter".to_string()))?;
        let view = adapter.player_view(&handle);
        ctx.queue.send(transport, Envelope::GameStateChange { view });
        Ok(())
    }

    pub fn send_message(
        &self,
        ctx: &mut RequestContext,
        player_id: &PlayerId,
        text: String,
        recipient_handles: Vec<Handle>,
    ) -> Result<(), EngineError> {
        let sender = {
            let player = ctx
                .store
                .player_mut(player_id)
                .ok_or(EngineError::InvalidPlayer)?;
            player.mark_active(ctx.now);
            player.handle.clone()
        };
        for recipient in &recipient_handles {
            if let Some(t) = ctx
                .store
                .player_by_handle(recipient)
                .and_then(|p| p.transport_ref)
            {
                ctx.queue.send(
                    t,
                    Envelope::PlayerMessageReceived {
                        sender: sender.clone(),
                        recipients: recipient_handles.clone(),
                        text: text.clone(),
                    },
                );
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Sub-transitions
    // -----------------------------------------------------------------

    /// The shared `StartGame` effect: backfills programmatic players,
    /// promotes everyone to `Playing`, seats the rule adapter, and kicks
    /// off the first turn. Used both by the explicit `StartGame` request
    /// and by `JoinGame`'s auto-start cascade when the last seat fills.
    fn do_start(&self, ctx: &mut RequestContext, game_id: &GameId) -> Result<(), EngineError> {
        if ctx.store.in_progress_game_count() >= self.config.in_progress_game_limit {
            return Err(EngineError::GameLimitReached);
        }
        let mut rng = rand::rng();
        let seat_assignments: Vec<Handle>;
        {
            let game = ctx
                .store
                .game_mut(game_id)
                .ok_or_else(|| EngineError::InvalidGame(format!("game {game_id} not found")))?;
            let existing: Vec<Handle> = game.game_players.iter().map(|gp| gp.handle.clone()).collect();
            let missing = game.target_player_count as usize - game.game_players.len();
            let backfill = draw_programmatic_names(missing, &existing, &mut rng);

            for gp in game.game_players.iter_mut() {
                if matches!(gp.state, ParticipationState::Waiting | ParticipationState::Joined) {
                    gp.state = ParticipationState::Playing;
                }
            }
            for name in &backfill {
                let color = game
                    .random_available_color(&mut rng)
                    .ok_or_else(|| EngineError::Internal("no colors left to assign".to_string()))?;
                game.game_players.push(GamePlayerView {
                    handle: name.clone(),
                    color,
                    kind: PlayerType::Programmatic,
                    state: ParticipationState::Playing,
                });
            }

            game.state = GameState::Playing;
            game.started_time = Some(ctx.now);
            game.mark_active(ctx.now);

            seat_assignments = existing.into_iter().chain(backfill).collect();
            let mut adapter = self.rule_factory.create();
            adapter.start(game.target_player_count, &seat_assignments);
            game.adapter = Some(adapter);
        }

        let humans = ctx.store.game(game_id).unwrap().human_handles();
        for handle in &humans {
            if let Some(player_id) = ctx.store.player_id_by_handle(handle).cloned() {
                if let Some(player) = ctx.store.player_mut(&player_id) {
                    player.participation = ParticipationState::Playing;
                }
            }
        }
        for handle in &humans {
            if let Some(t) = ctx.store.player_by_handle(handle).and_then(|p| p.transport_ref) {
                ctx.queue.send(
                    t,
                    Envelope::GameStarted {
                        game_id: game_id.clone(),
                    },
                );
            }
        }
        for handle in &humans {
            if let Some(t) = ctx.store.player_by_handle(handle).and_then(|p| p.transport_ref) {
                ctx.queue.send(
                    t,
                    Envelope::GamePlayerChange {
                        comment: "Game started".to_string(),
                    },
                );
            }
        }
        self.broadcast_state(ctx, game_id)?;

        let first = {
            let game = ctx.store.game(game_id).unwrap();
            let adapter = game.adapter.as_ref().unwrap();
            seat_assignments
                .iter()
                .find(|h| adapter.is_move_pending(h))
                .map(|h| (h.clone(), adapter.legal_moves(h)))
        };
        if let Some(candidate) = first {
            self.resolve_turn(ctx, game_id, candidate)?;
        }
        Ok(())
    }

    /// Delivers a computed next turn. If the designated player is human,
    /// emits `GamePlayerTurn`. If programmatic, auto-plays its first
    /// legal move (§11.17 of the expanded spec) and recurses — there is
    /// no transport to notify, and the rule adapter is required to be
    /// synchronous, so this stays inside the same critical section as
    /// the request or sweep that triggered it.
    fn resolve_turn(
        &self,
        ctx: &mut RequestContext,
        game_id: &GameId,
        candidate: (Handle, Vec<String>),
    ) -> Result<(), EngineError> {
        let (handle, moves) = candidate;
        let is_programmatic = ctx
            .store
            .game(game_id)
            .and_then(|g| g.game_player(&handle))
            .map(|gp| gp.kind == PlayerType::Programmatic)
            .unwrap_or(false);

        if !is_programmatic {
            if let Some(t) = ctx.store.player_by_handle(&handle).and_then(|p| p.transport_ref) {
                ctx.queue.send(t, Envelope::GamePlayerTurn { moves });
            }
            return Ok(());
        }

        let move_id = moves
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Internal("programmatic player has no legal move".to_string()))?;
        let outcome = {
            let game = ctx
                .store
                .game_mut(game_id)
                .ok_or_else(|| EngineError::Internal("game vanished mid-turn".to_string()))?;
            let adapter = game
                .adapter
                .as_mut()
                .ok_or_else(|| EngineError::Internal("game has no rule adapter".to_string()))?;
            adapter.execute_move(&handle, &move_id)
        };
        ctx.store.game_mut(game_id).unwrap().mark_active(ctx.now);

        if outcome.completed {
            self.complete(ctx, game_id, outcome.comment)
        } else {
            self.broadcast_state(ctx, game_id)?;
            if let Some(next) = outcome.next_turn {
                self.resolve_turn(ctx, game_id, next)?;
            }
            Ok(())
        }
    }

    /// The game-player-quit sub-transition (§4.E / §11.13): removes or
    /// marks `Quit` the game-player entry for `handle`, notifies the
    /// remaining humans, and cancels the game if it's no longer viable.
    pub(crate) fn quit_game_player(
        &self,
        ctx: &mut RequestContext,
        game_id: &GameId,
        handle: &Handle,
        comment: String,
    ) -> Result<(), EngineError> {
        let became_unviable = {
            let game = ctx
                .store
                .game_mut(game_id)
                .ok_or_else(|| EngineError::Internal("game vanished".to_string()))?;
            if game.state == GameState::Advertised {
                game.game_players.retain(|gp| &gp.handle != handle);
            } else if let Some(gp) = game.game_player_mut(handle) {
                gp.state = ParticipationState::Quit;
            }
            game.mark_active(ctx.now);
            !game.is_viable()
        };

        if let Some(player_id) = ctx.store.player_id_by_handle(handle).cloned() {
            if let Some(player) = ctx.store.player_mut(&player_id) {
                player.leave_game();
            }
        }

        let remaining_humans: Vec<Handle> = ctx
            .store
            .game(game_id)
            .map(|g| {
                g.game_players
                    .iter()
                    .filter(|gp| gp.kind == PlayerType::Human && &gp.handle != handle)
                    .map(|gp| gp.handle.clone())
                    .collect()
            })
            .unwrap_or_default();
        for h in &remaining_humans {
            if let Some(t) = ctx.store.player_by_handle(h).and_then(|p| p.transport_ref) {
                ctx.queue.send(
                    t,
                    Envelope::GamePlayerChange {
                        comment: comment.clone(),
                    },
                );
            }
        }

        if became_unviable {
            self.cancel(ctx, game_id, CancelledReason::NotViable, true)?;
        }
        Ok(())
    }

    /// The connection-lifecycle disconnect sub-transition (§4.E).
    pub fn disconnect_player(
        &self,
        ctx: &mut RequestContext,
        transport: ConnectionId,
    ) -> Result<(), EngineError> {
        let player_id = match ctx.store.player_by_transport(transport) {
            Some(p) => p.player_id.clone(),
            None => return Ok(()),
        };
        let (handle, game_id) = {
            let player = ctx.store.player_mut(&player_id).unwrap();
            player.connection = ConnectionState::Disconnected;
            (player.handle.clone(), player.current_game_id.clone())
        };
        if let Some(game_id) = game_id {
            self.quit_game_player(ctx, &game_id, &handle, format!("Player {handle} disconnected"))?;
        }
        Ok(())
    }

    /// The cancel sub-transition (§4.E).
    fn cancel(
        &self,
        ctx: &mut RequestContext,
        game_id: &GameId,
        reason: CancelledReason,
        notify: bool,
    ) -> Result<(), EngineError> {
        let has_adapter = {
            let game = ctx
                .store
                .game_mut(game_id)
                .ok_or_else(|| EngineError::Internal("game vanished".to_string()))?;
            if matches!(game.state, GameState::Completed | GameState::Cancelled) {
                return Ok(());
            }
            game.cancelled_reason = Some(reason);
            game.completed_time = Some(ctx.now);
            game.state = GameState::Cancelled;
            for gp in game.game_players.iter_mut() {
                if !matches!(
                    gp.state,
                    ParticipationState::Quit | ParticipationState::Disconnected
                ) {
                    gp.state = ParticipationState::Finished;
                }
            }
            game.adapter.is_some()
        };

        if notify {
            let humans = ctx.store.game(game_id).unwrap().human_handles();
            for h in &humans {
                if let Some(t) = ctx.store.player_by_handle(h).and_then(|p| p.transport_ref) {
                    ctx.queue.send(
                        t,
                        Envelope::GameCancelled {
                            reason,
                            comment: None,
                        },
                    );
                }
            }
            if has_adapter {
                self.broadcast_state(ctx, game_id)?;
            }
        }
        Ok(())
    }

    /// The complete sub-transition (§4.E).
    fn complete(
        &self,
        ctx: &mut RequestContext,
        game_id: &GameId,
        comment: Option<String>,
    ) -> Result<(), EngineError> {
        {
            let game = ctx
                .store
                .game_mut(game_id)
                .ok_or_else(|| EngineError::Internal("game vanished".to_string()))?;
            game.completed_time = Some(ctx.now);
            game.state = GameState::Completed;
            for gp in game.game_players.iter_mut() {
                if !matches!(
                    gp.state,
                    ParticipationState::Quit | ParticipationState::Disconnected
                ) {
                    gp.state = ParticipationState::Finished;
                }
            }
            game.completed_comment = comment.clone();
        }
        let humans = ctx.store.game(game_id).unwrap().human_handles();
        for h in &humans {
            if let Some(t) = ctx.store.player_by_handle(h).and_then(|p| p.transport_ref) {
                ctx.queue.send(
                    t,
                    Envelope::GameCompleted {
                        comment: comment.clone(),
                    },
                );
            }
        }
        self.broadcast_state(ctx, game_id)
    }

    /// Emits a fresh `GameStateChange` to every human game-player, each
    /// from their own `player_view`.
    fn broadcast_state(&self, ctx: &mut RequestContext, game_id: &GameId) -> Result<(), EngineError> {
        let game = ctx
            .store
            .game(game_id)
            .ok_or_else(|| EngineError::Internal("game vanished".to_string()))?;
        let adapter = game
            .adapter
            .as_ref()
            .ok_or_else(|| EngineError::Internal("game has no rule adapter".to_string()))?;
        let entries: Vec<(Handle, serde_json::Value)> = game
            .game_players
            .iter()
            .filter(|gp| gp.kind == PlayerType::Human)
            .map(|gp| (gp.handle.clone(), adapter.player_view(&gp.handle)))
            .collect();
        for (handle, view) in entries {
            if let Some(t) = ctx.store.player_by_handle(&handle).and_then(|p| p.transport_ref) {
                ctx.queue.send(t, Envelope::GameStateChange { view });
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Timer transitions (§4.E)
    // -----------------------------------------------------------------

    /// The idle-player sweep.
    pub fn idle_player_sweep(&self, ctx: &mut RequestContext) {
        let idle_thresh = chrono::Duration::from_std(self.config.player_idle_thresh()).unwrap();
        let inactive_thresh =
            chrono::Duration::from_std(self.config.player_inactive_thresh()).unwrap();

        let snapshot: Vec<(PlayerId, Handle, DateTime<Utc>, ConnectionState, ActivityState)> = ctx
            .store
            .players()
            .map(|p| (p.player_id.clone(), p.handle.clone(), p.last_active_time, p.connection, p.activity))
            .collect();

        for (player_id, handle, last_active, connection, activity) in snapshot {
            let idle_for = ctx.now - last_active;
            let over_inactive = idle_for > inactive_thresh;
            let disconnected_and_idle =
                connection == ConnectionState::Disconnected && idle_for > idle_thresh;

            if over_inactive || disconnected_and_idle {
                if let Some(transport) = ctx.store.player(&player_id).and_then(|p| p.transport_ref) {
                    ctx.queue
                        .send(transport, Envelope::PlayerInactive { handle: handle.clone() });
                    ctx.queue.disconnect(transport);
                }
                let _ = self.unregister_player(ctx, &player_id);
            } else if idle_for > idle_thresh && activity != ActivityState::Idle {
                if let Some(transport) = ctx.store.player(&player_id).and_then(|p| p.transport_ref) {
                    ctx.queue.send(transport, Envelope::PlayerIdle { handle });
                }
                if let Some(player) = ctx.store.player_mut(&player_id) {
                    player.activity = ActivityState::Idle;
                }
            }
        }
    }

    /// The idle-game sweep.
    pub fn idle_game_sweep(&self, ctx: &mut RequestContext) {
        let idle_thresh = chrono::Duration::from_std(self.config.game_idle_thresh()).unwrap();
        let inactive_thresh = chrono::Duration::from_std(self.config.game_inactive_thresh()).unwrap();

        let snapshot: Vec<(GameId, DateTime<Utc>, ActivityState)> = ctx
            .store
            .games()
            .filter(|g| matches!(g.state, GameState::Advertised | GameState::Playing))
            .map(|g| (g.game_id.clone(), g.last_active_time, g.activity))
            .collect();

        for (game_id, last_active, activity) in snapshot {
            let idle_for = ctx.now - last_active;
            if idle_for > inactive_thresh {
                let _ = self.cancel(ctx, &game_id, CancelledReason::Inactive, true);
            } else if idle_for > idle_thresh && activity != ActivityState::Idle {
                let humans = ctx.store.game(&game_id).map(|g| g.human_handles()).unwrap_or_default();
                for h in &humans {
                    if let Some(t) = ctx.store.player_by_handle(h).and_then(|p| p.transport_ref) {
                        ctx.queue.send(t, Envelope::GameIdle);
                    }
                }
                if let Some(game) = ctx.store.game_mut(&game_id) {
                    game.activity = ActivityState::Idle;
                }
            }
        }
    }

    /// The obsolete-game sweep: deletes terminal games past
    /// `game_retention_thresh` silently (no event is ever emitted here).
    pub fn obsolete_game_sweep(&self, ctx: &mut RequestContext) {
        let retention = chrono::Duration::from_std(self.config.game_retention_thresh()).unwrap();
        let to_remove: Vec<GameId> = ctx
            .store
            .games()
            .filter(|g| matches!(g.state, GameState::Completed | GameState::Cancelled))
            .filter(|g| g.completed_time.map(|t| ctx.now - t > retention).unwrap_or(false))
            .map(|g| g.game_id.clone())
            .collect();
        for game_id in to_remove {
            ctx.store.remove_game(&game_id);
        }
    }

    /// The shutdown transition: notify every connected transport, then
    /// silently cancel every in-progress game (`notify = false`).
    pub fn shutdown(&self, ctx: &mut RequestContext) {
        let transports: Vec<ConnectionId> = ctx
            .store
            .players()
            .filter(|p| p.connection == ConnectionState::Connected)
            .filter_map(|p| p.transport_ref)
            .collect();
        for t in transports {
            ctx.queue.send(t, Envelope::ServerShutdown);
        }

        let game_ids = ctx.store.game_ids();
        for game_id in game_ids {
            let in_progress = ctx
                .store
                .game(&game_id)
                .map(|g| matches!(g.state, GameState::Advertised | GameState::Playing))
                .unwrap_or(false);
            if in_progress {
                let _ = self.cancel(ctx, &game_id, CancelledReason::Shutdown, false);
            }
        }
    }
}
