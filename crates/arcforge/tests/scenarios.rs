//! End-to-end scenario tests driving the event engine directly through
//! `RequestContext`, without a real socket — the literal scenarios one
//! would exercise against a running server, reduced to direct calls.

use std::sync::Arc;

use arcforge::{Config, Engine, EngineError, EntityStore, RequestContext, TaskQueue};
use arcforge_protocol::{ActivityState, CancelledReason, Envelope, FailureReason, GameState, Visibility};
use arcforge_room::{GameRuleAdapter, GameRuleFactory, MoveOutcome};
use arcforge_transport::ConnectionId;
use chrono::{DateTime, Utc};

struct MockAdapter {
    order: Vec<String>,
    turn: usize,
}

impl GameRuleAdapter for MockAdapter {
    fn start(&mut self, _target_player_count: u8, seat_assignments: &[String]) {
        self.order = seat_assignments.to_vec();
        self.turn = 0;
    }

    fn player_view(&self, handle: &String) -> serde_json::Value {
        serde_json::json!({ "handle": handle })
    }

    fn legal_moves(&self, handle: &String) -> Vec<String> {
        if self.is_move_pending(handle) {
            vec!["advance".to_string()]
        } else {
            vec![]
        }
    }

    fn is_move_pending(&self, handle: &String) -> bool {
        self.order.get(self.turn) == Some(handle)
    }

    fn execute_move(&mut self, _handle: &String, _move_id: &str) -> MoveOutcome {
        self.turn = (self.turn + 1) % self.order.len().max(1);
        let next = self.order[self.turn].clone();
        MoveOutcome {
            completed: false,
            comment: None,
            next_turn: Some((next, vec!["advance".to_string()])),
        }
    }
}

struct MockFactory;

impl GameRuleFactory for MockFactory {
    fn create(&self) -> Box<dyn GameRuleAdapter> {
        Box::new(MockAdapter {
            order: vec![],
            turn: 0,
        })
    }
}

fn t(minutes: i64) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
        + chrono::Duration::minutes(minutes)
}

fn engine(config: Config) -> Engine {
    Engine::new(config, Arc::new(MockFactory))
}

fn conn(n: u64) -> ConnectionId {
    ConnectionId::new(n)
}

fn register(engine: &Engine, store: &mut EntityStore, transport: ConnectionId, handle: &str, now: DateTime<Utc>) {
    let mut queue = TaskQueue::new();
    let mut ctx = RequestContext::new(store, &mut queue, now);
    engine
        .register_player(&mut ctx, transport, handle.to_string())
        .unwrap();
}

/// S1 — Registration and duplicate.
#[test]
fn s1_registration_and_duplicate() {
    let mut config = Config::default();
    config.registered_player_limit = 2;
    let engine = engine(config);
    let mut store = EntityStore::new();

    let mut queue = TaskQueue::new();
    {
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(0));
        engine
            .register_player(&mut ctx, conn(1), "leela".to_string())
            .unwrap();
    }
    let (sends, _) = queue.drain();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].connection, conn(1));
    assert!(matches!(sends[0].envelope, Envelope::PlayerRegistered { .. }));

    let mut queue = TaskQueue::new();
    let err = {
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(0));
        engine
            .register_player(&mut ctx, conn(2), "leela".to_string())
            .unwrap_err()
    };
    assert!(matches!(err, EngineError::DuplicateUser));
    assert_eq!(err.reason(), FailureReason::DuplicateUser);

    let mut queue = TaskQueue::new();
    {
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(0));
        engine
            .register_player(&mut ctx, conn(3), "fry".to_string())
            .unwrap();
    }

    let mut queue = TaskQueue::new();
    let err = {
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(0));
        engine
            .register_player(&mut ctx, conn(4), "bender".to_string())
            .unwrap_err()
    };
    assert!(matches!(err, EngineError::UserLimitReached));
    assert_eq!(store.registered_player_count(), 2);
}

/// S2 — Public advertise / join / start.
#[test]
fn s2_public_advertise_join_start() {
    let engine = engine(Config::default());
    let mut store = EntityStore::new();
    register(&engine, &mut store, conn(1), "leela", t(0));
    register(&engine, &mut store, conn(2), "fry", t(0));
    let leela = store.player_id_by_handle("leela").unwrap().clone();
    let fry = store.player_id_by_handle("fry").unwrap().clone();

    let mut queue = TaskQueue::new();
    {
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(0));
        engine
            .advertise_game(
                &mut ctx,
                conn(1),
                &leela,
                "G".to_string(),
                "standard".to_string(),
                2,
                Visibility::Public,
                vec![],
            )
            .unwrap();
    }
    let (sends, _) = queue.drain();
    assert!(matches!(sends[0].envelope, Envelope::GameAdvertised { .. }));
    assert!(matches!(sends[1].envelope, Envelope::GameJoined { .. }));
    assert!(!sends.iter().any(|o| matches!(o.envelope, Envelope::GameInvitation { .. })));

    let game_id = store.player(&leela).unwrap().current_game_id.clone().unwrap();

    let mut queue = TaskQueue::new();
    {
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(0));
        engine.join_game(&mut ctx, conn(2), &fry, &game_id).unwrap();
    }
    let (sends, _) = queue.drain();
    assert!(sends
        .iter()
        .any(|o| o.connection == conn(2) && matches!(o.envelope, Envelope::GameJoined { .. })));
    assert_eq!(
        sends
            .iter()
            .filter(|o| matches!(o.envelope, Envelope::GameStarted { .. }))
            .count(),
        2
    );
    assert!(sends.iter().any(|o| matches!(o.envelope, Envelope::GameStateChange { .. })));
    assert!(sends.iter().any(|o| matches!(o.envelope, Envelope::GamePlayerTurn { .. })));
    assert_eq!(store.game(&game_id).unwrap().state, GameState::Playing);
}

/// S3 — Private invitation visibility.
#[test]
fn s3_private_invitation_visibility() {
    let engine = engine(Config::default());
    let mut store = EntityStore::new();
    register(&engine, &mut store, conn(1), "leela", t(0));
    register(&engine, &mut store, conn(2), "fry", t(0));
    register(&engine, &mut store, conn(3), "bender", t(0));
    let leela = store.player_id_by_handle("leela").unwrap().clone();
    let fry = store.player_id_by_handle("fry").unwrap().clone();
    let bender = store.player_id_by_handle("bender").unwrap().clone();

    let mut queue = TaskQueue::new();
    {
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(0));
        engine
            .advertise_game(
                &mut ctx,
                conn(1),
                &leela,
                "G".to_string(),
                "standard".to_string(),
                2,
                Visibility::Private,
                vec!["fry".to_string()],
            )
            .unwrap();
    }
    let (sends, _) = queue.drain();
    assert!(sends
        .iter()
        .any(|o| o.connection == conn(2) && matches!(o.envelope, Envelope::GameInvitation { .. })));
    let game_id = store.player(&leela).unwrap().current_game_id.clone().unwrap();

    let mut queue = TaskQueue::new();
    {
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(0));
        engine.list_available_games(&mut ctx, conn(3), &bender).unwrap();
    }
    let (sends, _) = queue.drain();
    match &sends[0].envelope {
        Envelope::AvailableGames { games } => assert!(games.is_empty()),
        other => panic!("unexpected envelope: {other:?}"),
    }

    let mut queue = TaskQueue::new();
    {
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(0));
        engine.list_available_games(&mut ctx, conn(2), &fry).unwrap();
    }
    let (sends, _) = queue.drain();
    match &sends[0].envelope {
        Envelope::AvailableGames { games } => assert_eq!(games.len(), 1),
        other => panic!("unexpected envelope: {other:?}"),
    }

    let mut queue = TaskQueue::new();
    let err = {
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(0));
        engine
            .join_game(&mut ctx, conn(3), &bender, &game_id)
            .unwrap_err()
    };
    assert!(matches!(err, EngineError::InvalidGame(_)));
}

/// S4 — Quit triggers non-viability cancel.
#[test]
fn s4_quit_triggers_non_viability_cancel() {
    let engine = engine(Config::default());
    let mut store = EntityStore::new();
    register(&engine, &mut store, conn(1), "leela", t(0));
    register(&engine, &mut store, conn(2), "fry", t(0));
    register(&engine, &mut store, conn(3), "bender", t(0));
    let leela = store.player_id_by_handle("leela").unwrap().clone();
    let fry = store.player_id_by_handle("fry").unwrap().clone();
    let bender = store.player_id_by_handle("bender").unwrap().clone();

    // Advertise for 4 seats: leela, fry, bender join as humans; StartGame
    // backfills exactly one programmatic player to reach the target.
    let mut queue = TaskQueue::new();
    {
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(0));
        engine
            .advertise_game(
                &mut ctx,
                conn(1),
                &leela,
                "G".to_string(),
                "standard".to_string(),
                4,
                Visibility::Public,
                vec![],
            )
            .unwrap();
    }
    let game_id = store.player(&leela).unwrap().current_game_id.clone().unwrap();

    {
        let mut queue = TaskQueue::new();
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(0));
        engine.join_game(&mut ctx, conn(2), &fry, &game_id).unwrap();
        engine.join_game(&mut ctx, conn(3), &bender, &game_id).unwrap();
        engine.start_game(&mut ctx, &leela).unwrap();
    }
    assert_eq!(store.game(&game_id).unwrap().state, GameState::Playing);
    assert_eq!(store.game(&game_id).unwrap().game_players.len(), 4);

    // Fry quits: three playable remain (leela, bender, the programmatic).
    {
        let mut queue = TaskQueue::new();
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(0));
        engine.quit_game(&mut ctx, &fry).unwrap();
    }
    assert_eq!(store.game(&game_id).unwrap().state, GameState::Playing);

    // Bender quits: two playable remain (leela, the programmatic) — still viable.
    {
        let mut queue = TaskQueue::new();
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(0));
        engine.quit_game(&mut ctx, &bender).unwrap();
    }
    assert_eq!(store.game(&game_id).unwrap().state, GameState::Playing);

    // The advertiser cancels explicitly.
    let mut queue = TaskQueue::new();
    {
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(0));
        engine.cancel_game(&mut ctx, &leela).unwrap();
    }
    let (sends, _) = queue.drain();
    assert!(sends.iter().any(|o| matches!(
        o.envelope,
        Envelope::GameCancelled {
            reason: CancelledReason::Cancelled,
            ..
        }
    )));
    assert_eq!(store.game(&game_id).unwrap().state, GameState::Cancelled);
}

/// S5 — Idle to inactive eviction.
#[test]
fn s5_idle_to_inactive_eviction() {
    let mut config = Config::default();
    config.player_idle_thresh_min = 10;
    config.player_inactive_thresh_min = 20;
    let engine = engine(config);
    let mut store = EntityStore::new();
    register(&engine, &mut store, conn(1), "leela", t(0));
    let leela = store.player_id_by_handle("leela").unwrap().clone();

    let mut queue = TaskQueue::new();
    {
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(10) + chrono::Duration::seconds(1));
        engine.idle_player_sweep(&mut ctx);
    }
    let (sends, _) = queue.drain();
    assert!(sends.iter().any(|o| matches!(o.envelope, Envelope::PlayerIdle { .. })));
    assert_eq!(store.player(&leela).unwrap().activity, ActivityState::Idle);

    let mut queue = TaskQueue::new();
    {
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(20) + chrono::Duration::seconds(1));
        engine.idle_player_sweep(&mut ctx);
    }
    let (sends, disconnects) = queue.drain();
    assert!(sends.iter().any(|o| matches!(o.envelope, Envelope::PlayerInactive { .. })));
    assert_eq!(disconnects, vec![conn(1)]);
    assert!(store.player(&leela).is_none());
}

/// S6 — Shutdown.
#[test]
fn s6_shutdown() {
    let engine = engine(Config::default());
    let mut store = EntityStore::new();
    register(&engine, &mut store, conn(1), "leela", t(0));
    register(&engine, &mut store, conn(2), "fry", t(0));
    register(&engine, &mut store, conn(3), "bender", t(0));
    let leela = store.player_id_by_handle("leela").unwrap().clone();
    let fry = store.player_id_by_handle("fry").unwrap().clone();

    let game_id = {
        let mut queue = TaskQueue::new();
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(0));
        engine
            .advertise_game(
                &mut ctx,
                conn(1),
                &leela,
                "G".to_string(),
                "standard".to_string(),
                2,
                Visibility::Public,
                vec![],
            )
            .unwrap();
        let game_id = ctx.store.player(&leela).unwrap().current_game_id.clone().unwrap();
        engine.join_game(&mut ctx, conn(2), &fry, &game_id).unwrap();
        game_id
    };
    assert_eq!(store.game(&game_id).unwrap().state, GameState::Playing);

    let mut queue = TaskQueue::new();
    {
        let mut ctx = RequestContext::new(&mut store, &mut queue, t(0));
        engine.shutdown(&mut ctx);
    }
    let (sends, _) = queue.drain();
    assert_eq!(
        sends
            .iter()
            .filter(|o| matches!(o.envelope, Envelope::ServerShutdown))
            .count(),
        3
    );
    assert!(!sends.iter().any(|o| matches!(o.envelope, Envelope::GameCancelled { .. })));
    assert_eq!(
        store.game(&game_id).unwrap().cancelled_reason,
        Some(CancelledReason::Shutdown)
    );
}
