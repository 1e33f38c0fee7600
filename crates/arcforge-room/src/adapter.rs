//! The Game Rule Adapter — the narrow interface to an external board-game
//! rule engine (§4.D).
//!
//! Arcforge doesn't know how to play any particular game. It knows how
//! to start one, ask for a player's view of the board, ask what moves
//! are legal, and apply a move. Everything else — board representation,
//! win conditions, turn order — lives behind this trait.
//!
//! The adapter is held *inside* the `Game` record and is called only
//! from within the global critical section (§5): it must be synchronous
//! and free of side effects beyond its own state.

use arcforge_protocol::Handle;
use serde_json::Value;

/// The result of applying one move.
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    /// Whether this move ended the game.
    pub completed: bool,
    /// A human-readable summary ("X wins", "draw", …), if any.
    pub comment: Option<String>,
    /// The next player to act and their legal moves, if the game isn't
    /// over. `None` when `completed` is `true`.
    pub next_turn: Option<(Handle, Vec<String>)>,
}

/// An engine instance for exactly one game, seated and ready to play.
///
/// Implementors back this with whatever internal board representation
/// they like; everything crossing the trait boundary is either a
/// `Handle`, a move id (`String`), or an opaque [`serde_json::Value`]
/// view — the core never interprets these.
pub trait GameRuleAdapter: Send + Sync {
    /// Seats the players and sets up the initial board. `seat_assignments`
    /// is ordered: humans in join order, then the programmatic backfill.
    fn start(&mut self, target_player_count: u8, seat_assignments: &[Handle]);

    /// A serializable snapshot of the board as `handle` sees it.
    fn player_view(&self, handle: &Handle) -> Value;

    /// The moves `handle` may legally make right now.
    fn legal_moves(&self, handle: &Handle) -> Vec<String>;

    /// Whether it is currently `handle`'s turn to move.
    fn is_move_pending(&self, handle: &Handle) -> bool;

    /// Applies `move_id` on behalf of `handle`.
    ///
    /// # Panics / preconditions
    /// Callers must have already checked `is_move_pending` and that
    /// `move_id` is in `legal_moves(handle)` — this is not re-validated
    /// here (`EXECUTE_MOVE`'s precondition in §4.E).
    fn execute_move(&mut self, handle: &Handle, move_id: &str) -> MoveOutcome;
}

/// Constructs a fresh [`GameRuleAdapter`] for a newly advertised game.
///
/// Mirrors the `Authenticator` injection pattern one layer down: the
/// embedding application supplies the rule engine, Arcforge supplies the
/// session/game bookkeeping around it.
pub trait GameRuleFactory: Send + Sync + 'static {
    fn create(&self) -> Box<dyn GameRuleAdapter>;
}

impl<F> GameRuleFactory for F
where
    F: Fn() -> Box<dyn GameRuleAdapter> + Send + Sync + 'static,
{
    fn create(&self) -> Box<dyn GameRuleAdapter> {
        (self)()
    }
}
