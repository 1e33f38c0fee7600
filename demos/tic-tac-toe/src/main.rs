//! A minimal [`GameRuleAdapter`] implementation: standard 3x3 tic-tac-toe
//! for exactly two players, plugged into an Arcforge server.
//!
//! Everything outside this file — registration, advertising, joining,
//! turn order against disconnects, idle sweeps — is Arcforge's job. This
//! adapter only knows the board.

use std::path::PathBuf;

use arcforge::prelude::*;
use clap::Parser;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    Empty,
    X,
    O,
}

impl Cell {
    fn as_str(self) -> &'static str {
        match self {
            Cell::Empty => ".",
            Cell::X => "X",
            Cell::O => "O",
        }
    }
}

struct TicTacToe {
    board: [[Cell; 3]; 3],
    seats: Vec<Handle>,
    turn: usize,
    winner: Option<usize>,
    draw: bool,
}

impl TicTacToe {
    fn new() -> Self {
        Self {
            board: [[Cell::Empty; 3]; 3],
            seats: Vec::new(),
            turn: 0,
            winner: None,
            draw: false,
        }
    }

    fn mark_for_seat(seat: usize) -> Cell {
        if seat == 0 { Cell::X } else { Cell::O }
    }

    fn seat_of(&self, handle: &Handle) -> Option<usize> {
        self.seats.iter().position(|h| h == handle)
    }

    fn parse_move(move_id: &str) -> Option<(usize, usize)> {
        let (row, col) = move_id.split_once(',')?;
        let row: usize = row.trim().parse().ok()?;
        let col: usize = col.trim().parse().ok()?;
        (row < 3 && col < 3).then_some((row, col))
    }

    fn wins(&self, mark: Cell) -> bool {
        (0..3).any(|r| (0..3).all(|c| self.board[r][c] == mark))
            || (0..3).any(|c| (0..3).all(|r| self.board[r][c] == mark))
            || (0..3).all(|i| self.board[i][i] == mark)
            || (0..3).all(|i| self.board[i][2 - i] == mark)
    }

    fn board_full(&self) -> bool {
        self.board.iter().flatten().all(|c| *c != Cell::Empty)
    }
}

impl GameRuleAdapter for TicTacToe {
    fn start(&mut self, _target_player_count: u8, seat_assignments: &[Handle]) {
        self.seats = seat_assignments.to_vec();
        self.turn = 0;
    }

    fn player_view(&self, handle: &Handle) -> serde_json::Value {
        let board: Vec<Vec<&str>> = self
            .board
            .iter()
            .map(|row| row.iter().map(|c| c.as_str()).collect())
            .collect();
        json!({
            "board": board,
            "your_mark": self.seat_of(handle).map(|seat| Self::mark_for_seat(seat).as_str()),
            "turn": self.seats.get(self.turn),
            "winner": self.winner.and_then(|seat| self.seats.get(seat)),
            "draw": self.draw,
        })
    }

    fn legal_moves(&self, handle: &Handle) -> Vec<String> {
        if !self.is_move_pending(handle) {
            return Vec::new();
        }
        (0..3)
            .flat_map(|row| (0..3).map(move |col| (row, col)))
            .filter(|(row, col)| self.board[*row][*col] == Cell::Empty)
            .map(|(row, col)| format!("{row},{col}"))
            .collect()
    }

    fn is_move_pending(&self, handle: &Handle) -> bool {
        self.winner.is_none() && !self.draw && self.seats.get(self.turn) == Some(handle)
    }

    fn execute_move(&mut self, handle: &Handle, move_id: &str) -> MoveOutcome {
        let Some((row, col)) = Self::parse_move(move_id) else {
            return MoveOutcome {
                completed: false,
                comment: None,
                next_turn: Some((handle.clone(), self.legal_moves(handle))),
            };
        };

        let mark = Self::mark_for_seat(self.turn);
        self.board[row][col] = mark;

        if self.wins(mark) {
            self.winner = Some(self.turn);
            return MoveOutcome {
                completed: true,
                comment: Some(format!("{mark:?} wins")),
                next_turn: None,
            };
        }
        if self.board_full() {
            self.draw = true;
            return MoveOutcome {
                completed: true,
                comment: Some("draw".to_string()),
                next_turn: None,
            };
        }

        self.turn = 1 - self.turn;
        let next = self.seats[self.turn].clone();
        let moves = self.legal_moves(&next);
        MoveOutcome {
            completed: false,
            comment: None,
            next_turn: Some((next, moves)),
        }
    }
}

struct TicTacToeFactory;

impl GameRuleFactory for TicTacToeFactory {
    fn create(&self) -> Box<dyn GameRuleAdapter> {
        Box::new(TicTacToe::new())
    }
}

/// Runs an Arcforge server hosting tic-tac-toe.
#[derive(Parser)]
#[command(about = "Arcforge demo server running tic-tac-toe")]
struct Args {
    /// Path to a TOML config file; falls back to documented defaults if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the bind address from the config file ("host:port").
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut builder = match &args.config {
        Some(path) => ArcforgeServer::builder().config_file(path)?,
        None => ArcforgeServer::builder().config(Config::default()),
    };
    if let Some(bind) = args.bind {
        builder = builder.bind(bind);
    }

    let server = builder.build(TicTacToeFactory).await?;
    tracing::info!(addr = ?server.local_addr()?, "tic-tac-toe demo listening");
    server.run(shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seated() -> TicTacToe {
        let mut game = TicTacToe::new();
        game.start(2, &["alice".to_string(), "bob".to_string()]);
        game
    }

    #[test]
    fn first_turn_belongs_to_the_first_seat() {
        let game = seated();
        assert!(game.is_move_pending(&"alice".to_string()));
        assert!(!game.is_move_pending(&"bob".to_string()));
        assert_eq!(game.legal_moves(&"alice".to_string()).len(), 9);
    }

    #[test]
    fn occupied_cells_are_not_legal_moves() {
        let mut game = seated();
        game.execute_move(&"alice".to_string(), "0,0");
        assert!(!game.legal_moves(&"bob".to_string()).contains(&"0,0".to_string()));
    }

    #[test]
    fn unparsable_move_id_keeps_the_turn_with_the_same_player() {
        let mut game = seated();
        let outcome = game.execute_move(&"alice".to_string(), "nonsense");
        assert!(!outcome.completed);
        let (next, _) = outcome.next_turn.unwrap();
        assert_eq!(next, "alice");
    }

    #[test]
    fn top_row_wins_for_the_first_seat() {
        let mut game = seated();
        game.execute_move(&"alice".to_string(), "0,0"); // X
        game.execute_move(&"bob".to_string(), "1,0"); // O
        game.execute_move(&"alice".to_string(), "0,1"); // X
        game.execute_move(&"bob".to_string(), "1,1"); // O
        let outcome = game.execute_move(&"alice".to_string(), "0,2"); // X wins
        assert!(outcome.completed);
        assert!(outcome.next_turn.is_none());
        assert!(!game.is_move_pending(&"alice".to_string()));
    }

    #[test]
    fn diagonal_win_is_detected() {
        let mut game = seated();
        game.execute_move(&"alice".to_string(), "0,0"); // X
        game.execute_move(&"bob".to_string(), "0,1"); // O
        game.execute_move(&"alice".to_string(), "1,1"); // X
        game.execute_move(&"bob".to_string(), "1,0"); // O
        let outcome = game.execute_move(&"alice".to_string(), "2,2"); // X wins
        assert!(outcome.completed);
        assert_eq!(outcome.comment.unwrap(), "X wins");
    }

    #[test]
    fn full_board_without_a_line_is_a_draw() {
        let mut game = seated();
        let moves = ["0,0", "0,1", "0,2", "1,1", "1,0", "1,2", "2,1", "2,0", "2,2"];
        // X O X
        // O O X
        // X X O  -- no winner, board fills on the last move
        let mut outcome = None;
        for (i, mv) in moves.iter().enumerate() {
            let handle = if i % 2 == 0 { "alice" } else { "bob" }.to_string();
            outcome = Some(game.execute_move(&handle, mv));
        }
        let outcome = outcome.unwrap();
        assert!(outcome.completed);
        assert_eq!(outcome.comment.unwrap(), "draw");
    }

    #[test]
    fn player_view_reports_the_mark_and_whose_turn_it_is() {
        let game = seated();
        let view = game.player_view(&"alice".to_string());
        assert_eq!(view["your_mark"], json!("X"));
        assert_eq!(view["turn"], json!("alice"));
        assert_eq!(view["draw"], json!(false));
    }

    // -----------------------------------------------------------------
    // Full server tests over real WebSocket sockets — registration,
    // advertising, auto-start on the second join, and play to a win.
    // -----------------------------------------------------------------

    use arcforge_protocol::Visibility;
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::Message;

    type Ws = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

    async fn start() -> String {
        let server = ArcforgeServer::builder()
            .bind("127.0.0.1:0")
            .build(TicTacToeFactory)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap().to_string();
        tokio::spawn(server.run(std::future::pending()));
        tokio::time::sleep(Duration::from_millis(10)).await;
        addr
    }

    async fn ws(addr: &str) -> Ws {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();
        ws
    }

    async fn send(ws: &mut Ws, envelope: Envelope) {
        let bytes = serde_json::to_vec(&envelope).unwrap();
        ws.send(Message::Binary(bytes.into())).await.unwrap();
    }

    async fn recv(ws: &mut Ws) -> Envelope {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout")
            .unwrap()
            .unwrap();
        serde_json::from_slice(&msg.into_data()).unwrap()
    }

    /// Reads frames until one matches `pred`, discarding the rest (the
    /// handshake cascade interleaves several envelope kinds).
    async fn recv_until(ws: &mut Ws, pred: impl Fn(&Envelope) -> bool) -> Envelope {
        for _ in 0..20 {
            let envelope = recv(ws).await;
            if pred(&envelope) {
                return envelope;
            }
        }
        panic!("expected envelope did not arrive within 20 frames");
    }

    #[tokio::test]
    async fn two_players_register_advertise_join_and_play_to_a_win() {
        let addr = start().await;
        let mut alice = ws(&addr).await;
        let mut bob = ws(&addr).await;

        send(&mut alice, Envelope::RegisterPlayer { handle: "alice".to_string() }).await;
        assert!(matches!(recv(&mut alice).await, Envelope::PlayerRegistered { .. }));

        send(&mut bob, Envelope::RegisterPlayer { handle: "bob".to_string() }).await;
        assert!(matches!(recv(&mut bob).await, Envelope::PlayerRegistered { .. }));

        send(
            &mut alice,
            Envelope::AdvertiseGame {
                name: "friendly".to_string(),
                mode: "standard".to_string(),
                players: 2,
                visibility: Visibility::Public,
                invited_handles: vec![],
            },
        )
        .await;
        let game_id = match recv(&mut alice).await {
            Envelope::GameAdvertised { game_id } => game_id,
            other => panic!("expected GameAdvertised, got {other:?}"),
        };
        assert!(matches!(recv(&mut alice).await, Envelope::GameJoined { .. }));

        send(&mut bob, Envelope::JoinGame { game_id }).await;
        assert!(matches!(recv(&mut bob).await, Envelope::GameJoined { .. }));

        // The second join fills the game, which auto-starts: both
        // sockets see GameStarted and a state broadcast; only alice
        // (seated first, playing X) gets GamePlayerTurn.
        recv_until(&mut alice, |e| matches!(e, Envelope::GameStarted { .. })).await;
        recv_until(&mut bob, |e| matches!(e, Envelope::GameStarted { .. })).await;
        recv_until(&mut alice, |e| matches!(e, Envelope::GamePlayerTurn { .. })).await;

        // X: top row. O: middle row. X wins on (0,2).
        for (player, move_id) in [
            (&mut alice, "0,0"),
            (&mut bob, "1,0"),
            (&mut alice, "0,1"),
            (&mut bob, "1,1"),
        ] {
            send(player, Envelope::ExecuteMove { move_id: move_id.to_string() }).await;
            recv_until(player, |e| matches!(e, Envelope::GameStateChange { .. })).await;
        }

        send(&mut alice, Envelope::ExecuteMove { move_id: "0,2".to_string() }).await;
        let completed = recv_until(&mut alice, |e| matches!(e, Envelope::GameCompleted { .. })).await;
        assert!(matches!(
            completed,
            Envelope::GameCompleted { comment: Some(ref c) } if c.contains("X wins")
        ));
        recv_until(&mut bob, |e| matches!(e, Envelope::GameCompleted { .. })).await;
    }
}
