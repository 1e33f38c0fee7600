//! Periodic sweep scheduling for Arcforge.
//!
//! The engine runs three independent background sweeps (§4.E "Timer
//! transitions"):
//!
//! - **idle-player** — reclassifies players as `Idle`/`Inactive`, evicts
//!   players past `player_inactive_thresh`.
//! - **idle-game** — reclassifies games as `Idle`, cancels games past
//!   `game_inactive_thresh` with `CancelledReason::Inactive`.
//! - **obsolete-game** — deletes terminal games past `game_retention_thresh`.
//!
//! Each sweep has its own period (how often it repeats) and initial delay
//! (how long to wait before its first run, so sweeps with different
//! cadences don't all fire on server startup). [`SweepScheduler`] is a
//! `Send`able driver meant to sit inside the top-level server's
//! `tokio::select!` loop, one branch per sweep kind.

use std::time::Duration;

use tokio::time::{self, Instant as TokioInstant};
use tracing::debug;

/// Which periodic sweep is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepKind {
    IdlePlayer,
    IdleGame,
    ObsoleteGame,
}

/// Period and initial delay for a single sweep.
#[derive(Debug, Clone, Copy)]
pub struct SweepConfig {
    /// How often this sweep repeats, once started.
    pub period: Duration,
    /// How long to wait after scheduler creation before this sweep's
    /// first run.
    pub initial_delay: Duration,
}

impl SweepConfig {
    pub fn new(period_secs: u64, initial_delay_secs: u64) -> Self {
        Self {
            period: Duration::from_secs(period_secs),
            initial_delay: Duration::from_secs(initial_delay_secs),
        }
    }
}

/// Configuration for all three sweeps, normally built straight from the
/// server's `*_check_period_sec`/`*_check_delay_sec` config fields.
#[derive(Debug, Clone, Copy)]
pub struct SweepSchedule {
    pub idle_player: SweepConfig,
    pub idle_game: SweepConfig,
    pub obsolete_game: SweepConfig,
}

/// Drives the three sweeps independently. Each fires on its own period,
/// unrelated to the others — there is no shared "tick" or fixed frame
/// rate here, unlike a real-time game loop.
pub struct SweepScheduler {
    idle_player_next: TokioInstant,
    idle_player_period: Duration,
    idle_game_next: TokioInstant,
    idle_game_period: Duration,
    obsolete_game_next: TokioInstant,
    obsolete_game_period: Duration,
}

impl SweepScheduler {
    pub fn new(schedule: SweepSchedule) -> Self {
        let now = TokioInstant::now();
        debug!(
            idle_player_delay_s = schedule.idle_player.initial_delay.as_secs(),
            idle_game_delay_s = schedule.idle_game.initial_delay.as_secs(),
            obsolete_game_delay_s = schedule.obsolete_game.initial_delay.as_secs(),
            "sweep scheduler created"
        );
        Self {
            idle_player_next: now + schedule.idle_player.initial_delay,
            idle_player_period: schedule.idle_player.period,
            idle_game_next: now + schedule.idle_game.initial_delay,
            idle_game_period: schedule.idle_game.period,
            obsolete_game_next: now + schedule.obsolete_game.initial_delay,
            obsolete_game_period: schedule.obsolete_game.period,
        }
    }

    /// Waits until the next due sweep fires, reschedules it for
    /// `now + period`, and returns which one it was.
    ///
    /// Never returns early: if multiple sweeps are simultaneously due,
    /// one is picked (whichever `tokio::select!` wakes first) and the
    /// others remain due for the next call.
    pub async fn wait_next(&mut self) -> SweepKind {
        tokio::select! {
            _ = time::sleep_until(self.idle_player_next) => {
                let now = TokioInstant::now();
                self.idle_player_next = now + self.idle_player_period;
                SweepKind::IdlePlayer
            }
            _ = time::sleep_until(self.idle_game_next) => {
                let now = TokioInstant::now();
                self.idle_game_next = now + self.idle_game_period;
                SweepKind::IdleGame
            }
            _ = time::sleep_until(self.obsolete_game_next) => {
                let now = TokioInstant::now();
                self.obsolete_game_next = now + self.obsolete_game_period;
                SweepKind::ObsoleteGame
            }
        }
    }
}
