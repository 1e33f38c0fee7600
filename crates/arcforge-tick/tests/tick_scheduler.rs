//! Integration tests for the sweep scheduler.
//!
//! Uses `#[tokio::test(start_paused = true)]` so `sleep_until` resolves
//! instantly as the paused clock auto-advances to the next due timer.

use arcforge_tick::{SweepConfig, SweepKind, SweepSchedule, SweepScheduler};

// =========================================================================
// Helpers
// =========================================================================

fn schedule(
    idle_player: (u64, u64),
    idle_game: (u64, u64),
    obsolete_game: (u64, u64),
) -> SweepSchedule {
    SweepSchedule {
        idle_player: SweepConfig::new(idle_player.0, idle_player.1),
        idle_game: SweepConfig::new(idle_game.0, idle_game.1),
        obsolete_game: SweepConfig::new(obsolete_game.0, obsolete_game.1),
    }
}

// =========================================================================
// Ordering across sweeps
// =========================================================================

#[tokio::test(start_paused = true)]
async fn fires_shortest_delay_first() {
    let mut scheduler = SweepScheduler::new(schedule((60, 1), (60, 10), (60, 20)));
    let kind = scheduler.wait_next().await;
    assert_eq!(kind, SweepKind::IdlePlayer);
}

#[tokio::test(start_paused = true)]
async fn independent_sweeps_interleave() {
    let mut scheduler = SweepScheduler::new(schedule((10, 0), (10, 5), (1_000, 1_000)));
    assert_eq!(scheduler.wait_next().await, SweepKind::IdlePlayer);
    assert_eq!(scheduler.wait_next().await, SweepKind::IdleGame);
    assert_eq!(scheduler.wait_next().await, SweepKind::IdlePlayer);
}

// =========================================================================
// Rescheduling
// =========================================================================

#[tokio::test(start_paused = true)]
async fn reschedules_at_its_own_period() {
    let mut scheduler = SweepScheduler::new(schedule((5, 0), (1_000, 1_000), (1_000, 1_000)));
    assert_eq!(scheduler.wait_next().await, SweepKind::IdlePlayer);
    assert_eq!(scheduler.wait_next().await, SweepKind::IdlePlayer);
}

#[tokio::test(start_paused = true)]
async fn one_sweep_firing_does_not_reschedule_the_others() {
    // idle_player: period 5, due at t=0,5,10,15,...
    // idle_game: period 1000, due once at t=12, then t=1012.
    let mut scheduler = SweepScheduler::new(schedule((5, 0), (1_000, 12), (1_000, 1_000)));
    assert_eq!(scheduler.wait_next().await, SweepKind::IdlePlayer); // t=0
    assert_eq!(scheduler.wait_next().await, SweepKind::IdlePlayer); // t=5
    assert_eq!(scheduler.wait_next().await, SweepKind::IdlePlayer); // t=10
    assert_eq!(scheduler.wait_next().await, SweepKind::IdleGame); // t=12
    assert_eq!(scheduler.wait_next().await, SweepKind::IdlePlayer); // t=15
}
