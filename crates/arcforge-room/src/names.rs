//! Programmatic-player name pool (§4.E, §9 design notes).
//!
//! When `StartGame` needs to backfill a game to `target_player_count`,
//! it draws distinct handles for the synthesized players without
//! replacement from this fixed pool. Reuse across *different* games is
//! fine — only uniqueness within a single game matters.

use arcforge_protocol::Handle;
use rand::seq::SliceRandom;

/// Fixed pool of names available for programmatic backfill.
pub const NAME_POOL: &[&str] = &[
    "Aragorn",
    "Arwen",
    "Bilbo",
    "Boromir",
    "Elrond",
    "Éomer",
    "Éowyn",
    "Faramir",
    "Frodo",
    "Galadriel",
    "Gandalf",
    "Gimli",
    "Gollum",
    "Isildur",
    "Legolas",
    "Merry",
    "Pippen",
    "Radagast",
    "Samwise",
    "Saruman",
    "Sauron",
    "Shelob",
    "Théoden",
    "Treebeard",
];

/// Draws `count` distinct names, avoiding anything in `taken`.
///
/// # Panics
/// Panics if `count` exceeds the number of names left in the pool after
/// excluding `taken` — this can't happen in practice since the pool has
/// 24 entries and `target_player_count` is capped at 4.
pub fn draw_programmatic_names(
    count: usize,
    taken: &[Handle],
    rng: &mut impl rand::Rng,
) -> Vec<Handle> {
    let mut available: Vec<&str> = NAME_POOL
        .iter()
        .copied()
        .filter(|name| !taken.iter().any(|h| h == name))
        .collect();
    available.shuffle(rng);
    available
        .into_iter()
        .take(count)
        .map(str::to_owned)
        .collect()
}
