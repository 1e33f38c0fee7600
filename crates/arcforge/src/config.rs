//! Server configuration (§6.5).
//!
//! Loading itself — file formats, environment overlays, CLI flags — is
//! deliberately out of the core's scope (§1); this module only owns the
//! documented option set and its defaults. [`Config::load`] is the one
//! concrete loading mechanism we ship: a TOML file with every field
//! optional, falling back to the documented default.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// All recognized server options (§6.5), with their documented defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,

    pub total_game_limit: usize,
    pub in_progress_game_limit: usize,
    pub registered_player_limit: usize,

    pub player_idle_thresh_min: u64,
    pub player_inactive_thresh_min: u64,
    pub game_idle_thresh_min: u64,
    pub game_inactive_thresh_min: u64,
    pub game_retention_thresh_min: u64,

    pub idle_player_check_period_sec: u64,
    pub idle_player_check_delay_sec: u64,
    pub idle_game_check_period_sec: u64,
    pub idle_game_check_delay_sec: u64,
    pub obsolete_game_check_period_sec: u64,
    pub obsolete_game_check_delay_sec: u64,

    pub logfile_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "localhost".to_string(),
            server_port: 8080,
            total_game_limit: 1_000,
            in_progress_game_limit: 25,
            registered_player_limit: 100,
            player_idle_thresh_min: 15,
            player_inactive_thresh_min: 30,
            game_idle_thresh_min: 10,
            game_inactive_thresh_min: 20,
            game_retention_thresh_min: 2_880,
            idle_player_check_period_sec: 120,
            idle_player_check_delay_sec: 300,
            idle_game_check_period_sec: 120,
            idle_game_check_delay_sec: 300,
            obsolete_game_check_period_sec: 300,
            obsolete_game_check_delay_sec: 300,
            logfile_path: None,
        }
    }
}

/// Errors while loading configuration from disk.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(String, std::io::Error),
    #[error("failed to parse config file {0}: {1}")]
    Parse(String, toml::de::Error),
}

impl Config {
    /// Loads configuration from a TOML file. Any field absent from the
    /// file keeps its documented default (`#[serde(default)]` on every
    /// field via the struct-level attribute).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.display().to_string(), e))?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse(path.display().to_string(), e))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn player_idle_thresh(&self) -> Duration {
        Duration::from_secs(self.player_idle_thresh_min * 60)
    }

    pub fn player_inactive_thresh(&self) -> Duration {
        Duration::from_secs(self.player_inactive_thresh_min * 60)
    }

    pub fn game_idle_thresh(&self) -> Duration {
        Duration::from_secs(self.game_idle_thresh_min * 60)
    }

    pub fn game_inactive_thresh(&self) -> Duration {
        Duration::from_secs(self.game_inactive_thresh_min * 60)
    }

    pub fn game_retention_thresh(&self) -> Duration {
        Duration::from_secs(self.game_retention_thresh_min * 60)
    }

    pub fn sweep_schedule(&self) -> arcforge_tick::SweepSchedule {
        arcforge_tick::SweepSchedule {
            idle_player: arcforge_tick::SweepConfig::new(
                self.idle_player_check_period_sec,
                self.idle_player_check_delay_sec,
            ),
            idle_game: arcforge_tick::SweepConfig::new(
                self.idle_game_check_period_sec,
                self.idle_game_check_delay_sec,
            ),
            obsolete_game: arcforge_tick::SweepConfig::new(
                self.obsolete_game_check_period_sec,
                self.obsolete_game_check_delay_sec,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.player_idle_thresh_min, 15);
        assert_eq!(config.player_inactive_thresh_min, 30);
    }

    #[test]
    fn load_merges_partial_file_with_defaults() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("arcforge-test-config-{}.toml", std::process::id()));
        std::fs::write(&path, "server_port = 9000\ntotal_game_limit = 5\n").unwrap();
        let config = Config::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.server_port, 9000);
        assert_eq!(config.total_game_limit, 5);
        // Untouched fields keep their default.
        assert_eq!(config.registered_player_limit, 100);
    }
}
