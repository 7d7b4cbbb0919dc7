//! Core types for playback management

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    /// Nothing loaded, or explicitly stopped
    #[default]
    Idle,

    /// Track is being handed to the engine
    Loading,

    /// Currently playing
    Playing,

    /// Paused mid-track (or loaded and waiting for play)
    Paused,

    /// Reached the end of the track naturally
    Ended,

    /// Load or playback failed; a new load is accepted
    Error,
}

impl PlaybackPhase {
    /// Whether a track is loaded and positioned (playing or paused)
    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    /// Stop when queue ends
    #[default]
    Off,

    /// Loop entire queue
    All,

    /// Loop current track only
    One,
}

impl RepeatMode {
    /// Next mode in the `Off -> All -> One -> Off` cycle
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }
}

/// Configuration for the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Delay between a completed load and the automatic `play()` (default: 500)
    pub autoplay_delay_ms: u64,

    /// Past this position `previous()` restarts the track instead (default: 3000)
    pub restart_threshold_ms: u64,

    /// Advance to the next queue entry when a track ends (default: true)
    pub auto_advance: bool,

    /// Initial volume, 0.0 to 1.0 (default: 1.0)
    pub volume: f32,

    /// Initial volume boost multiplier, 1.0 to 2.0 (default: 1.0)
    pub volume_boost: f32,
}

impl PlaybackConfig {
    /// Autoplay delay as a Duration
    pub fn autoplay_delay(&self) -> Duration {
        Duration::from_millis(self.autoplay_delay_ms)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            autoplay_delay_ms: 500,
            restart_threshold_ms: 3000,
            auto_advance: true,
            volume: 1.0,
            volume_boost: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_cycles_off_all_one() {
        assert_eq!(RepeatMode::Off.next(), RepeatMode::All);
        assert_eq!(RepeatMode::All.next(), RepeatMode::One);
        assert_eq!(RepeatMode::One.next(), RepeatMode::Off);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: PlaybackConfig =
            serde_json::from_str(r#"{ "autoplay_delay_ms": 0 }"#).unwrap();
        assert_eq!(config.autoplay_delay_ms, 0);
        assert_eq!(config.restart_threshold_ms, 3000);
        assert!(config.auto_advance);
    }
}
