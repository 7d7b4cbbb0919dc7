//! Observable player state and the engine merge

use crate::engine::EngineState;
use crate::types::{PlaybackPhase, RepeatMode};
use encore_core::{Lyrics, Track};
use serde::{Deserialize, Serialize};

/// A queued track together with the stream URL it was resolved to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub track: Track,
    pub stream_url: String,
}

/// Everything an observer needs to render the player
///
/// Field ownership:
///
/// | field | owner |
/// |---|---|
/// | `current_track`, `queue`, `queue_index`, `lyrics`, `lyrics_loading` | controller |
/// | `phase`, `position_ms`, `duration_ms`, `shuffle_enabled`, `repeat_mode`, `volume`, `volume_boost`, `error` | engine (once attached) |
///
/// See [`merge_engine`](Self::merge_engine).
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub current_track: Option<Track>,
    pub queue: Vec<QueueEntry>,
    pub queue_index: Option<usize>,
    pub phase: PlaybackPhase,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub shuffle_enabled: bool,
    pub repeat_mode: RepeatMode,
    pub volume: f32,
    pub volume_boost: f32,
    pub error: Option<String>,
    pub lyrics: Option<Lyrics>,
    pub lyrics_loading: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            current_track: None,
            queue: Vec::new(),
            queue_index: None,
            phase: PlaybackPhase::Idle,
            position_ms: 0,
            duration_ms: 0,
            shuffle_enabled: false,
            repeat_mode: RepeatMode::Off,
            volume: 1.0,
            volume_boost: 1.0,
            error: None,
            lyrics: None,
            lyrics_loading: false,
        }
    }
}

impl PlayerState {
    /// Overwrite the engine-owned fields with `engine`, keep the rest.
    ///
    /// Position is clamped to a known duration.
    pub fn merge_engine(&mut self, engine: &EngineState) {
        self.phase = engine.phase;
        self.duration_ms = engine.duration_ms;
        self.position_ms = if engine.duration_ms > 0 {
            engine.position_ms.min(engine.duration_ms)
        } else {
            engine.position_ms
        };
        self.shuffle_enabled = engine.shuffle_enabled;
        self.repeat_mode = engine.repeat_mode;
        self.volume = engine.volume;
        self.volume_boost = engine.volume_boost;
        self.error.clone_from(&engine.error);
    }

    /// Identifier of the current track
    pub fn current_track_id(&self) -> Option<&str> {
        self.current_track.as_ref().map(|track| track.id.as_str())
    }

    /// Position as a fraction of the duration (0.0 when unknown)
    pub fn progress(&self) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (self.position_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0)
    }

    /// Synced lyric line at the current position
    pub fn current_lyric_line(&self) -> Option<&str> {
        self.lyrics
            .as_ref()?
            .line_at(self.position_ms)
            .map(|line| line.text.as_str())
    }
}
