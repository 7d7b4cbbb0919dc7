//! Audio engine contract
//!
//! The engine decodes and outputs audio; the controller only issues commands
//! and observes the engine's state through a watch channel.

use crate::types::{PlaybackPhase, RepeatMode};
use async_trait::async_trait;
use encore_core::Track;
use thiserror::Error;
use tokio::sync::watch;

/// Engine errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The stream could not be opened
    #[error("Failed to load stream: {0}")]
    Load(String),

    /// The engine was released and accepts no more work
    #[error("Audio engine released")]
    Released,
}

/// Engine-owned part of the player state
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    pub phase: PlaybackPhase,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub shuffle_enabled: bool,
    pub repeat_mode: RepeatMode,
    pub volume: f32,
    pub volume_boost: f32,
    pub error: Option<String>,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            phase: PlaybackPhase::Idle,
            position_ms: 0,
            duration_ms: 0,
            shuffle_enabled: false,
            repeat_mode: RepeatMode::Off,
            volume: 1.0,
            volume_boost: 1.0,
            error: None,
        }
    }
}

/// Platform audio engine
///
/// Transport commands are fire-and-forget; their effect shows up in the
/// state published through [`subscribe`](Self::subscribe). Progress is
/// published by the engine itself (roughly every 250 ms while playing).
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Open `url` for `track`; resolves once the engine has taken the stream
    async fn load(&self, track: &Track, url: &str) -> Result<(), EngineError>;

    fn play(&self);

    fn pause(&self);

    fn stop(&self);

    fn seek_to(&self, position_ms: u64);

    /// Volume in 0.0..=1.0
    fn set_volume(&self, volume: f32);

    /// Boost multiplier in 1.0..=2.0
    fn set_volume_boost(&self, boost: f32);

    fn set_shuffle_enabled(&self, enabled: bool);

    fn set_repeat_mode(&self, mode: RepeatMode);

    /// Free resources; later loads fail with [`EngineError::Released`]
    fn release(&self);

    /// Observe engine state
    fn subscribe(&self) -> watch::Receiver<EngineState>;
}
