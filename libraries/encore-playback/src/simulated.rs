//! Headless audio engine
//!
//! Advances a virtual playhead on the tokio clock instead of decoding audio.
//! Used by the command-line player and by tests; honours every command of the
//! [`AudioEngine`] contract including repeat-one looping.

use crate::engine::{AudioEngine, EngineError, EngineState};
use crate::types::{PlaybackPhase, RepeatMode};
use async_trait::async_trait;
use encore_core::Track;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Default progress tick
const DEFAULT_TICK: Duration = Duration::from_millis(250);

/// Headless engine that plays silence in real (tokio) time
pub struct SimulatedEngine {
    shared: Arc<Shared>,
}

struct Shared {
    state: watch::Sender<EngineState>,
    tick: Duration,
    control: Mutex<Control>,
}

#[derive(Default)]
struct Control {
    loaded_url: Option<String>,
    ticker: Option<JoinHandle<()>>,
    released: bool,
}

impl SimulatedEngine {
    /// Engine publishing progress every 250 ms
    pub fn new() -> Self {
        Self::with_tick(DEFAULT_TICK)
    }

    /// Engine publishing progress every `tick`
    pub fn with_tick(tick: Duration) -> Self {
        let (state, _) = watch::channel(EngineState::default());
        Self {
            shared: Arc::new(Shared {
                state,
                tick,
                control: Mutex::new(Control::default()),
            }),
        }
    }

    /// Current engine state
    pub fn state(&self) -> EngineState {
        self.shared.state.borrow().clone()
    }

    /// URL of the loaded stream
    pub fn loaded_url(&self) -> Option<String> {
        self.shared.control().loaded_url.clone()
    }

    /// Simulate a decoder failure on the current stream
    pub fn report_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.shared.state.send_modify(|state| {
            state.phase = PlaybackPhase::Error;
            state.error = Some(message);
        });
    }

    fn ensure_ticker(&self) {
        let mut control = self.shared.control();
        if control.ticker.is_some() || control.released {
            return;
        }

        let weak = Arc::downgrade(&self.shared);
        let tick = self.shared.tick;
        control.ticker = Some(tokio::spawn(run_ticker(weak, tick)));
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SimulatedEngine {
    fn drop(&mut self) {
        if let Some(ticker) = self.shared.control().ticker.take() {
            ticker.abort();
        }
    }
}

impl Shared {
    fn control(&self) -> std::sync::MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the playhead by one tick
    fn advance(&self, tick: Duration) {
        let step = tick.as_millis() as u64;
        self.state.send_if_modified(|state| {
            if state.phase != PlaybackPhase::Playing {
                return false;
            }

            state.position_ms += step;
            if state.duration_ms > 0 && state.position_ms >= state.duration_ms {
                if state.repeat_mode == RepeatMode::One {
                    state.position_ms = 0;
                } else {
                    state.position_ms = state.duration_ms;
                    state.phase = PlaybackPhase::Ended;
                }
            }
            true
        });
    }
}

async fn run_ticker(shared: Weak<Shared>, tick: Duration) {
    let mut interval = tokio::time::interval(tick);
    interval.tick().await;
    loop {
        interval.tick().await;
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.advance(tick);
    }
}

#[async_trait]
impl AudioEngine for SimulatedEngine {
    async fn load(&self, track: &Track, url: &str) -> Result<(), EngineError> {
        {
            let mut control = self.shared.control();
            if control.released {
                return Err(EngineError::Released);
            }
            if url.trim().is_empty() {
                drop(control);
                let message = format!("empty stream URL for '{}'", track.title);
                self.report_error(message.clone());
                return Err(EngineError::Load(message));
            }
            control.loaded_url = Some(url.to_string());
        }

        info!(track_id = %track.id, url = %url, "Simulated engine loaded stream");
        self.shared.state.send_modify(|state| {
            state.phase = PlaybackPhase::Paused;
            state.position_ms = 0;
            state.duration_ms = track.duration_ms;
            state.error = None;
        });
        self.ensure_ticker();
        Ok(())
    }

    fn play(&self) {
        if self.shared.control().loaded_url.is_none() {
            debug!("play() ignored, nothing loaded");
            return;
        }
        self.shared.state.send_if_modified(|state| {
            if state.phase == PlaybackPhase::Playing {
                return false;
            }
            if state.phase == PlaybackPhase::Ended {
                state.position_ms = 0;
            }
            state.phase = PlaybackPhase::Playing;
            state.error = None;
            true
        });
    }

    fn pause(&self) {
        self.shared.state.send_if_modified(|state| {
            if state.phase != PlaybackPhase::Playing {
                return false;
            }
            state.phase = PlaybackPhase::Paused;
            true
        });
    }

    fn stop(&self) {
        self.shared.state.send_modify(|state| {
            state.phase = PlaybackPhase::Idle;
            state.position_ms = 0;
        });
    }

    fn seek_to(&self, position_ms: u64) {
        self.shared.state.send_modify(|state| {
            state.position_ms = if state.duration_ms > 0 {
                position_ms.min(state.duration_ms)
            } else {
                position_ms
            };
            if state.phase == PlaybackPhase::Ended && state.position_ms < state.duration_ms {
                state.phase = PlaybackPhase::Paused;
            }
        });
    }

    fn set_volume(&self, volume: f32) {
        self.shared
            .state
            .send_modify(|state| state.volume = volume.clamp(0.0, 1.0));
    }

    fn set_volume_boost(&self, boost: f32) {
        self.shared
            .state
            .send_modify(|state| state.volume_boost = boost.clamp(1.0, 2.0));
    }

    fn set_shuffle_enabled(&self, enabled: bool) {
        self.shared
            .state
            .send_modify(|state| state.shuffle_enabled = enabled);
    }

    fn set_repeat_mode(&self, mode: RepeatMode) {
        self.shared.state.send_modify(|state| state.repeat_mode = mode);
    }

    fn release(&self) {
        {
            let mut control = self.shared.control();
            control.released = true;
            control.loaded_url = None;
            if let Some(ticker) = control.ticker.take() {
                ticker.abort();
            }
        }
        self.shared.state.send_modify(|state| {
            state.phase = PlaybackPhase::Idle;
            state.position_ms = 0;
        });
        info!("Simulated engine released");
    }

    fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.shared.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_core::TrackSource;

    fn track(duration_ms: u64) -> Track {
        Track::new("sim", "Simulated", "Nobody", duration_ms, TrackSource::Local)
    }

    #[tokio::test(start_paused = true)]
    async fn plays_to_the_end() {
        let engine = SimulatedEngine::new();
        engine.load(&track(1_000), "sim://one").await.unwrap();
        assert_eq!(engine.state().phase, PlaybackPhase::Paused);

        engine.play();
        tokio::time::sleep(Duration::from_millis(600)).await;
        let state = engine.state();
        assert_eq!(state.phase, PlaybackPhase::Playing);
        assert_eq!(state.position_ms, 500);

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        let state = engine.state();
        assert_eq!(state.phase, PlaybackPhase::Ended);
        assert_eq!(state.position_ms, 1_000);
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_one_loops() {
        let engine = SimulatedEngine::new();
        engine.set_repeat_mode(RepeatMode::One);
        engine.load(&track(1_000), "sim://loop").await.unwrap();
        engine.play();

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        let state = engine.state();
        assert_eq!(state.phase, PlaybackPhase::Playing);
        assert!(state.position_ms < 1_000);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_the_playhead() {
        let engine = SimulatedEngine::new();
        engine.load(&track(10_000), "sim://pause").await.unwrap();
        engine.play();
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        engine.pause();
        let at_pause = engine.state().position_ms;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(engine.state().position_ms, at_pause);
    }

    #[tokio::test(start_paused = true)]
    async fn seek_clamps_and_leaves_ended() {
        let engine = SimulatedEngine::new();
        engine.load(&track(1_000), "sim://seek").await.unwrap();
        engine.seek_to(5_000);
        assert_eq!(engine.state().position_ms, 1_000);

        engine.play();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(engine.state().phase, PlaybackPhase::Ended);

        engine.seek_to(200);
        assert_eq!(engine.state().phase, PlaybackPhase::Paused);
    }

    #[tokio::test]
    async fn empty_url_is_a_load_error() {
        let engine = SimulatedEngine::new();
        let err = engine.load(&track(1_000), " ").await.unwrap_err();
        assert!(matches!(err, EngineError::Load(_)));
        assert_eq!(engine.state().phase, PlaybackPhase::Error);
    }

    #[tokio::test]
    async fn released_engine_refuses_loads() {
        let engine = SimulatedEngine::new();
        engine.release();
        let err = engine.load(&track(1_000), "sim://late").await.unwrap_err();
        assert_eq!(err, EngineError::Released);
    }

    #[tokio::test]
    async fn volume_is_clamped() {
        let engine = SimulatedEngine::new();
        engine.set_volume(1.7);
        engine.set_volume_boost(0.5);
        let state = engine.state();
        assert_eq!(state.volume, 1.0);
        assert_eq!(state.volume_boost, 1.0);
    }
}
