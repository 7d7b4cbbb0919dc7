//! Shared test doubles for the playback integration tests.

use async_trait::async_trait;
use encore_core::{
    Lyrics, LyricsError, LyricsProvider, ProviderError, ScrobbleSink, SinkError, StreamInfo,
    StreamProvider, SyncedLine, Track, TrackSource,
};
use encore_playback::{
    AudioEngine, EngineError, EngineState, PlaybackController, PlaybackPhase, PlayerState,
    RepeatMode,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

// =============================================================================
// Fixtures
// =============================================================================

pub fn create_test_track(id: &str) -> Track {
    Track::new(
        id,
        format!("Track {id}"),
        "Test Artist",
        180_000,
        TrackSource::Piped,
    )
}

pub fn url(id: &str) -> String {
    format!("https://stream.example/{id}")
}

/// Wait (on the tokio clock) until the player state satisfies `ready`
pub async fn wait_for_state(
    controller: &PlaybackController,
    ready: impl FnMut(&PlayerState) -> bool,
) -> PlayerState {
    let mut updates = controller.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(5), updates.wait_for(ready))
        .await
        .expect("timed out waiting for player state")
        .expect("controller dropped")
        .clone();
    state
}

/// Give spawned tasks a chance to run
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

// =============================================================================
// Manual engine
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Load(String, String),
    Play,
    Pause,
    Stop,
    Seek(u64),
    Volume(f32),
    Boost(f32),
    Shuffle(bool),
    Repeat(RepeatMode),
    Release,
}

/// Engine driven by the test: it applies commands instantly and publishes
/// progress only through [`ManualEngine::emit`].
pub struct ManualEngine {
    state: watch::Sender<EngineState>,
    calls: Mutex<Vec<EngineCall>>,
    load_delay: Option<Duration>,
    fail_loads: bool,
}

impl ManualEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(None, false))
    }

    pub fn with_load_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(Some(delay), false))
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self::build(None, true))
    }

    fn build(load_delay: Option<Duration>, fail_loads: bool) -> Self {
        let (state, _) = watch::channel(EngineState::default());
        Self {
            state,
            calls: Mutex::new(Vec::new()),
            load_delay,
            fail_loads,
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn play_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == EngineCall::Play)
            .count()
    }

    pub fn loaded_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::Load(id, _) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Publish an engine-side change
    pub fn emit(&self, change: impl FnOnce(&mut EngineState)) {
        self.state.send_modify(change);
    }

    /// Report natural completion of the loaded track
    pub fn finish(&self) {
        self.emit(|state| {
            state.phase = PlaybackPhase::Ended;
            state.position_ms = state.duration_ms;
        });
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AudioEngine for ManualEngine {
    async fn load(&self, track: &Track, url: &str) -> Result<(), EngineError> {
        self.record(EngineCall::Load(track.id.clone(), url.to_string()));
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_loads {
            let message = format!("cannot open {url}");
            let reported = message.clone();
            self.emit(|state| {
                state.phase = PlaybackPhase::Error;
                state.error = Some(reported);
            });
            return Err(EngineError::Load(message));
        }

        let duration_ms = track.duration_ms;
        self.emit(|state| {
            state.phase = PlaybackPhase::Paused;
            state.position_ms = 0;
            state.duration_ms = duration_ms;
            state.error = None;
        });
        Ok(())
    }

    fn play(&self) {
        self.record(EngineCall::Play);
        self.emit(|state| state.phase = PlaybackPhase::Playing);
    }

    fn pause(&self) {
        self.record(EngineCall::Pause);
        self.emit(|state| state.phase = PlaybackPhase::Paused);
    }

    fn stop(&self) {
        self.record(EngineCall::Stop);
        self.emit(|state| {
            state.phase = PlaybackPhase::Idle;
            state.position_ms = 0;
        });
    }

    fn seek_to(&self, position_ms: u64) {
        self.record(EngineCall::Seek(position_ms));
        self.emit(|state| state.position_ms = position_ms);
    }

    fn set_volume(&self, volume: f32) {
        self.record(EngineCall::Volume(volume));
        self.emit(|state| state.volume = volume);
    }

    fn set_volume_boost(&self, boost: f32) {
        self.record(EngineCall::Boost(boost));
        self.emit(|state| state.volume_boost = boost);
    }

    fn set_shuffle_enabled(&self, enabled: bool) {
        self.record(EngineCall::Shuffle(enabled));
        self.emit(|state| state.shuffle_enabled = enabled);
    }

    fn set_repeat_mode(&self, mode: RepeatMode) {
        self.record(EngineCall::Repeat(mode));
        self.emit(|state| state.repeat_mode = mode);
    }

    fn release(&self) {
        self.record(EngineCall::Release);
        self.emit(|state| state.phase = PlaybackPhase::Idle);
    }

    fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }
}

// =============================================================================
// Scripted stream provider
// =============================================================================

#[derive(Default)]
pub struct ScriptedProvider {
    name: String,
    source: Option<TrackSource>,
    search_results: Vec<Track>,
    streams: HashMap<String, String>,
    stream_delay: Duration,
}

impl ScriptedProvider {
    pub fn new(name: &str, source: TrackSource) -> Self {
        Self {
            name: name.to_string(),
            source: Some(source),
            ..Default::default()
        }
    }

    pub fn with_search(mut self, tracks: Vec<Track>) -> Self {
        self.search_results = tracks;
        self
    }

    pub fn with_stream(mut self, id: &str, url: &str) -> Self {
        self.streams.insert(id.to_string(), url.to_string());
        self
    }

    /// Answer stream lookups only after `delay`
    pub fn with_stream_delay(mut self, delay: Duration) -> Self {
        self.stream_delay = delay;
        self
    }
}

#[async_trait]
impl StreamProvider for ScriptedProvider {
    fn source(&self) -> TrackSource {
        self.source.unwrap_or(TrackSource::Local)
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<Track>, ProviderError> {
        Ok(self.search_results.iter().take(limit).cloned().collect())
    }

    async fn get_stream(&self, track_id: &str) -> Result<StreamInfo, ProviderError> {
        if !self.stream_delay.is_zero() {
            tokio::time::sleep(self.stream_delay).await;
        }
        self.streams
            .get(track_id)
            .map(|url| StreamInfo::new(track_id, url.clone(), self.source()))
            .ok_or_else(|| ProviderError::transport(format!("{track_id} is geo-blocked")))
    }

    async fn get_track_info(&self, track_id: &str) -> Result<Track, ProviderError> {
        Err(ProviderError::NotFound {
            provider: self.source(),
            id: track_id.to_string(),
        })
    }
}

// =============================================================================
// Lyrics
// =============================================================================

pub fn synced_lyrics(title: &str) -> Lyrics {
    Lyrics {
        track_title: title.to_string(),
        artist: "Test Artist".to_string(),
        plain_text: "first\nsecond".to_string(),
        synced: Some(vec![
            SyncedLine {
                time_ms: 0,
                text: "first".to_string(),
            },
            SyncedLine {
                time_ms: 10_000,
                text: "second".to_string(),
            },
        ]),
        source: "static".to_string(),
    }
}

/// Answers every lookup with the same lyrics, or fails
pub struct StaticLyrics {
    delay: Duration,
    fail: bool,
}

impl StaticLyrics {
    pub fn instant() -> Arc<Self> {
        Arc::new(Self {
            delay: Duration::ZERO,
            fail: false,
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self { delay, fail: false })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            delay: Duration::ZERO,
            fail: true,
        })
    }
}

#[async_trait]
impl LyricsProvider for StaticLyrics {
    fn name(&self) -> &str {
        "static"
    }

    async fn search_lyrics(
        &self,
        title: &str,
        _artist: &str,
    ) -> Result<Option<Lyrics>, LyricsError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(LyricsError::Transport("lyrics host unreachable".to_string()));
        }
        Ok(Some(synced_lyrics(title)))
    }
}

// =============================================================================
// Recording scrobble sink
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    NowPlaying(String),
    Scrobble(String, i64),
}

#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
    now_playing_delay: Duration,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sink whose now-playing requests take `delay` to complete
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            now_playing_delay: delay,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn scrobbles(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SinkCall::Scrobble(id, _) => Some(id),
                SinkCall::NowPlaying(_) => None,
            })
            .collect()
    }

    pub fn now_playing(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SinkCall::NowPlaying(id) => Some(id),
                SinkCall::Scrobble(..) => None,
            })
            .collect()
    }
}

#[async_trait]
impl ScrobbleSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn update_now_playing(&self, track: &Track) -> Result<(), SinkError> {
        if !self.now_playing_delay.is_zero() {
            tokio::time::sleep(self.now_playing_delay).await;
        }
        self.calls
            .lock()
            .unwrap()
            .push(SinkCall::NowPlaying(track.id.clone()));
        Ok(())
    }

    async fn scrobble(&self, track: &Track, timestamp_ms: i64) -> Result<(), SinkError> {
        self.calls
            .lock()
            .unwrap()
            .push(SinkCall::Scrobble(track.id.clone(), timestamp_ms));
        Ok(())
    }
}
