//! Playback controller - core orchestration
//!
//! Coordinates the queue, the stream resolver, the attached audio engine and
//! the background side effects (lyrics, persistence, scrobbling) around one
//! observable [`PlayerState`].

use crate::{
    engine::{AudioEngine, EngineState},
    error::{PlaybackError, Result},
    queue::Queue,
    shuffle::pick_shuffled_index,
    state::{PlayerState, QueueEntry},
    store::{MemoryStore, PlaybackStore},
    timeline::{TimelineEvent, TimelineTracker},
    types::{PlaybackConfig, PlaybackPhase, RepeatMode},
};
use chrono::{DateTime, Utc};
use encore_core::{LyricsProvider, Track};
use encore_resolver::ProviderResolver;
use encore_scrobble::ScrobbleManager;
use rand::thread_rng;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Playback controller
///
/// Cheap to clone; every clone drives the same player. Observers follow the
/// player through [`subscribe`](Self::subscribe).
///
/// Only one track hand-off to the engine runs at a time: `load_track`,
/// `play_track`, `next` and `previous` fail with
/// [`PlaybackError::LoadInFlight`] while another load is pending.
#[derive(Clone)]
pub struct PlaybackController {
    inner: Arc<Inner>,
}

struct Inner {
    resolver: Option<ProviderResolver>,
    lyrics: Option<Arc<dyn LyricsProvider>>,
    config: PlaybackConfig,

    /// Merged player state
    state: watch::Sender<PlayerState>,
    queue: Mutex<Queue>,
    engine: RwLock<Option<Arc<dyn AudioEngine>>>,

    /// Single-flight load flag
    loading: AtomicBool,

    /// Bumped by every accepted load and every `play_track` request
    generation: AtomicU64,

    /// Ordered persistence writes
    persistence: mpsc::UnboundedSender<PersistJob>,

    timeline_task: Mutex<Option<JoinHandle<()>>>,
    engine_task: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn abort_tasks(&self) {
        for slot in [&self.timeline_task, &self.engine_task] {
            if let Some(task) = slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
                task.abort();
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

/// Write queued for the persistence task
enum PersistJob {
    Loaded {
        track: Track,
        played_at: DateTime<Utc>,
    },
    Volume(f32),
}

/// Releases the single-flight flag when the hand-off is over
struct LoadGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Builder for [`PlaybackController`]
#[derive(Default)]
pub struct PlaybackControllerBuilder {
    resolver: Option<ProviderResolver>,
    lyrics: Option<Arc<dyn LyricsProvider>>,
    store: Option<Arc<dyn PlaybackStore>>,
    scrobbler: Option<ScrobbleManager>,
    config: PlaybackConfig,
}

impl PlaybackControllerBuilder {
    /// Resolver used by [`PlaybackController::play_track`]
    pub fn resolver(mut self, resolver: ProviderResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Lyrics source consulted after each load
    pub fn lyrics(mut self, provider: Arc<dyn LyricsProvider>) -> Self {
        self.lyrics = Some(provider);
        self
    }

    /// Persistence hooks (defaults to an in-memory store)
    pub fn store(mut self, store: Arc<dyn PlaybackStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Scrobble manager fed from the state stream
    pub fn scrobbler(mut self, manager: ScrobbleManager) -> Self {
        self.scrobbler = Some(manager);
        self
    }

    pub fn config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the controller
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> PlaybackController {
        let initial = PlayerState {
            volume: clamp_volume(self.config.volume),
            volume_boost: clamp_boost(self.config.volume_boost),
            ..PlayerState::default()
        };
        let (state, _) = watch::channel(initial);

        let timeline_task = self
            .scrobbler
            .map(|manager| tokio::spawn(run_timeline(state.subscribe(), manager)));

        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let (persistence, jobs) = mpsc::unbounded_channel();
        tokio::spawn(run_persistence(store, jobs));

        PlaybackController {
            inner: Arc::new(Inner {
                resolver: self.resolver,
                lyrics: self.lyrics,
                config: self.config,
                state,
                queue: Mutex::new(Queue::new()),
                engine: RwLock::new(None),
                loading: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                persistence,
                timeline_task: Mutex::new(timeline_task),
                engine_task: Mutex::new(None),
            }),
        }
    }
}

impl PlaybackController {
    pub fn builder() -> PlaybackControllerBuilder {
        PlaybackControllerBuilder::default()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> PlayerState {
        self.inner.state.borrow().clone()
    }

    /// Follow state changes
    pub fn subscribe(&self) -> watch::Receiver<PlayerState> {
        self.inner.state.subscribe()
    }

    /// Snapshot of the queue
    pub fn queue(&self) -> Vec<QueueEntry> {
        self.queue_lock().entries().to_vec()
    }

    /// Whether a track hand-off is in progress
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.inner.config
    }

    /// Attach (or replace) the audio engine
    ///
    /// The engine receives the current volume, boost, shuffle and repeat
    /// settings; from then on its state is merged into the player state on
    /// every update. Must be called from within a tokio runtime.
    pub fn set_audio_player(&self, engine: Arc<dyn AudioEngine>) {
        let (volume, boost, shuffle, repeat) = {
            let state = self.inner.state.borrow();
            (state.volume, state.volume_boost, state.shuffle_enabled, state.repeat_mode)
        };
        engine.set_volume(volume);
        engine.set_volume_boost(boost);
        engine.set_shuffle_enabled(shuffle);
        engine.set_repeat_mode(repeat);

        let mut updates = engine.subscribe();
        let snapshot = updates.borrow_and_update().clone();
        *self.inner.engine.write().unwrap_or_else(PoisonError::into_inner) = Some(engine);
        self.apply_engine_state(&snapshot);

        let task = tokio::spawn(run_engine_merge(Arc::downgrade(&self.inner), updates));
        let previous = self
            .inner
            .engine_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }

        info!("Audio engine attached");
    }

    /// Resolve a stream for `track` and load it with autoplay
    ///
    /// Fails with [`PlaybackError::Superseded`], leaving the player alone,
    /// when another load or `play_track` call starts while resolving.
    pub async fn play_track(&self, track: Track) -> Result<()> {
        let resolver = self
            .inner
            .resolver
            .as_ref()
            .ok_or(PlaybackError::NoResolver)?;

        info!(track_id = %track.id, title = %track.title, source = %track.source, "Resolving track");

        let issued = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let resolved = resolver.resolve_track(&track).await;
        if self.inner.generation.load(Ordering::Acquire) != issued {
            info!(track_id = %track.id, "Discarding stale resolution, a newer track was requested");
            return Err(PlaybackError::Superseded);
        }

        match resolved {
            Ok(stream) => self.load_track(track, stream.url, true).await,
            Err(e) => {
                error!(track_id = %track.id, error = %e, "Could not resolve a stream");
                let message = format!("Could not play '{}': {}", track.title, e);
                self.inner.state.send_modify(|state| {
                    state.phase = PlaybackPhase::Error;
                    state.error = Some(message);
                });
                Err(e.into())
            }
        }
    }

    /// Queue `track` (or move to it if queued) and hand it to the engine
    pub async fn load_track(
        &self,
        track: Track,
        stream_url: impl Into<String>,
        auto_play: bool,
    ) -> Result<()> {
        let guard = self.try_begin_load()?;
        let stream_url = stream_url.into();
        let index = self.queue_lock().enqueue(track.clone(), stream_url.clone());
        self.load_entry(guard, index, track, stream_url, auto_play)
            .await
    }

    pub fn play(&self) -> Result<()> {
        match self.engine() {
            Some(engine) => {
                engine.play();
                Ok(())
            }
            None => self.set_disconnected_phase(PlaybackPhase::Playing),
        }
    }

    pub fn pause(&self) -> Result<()> {
        match self.engine() {
            Some(engine) => {
                engine.pause();
                Ok(())
            }
            None => self.set_disconnected_phase(PlaybackPhase::Paused),
        }
    }

    pub fn toggle_play_pause(&self) -> Result<()> {
        if self.inner.state.borrow().phase == PlaybackPhase::Playing {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn stop(&self) -> Result<()> {
        match self.engine() {
            Some(engine) => {
                engine.stop();
                Ok(())
            }
            None => self.set_disconnected_phase(PlaybackPhase::Idle),
        }
    }

    /// Seek to `fraction` (0.0 to 1.0) of the current track
    pub fn seek_to(&self, fraction: f64) -> Result<()> {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let mut target = None;
        self.inner.state.send_if_modified(|state| {
            if state.current_track.is_none() {
                return false;
            }
            let position_ms = (state.duration_ms as f64 * fraction).round() as u64;
            state.position_ms = position_ms;
            target = Some(position_ms);
            true
        });

        let position_ms = target.ok_or(PlaybackError::NoTrackLoaded)?;
        debug!(position_ms, "Seek");
        if let Some(engine) = self.engine() {
            engine.seek_to(position_ms);
        }
        Ok(())
    }

    /// Skip to the next entry (random when shuffling)
    pub async fn next(&self) -> Result<()> {
        let guard = self.try_begin_load()?;
        let shuffle = self.inner.state.borrow().shuffle_enabled;

        let (index, entry) = self.move_cursor(|queue| {
            if shuffle && queue.len() > 1 {
                pick_shuffled_index(queue.len(), queue.cursor(), &mut thread_rng())
            } else {
                queue.next_index()
            }
        })?;

        debug!(index, shuffle, "Next track");
        self.load_entry(guard, index, entry.track, entry.stream_url, true)
            .await
    }

    /// Restart the track, or go back one entry near its start
    pub async fn previous(&self) -> Result<()> {
        let restart = {
            let state = self.inner.state.borrow();
            state.current_track.is_some()
                && state.position_ms > self.inner.config.restart_threshold_ms
        };
        if restart {
            debug!("Previous restarts the current track");
            return self.seek_to(0.0);
        }

        let guard = self.try_begin_load()?;
        let (index, entry) = self.move_cursor(Queue::previous_index)?;

        debug!(index, "Previous track");
        self.load_entry(guard, index, entry.track, entry.stream_url, true)
            .await
    }

    /// Flip shuffle, returning the new setting
    pub fn toggle_shuffle(&self) -> bool {
        let mut enabled = false;
        self.inner.state.send_modify(|state| {
            state.shuffle_enabled = !state.shuffle_enabled;
            enabled = state.shuffle_enabled;
        });
        if let Some(engine) = self.engine() {
            engine.set_shuffle_enabled(enabled);
        }
        info!(enabled, "Shuffle toggled");
        enabled
    }

    /// Advance `Off -> All -> One -> Off`, returning the new mode
    pub fn cycle_repeat_mode(&self) -> RepeatMode {
        let mut mode = RepeatMode::Off;
        self.inner.state.send_modify(|state| {
            state.repeat_mode = state.repeat_mode.next();
            mode = state.repeat_mode;
        });
        if let Some(engine) = self.engine() {
            engine.set_repeat_mode(mode);
        }
        info!(mode = ?mode, "Repeat mode changed");
        mode
    }

    /// Set volume (clamped to 0.0..=1.0) and remember it
    pub fn set_volume(&self, volume: f32) -> f32 {
        let volume = clamp_volume(volume);
        self.inner.state.send_modify(|state| state.volume = volume);
        if let Some(engine) = self.engine() {
            engine.set_volume(volume);
        }

        self.persist(PersistJob::Volume(volume));
        volume
    }

    /// Set the boost multiplier (clamped to 1.0..=2.0)
    pub fn set_volume_boost(&self, boost: f32) -> f32 {
        let boost = clamp_boost(boost);
        self.inner
            .state
            .send_modify(|state| state.volume_boost = boost);
        if let Some(engine) = self.engine() {
            engine.set_volume_boost(boost);
        }
        boost
    }

    /// Empty the queue; the current track keeps playing
    pub fn clear_queue(&self) {
        self.queue_lock().clear();
        self.inner.state.send_modify(|state| {
            state.queue.clear();
            state.queue_index = None;
        });
        info!("Queue cleared");
    }

    /// Detach and release the engine and stop background work
    pub fn release(&self) {
        let engine = self
            .inner
            .engine
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(engine) = engine {
            engine.release();
        }
        self.inner.abort_tasks();
        self.inner.state.send_modify(|state| {
            state.phase = PlaybackPhase::Idle;
            state.position_ms = 0;
        });
        info!("Playback controller released");
    }

    fn engine(&self) -> Option<Arc<dyn AudioEngine>> {
        self.inner
            .engine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn queue_lock(&self) -> MutexGuard<'_, Queue> {
        self.inner.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_begin_load(&self) -> Result<LoadGuard<'_>> {
        if self
            .inner
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Load rejected, another track is still being loaded");
            return Err(PlaybackError::LoadInFlight);
        }
        Ok(LoadGuard {
            flag: &self.inner.loading,
        })
    }

    fn move_cursor(
        &self,
        select: impl FnOnce(&Queue) -> Option<usize>,
    ) -> Result<(usize, QueueEntry)> {
        let mut queue = self.queue_lock();
        let index = select(&queue).ok_or(PlaybackError::QueueEmpty)?;
        let entry = queue
            .set_cursor(index)
            .cloned()
            .ok_or(PlaybackError::QueueEmpty)?;
        Ok((index, entry))
    }

    /// Shared tail of every load: state reset, side effects, engine hand-off
    async fn load_entry(
        &self,
        guard: LoadGuard<'_>,
        index: usize,
        track: Track,
        stream_url: String,
        auto_play: bool,
    ) -> Result<()> {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        let queue = self.queue_lock().entries().to_vec();
        let fetch_lyrics = self.inner.lyrics.is_some();

        self.inner.state.send_modify(|state| {
            state.current_track = Some(track.clone());
            state.queue = queue;
            state.queue_index = Some(index);
            state.phase = PlaybackPhase::Loading;
            state.position_ms = 0;
            state.duration_ms = track.duration_ms;
            state.error = None;
            state.lyrics = None;
            state.lyrics_loading = fetch_lyrics;
        });

        info!(
            track_id = %track.id,
            title = %track.title,
            artist = %track.artist,
            index,
            "Loading track"
        );

        self.spawn_lyrics(&track);

        match self.engine() {
            Some(engine) => {
                let loaded = engine.load(&track, &stream_url).await;
                drop(guard);

                if let Err(e) = loaded {
                    error!(track_id = %track.id, error = %e, "Engine rejected track");
                    let message = e.to_string();
                    self.inner.state.send_modify(|state| {
                        state.phase = PlaybackPhase::Error;
                        state.error = Some(message);
                    });
                    return Err(e.into());
                }

                let snapshot = engine.subscribe().borrow().clone();
                self.apply_engine_state(&snapshot);
            }
            None => {
                drop(guard);
                self.inner
                    .state
                    .send_modify(|state| state.phase = PlaybackPhase::Paused);
            }
        }

        self.persist(PersistJob::Loaded {
            track: track.clone(),
            played_at: Utc::now(),
        });
        if auto_play {
            self.spawn_autoplay(track.id);
        }
        Ok(())
    }

    fn set_disconnected_phase(&self, phase: PlaybackPhase) -> Result<()> {
        if self.inner.state.borrow().current_track.is_none() {
            return Err(PlaybackError::NoTrackLoaded);
        }
        self.inner.state.send_modify(|state| {
            state.phase = phase;
            if phase == PlaybackPhase::Idle {
                state.position_ms = 0;
            }
        });
        Ok(())
    }

    /// Merge an engine update and react to natural completion
    fn apply_engine_state(&self, engine: &EngineState) {
        // Stale updates from the previous track must not end the one being loaded
        let loading = self.is_loading();
        let mut ended = false;
        let mut failed = false;

        self.inner.state.send_modify(|state| {
            let previous = state.phase;
            state.merge_engine(engine);
            if loading {
                state.phase = PlaybackPhase::Loading;
            }
            ended = previous != PlaybackPhase::Ended && state.phase == PlaybackPhase::Ended;
            failed = previous != PlaybackPhase::Error && state.phase == PlaybackPhase::Error;
        });

        if failed {
            error!(error = ?engine.error, "Engine reported a playback error");
        }

        if ended && self.should_auto_advance() {
            let controller = self.clone();
            tokio::spawn(async move {
                match controller.next().await {
                    Ok(()) => {}
                    Err(PlaybackError::LoadInFlight) => {
                        debug!("Auto-advance skipped, a load is already running");
                    }
                    Err(e) => warn!(error = %e, "Auto-advance failed"),
                }
            });
        }
    }

    fn should_auto_advance(&self) -> bool {
        if !self.inner.config.auto_advance {
            return false;
        }
        let (repeat, shuffle) = {
            let state = self.inner.state.borrow();
            (state.repeat_mode, state.shuffle_enabled)
        };
        let queue = self.queue_lock();
        if queue.is_empty() {
            return false;
        }

        match repeat {
            RepeatMode::One => false,
            RepeatMode::All => true,
            RepeatMode::Off => (shuffle && queue.len() > 1) || !queue.is_at_end(),
        }
    }

    fn spawn_lyrics(&self, track: &Track) {
        let Some(provider) = self.inner.lyrics.clone() else {
            return;
        };
        let weak = Arc::downgrade(&self.inner);
        let track = track.clone();

        tokio::spawn(async move {
            let lyrics = match provider.search_lyrics(&track.title, &track.artist).await {
                Ok(lyrics) => {
                    debug!(track_id = %track.id, found = lyrics.is_some(), "Lyrics lookup finished");
                    lyrics
                }
                Err(e) => {
                    warn!(track_id = %track.id, provider = provider.name(), error = %e, "Lyrics lookup failed");
                    None
                }
            };

            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.state.send_if_modified(|state| {
                if state.current_track_id() != Some(track.id.as_str()) {
                    return false;
                }
                state.lyrics = lyrics;
                state.lyrics_loading = false;
                true
            });
        });
    }

    fn persist(&self, job: PersistJob) {
        if self.inner.persistence.send(job).is_err() {
            warn!("Persistence task is gone, write dropped");
        }
    }

    fn spawn_autoplay(&self, track_id: String) {
        let weak = Arc::downgrade(&self.inner);
        let delay = self.inner.config.autoplay_delay();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let controller = PlaybackController { inner };

            let still_current = {
                let state = controller.inner.state.borrow();
                state.current_track_id() == Some(track_id.as_str())
                    && state.phase != PlaybackPhase::Error
            };
            if !still_current {
                debug!(track_id = %track_id, "Dropping stale autoplay");
                return;
            }
            if let Err(e) = controller.play() {
                debug!(track_id = %track_id, error = %e, "Autoplay failed");
            }
        });
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

fn clamp_boost(boost: f32) -> f32 {
    if boost.is_nan() {
        1.0
    } else {
        boost.clamp(1.0, 2.0)
    }
}

async fn run_engine_merge(inner: Weak<Inner>, mut updates: watch::Receiver<EngineState>) {
    while updates.changed().await.is_ok() {
        let snapshot = updates.borrow_and_update().clone();
        let Some(inner) = inner.upgrade() else {
            break;
        };
        PlaybackController { inner }.apply_engine_state(&snapshot);
    }
    debug!("Engine merge task finished");
}

/// Applies store writes in the order they were issued
async fn run_persistence(
    store: Arc<dyn PlaybackStore>,
    mut jobs: mpsc::UnboundedReceiver<PersistJob>,
) {
    while let Some(job) = jobs.recv().await {
        match job {
            PersistJob::Loaded { track, played_at } => {
                if let Err(e) = store.save_last_track(&track).await {
                    warn!(track_id = %track.id, error = %e, "Failed to persist last track");
                }
                if let Err(e) = store.record_play(&track, played_at).await {
                    warn!(track_id = %track.id, error = %e, "Failed to record play history");
                }
            }
            PersistJob::Volume(volume) => {
                if let Err(e) = store.save_last_volume(volume).await {
                    warn!(volume, error = %e, "Failed to persist volume");
                }
            }
        }
    }
    debug!("Persistence task finished");
}

/// Feeds timeline events to the scrobble manager, one state at a time
///
/// Never awaits anything but the next state: sink calls are queued by the
/// manager, so pauses are observed as soon as they happen.
async fn run_timeline(mut updates: watch::Receiver<PlayerState>, mut manager: ScrobbleManager) {
    let mut tracker = TimelineTracker::new();

    loop {
        let state = updates.borrow_and_update().clone();
        for event in tracker.observe(&state) {
            match event {
                TimelineEvent::TrackStarted(track) => manager.on_track_start(track),
                TimelineEvent::Paused => manager.on_pause(),
                TimelineEvent::Resumed => manager.on_resume(),
                TimelineEvent::Progress {
                    position_ms,
                    duration_ms,
                } => {
                    manager.on_duration_known(duration_ms);
                    manager.on_progress(position_ms);
                }
                TimelineEvent::TrackEnded => manager.on_track_end(),
            }
        }

        if updates.changed().await.is_err() {
            break;
        }
    }
    debug!("Timeline task finished");
}
