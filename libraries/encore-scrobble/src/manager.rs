//! Scrobble lifecycle manager.
//!
//! Session bookkeeping happens synchronously in the caller. Network calls go
//! to one background worker per sink, so a slow sink never delays the
//! timeline and each sink still sees its calls in order.

use crate::session::ScrobbleSession;
use encore_core::{ScrobbleSink, Track};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Tracks shorter than this are never scrobbled
pub const MIN_TRACK_DURATION_MS: u64 = 30_000;

/// Listening time after which any track long enough is scrobbled
pub const MAX_SCROBBLE_THRESHOLD_MS: u64 = 240_000;

/// Listening time needed before a track of `duration_ms` is scrobbled
pub fn scrobble_threshold_ms(duration_ms: u64) -> u64 {
    (duration_ms / 2).min(MAX_SCROBBLE_THRESHOLD_MS)
}

enum SinkJob {
    NowPlaying(Track),
    Scrobble { track: Track, timestamp_ms: i64 },
    Flush(oneshot::Sender<()>),
}

struct SinkWorker {
    sink: Arc<dyn ScrobbleSink>,
    jobs: mpsc::UnboundedSender<SinkJob>,
}

/// Derives "now playing" and "scrobble" calls from timeline events.
///
/// Owns at most one [`ScrobbleSession`]. Events must be delivered in order
/// from a single task. Must be created inside a tokio runtime: every sink
/// gets a worker task that lives as long as the manager.
pub struct ScrobbleManager {
    workers: Vec<SinkWorker>,
    session: Option<ScrobbleSession>,
}

impl ScrobbleManager {
    /// Create a manager reporting to `sinks`
    pub fn new(sinks: Vec<Arc<dyn ScrobbleSink>>) -> Self {
        let workers = sinks
            .into_iter()
            .map(|sink| {
                let (jobs, rx) = mpsc::unbounded_channel();
                tokio::spawn(run_sink(Arc::clone(&sink), rx));
                SinkWorker { sink, jobs }
            })
            .collect();

        Self {
            workers,
            session: None,
        }
    }

    /// Current session, if a track is being listened to
    pub fn session(&self) -> Option<&ScrobbleSession> {
        self.session.as_ref()
    }

    /// Listened time of the current session
    pub fn played(&self) -> Duration {
        self.session
            .as_ref()
            .map_or(Duration::ZERO, ScrobbleSession::played)
    }

    /// Reset the session for `track` and announce it as now playing
    pub fn on_track_start(&mut self, track: Track) {
        info!(
            track_id = %track.id,
            title = %track.title,
            duration_ms = track.duration_ms,
            "Scrobble session started"
        );
        self.session = Some(ScrobbleSession::start(track.clone()));
        self.dispatch(|| SinkJob::NowPlaying(track.clone()));
    }

    /// Stop counting listened time
    pub fn on_pause(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.pause();
            debug!(played_ms = session.played().as_millis() as u64, "Scrobble session paused");
        }
    }

    /// Resume counting listened time
    pub fn on_resume(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.resume();
            debug!("Scrobble session resumed");
        }
    }

    /// Fill in the session track's duration when it was unknown at start
    pub fn on_duration_known(&mut self, duration_ms: u64) {
        if let Some(session) = self.session.as_mut() {
            if session.track.duration_ms == 0 && duration_ms > 0 {
                session.track.duration_ms = duration_ms;
            }
        }
    }

    /// Check the threshold and scrobble once it is reached.
    ///
    /// Returns `true` when this call queued the scrobble.
    pub fn on_progress(&mut self, position_ms: u64) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.scrobbled || session.track.duration_ms < MIN_TRACK_DURATION_MS {
            return false;
        }

        let played_ms = session.played().as_millis() as u64;
        let threshold_ms = scrobble_threshold_ms(session.track.duration_ms);
        if played_ms < threshold_ms {
            return false;
        }

        session.scrobbled = true;
        let track = session.track.clone();
        let timestamp_ms = session.started_at_ms();
        info!(
            track_id = %track.id,
            played_ms,
            threshold_ms,
            position_ms,
            "Scrobble threshold reached"
        );

        self.dispatch(|| SinkJob::Scrobble {
            track: track.clone(),
            timestamp_ms,
        });
        true
    }

    /// Clear the session
    pub fn on_track_end(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(
                track_id = %session.track.id,
                played_ms = session.played().as_millis() as u64,
                scrobbled = session.scrobbled,
                "Scrobble session ended"
            );
        }
    }

    /// Wait until every call queued so far has been delivered
    pub async fn flush(&self) {
        let mut pending = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            let (done, wait) = oneshot::channel();
            if worker.jobs.send(SinkJob::Flush(done)).is_ok() {
                pending.push(wait);
            }
        }
        for wait in pending {
            let _ = wait.await;
        }
    }

    /// Queue a job for every configured sink
    fn dispatch(&self, job: impl Fn() -> SinkJob) {
        for worker in &self.workers {
            if !worker.sink.is_configured() {
                debug!(sink = worker.sink.name(), "Skipping unconfigured sink");
                continue;
            }
            if worker.jobs.send(job()).is_err() {
                warn!(sink = worker.sink.name(), "Sink worker is gone, call dropped");
            }
        }
    }
}

/// Delivers one sink's calls in the order they were queued
async fn run_sink(sink: Arc<dyn ScrobbleSink>, mut jobs: mpsc::UnboundedReceiver<SinkJob>) {
    while let Some(job) = jobs.recv().await {
        match job {
            SinkJob::NowPlaying(track) => match sink.update_now_playing(&track).await {
                Ok(()) => debug!(sink = sink.name(), track_id = %track.id, "Now playing sent"),
                Err(e) => warn!(sink = sink.name(), track_id = %track.id, error = %e, "Now playing failed"),
            },
            SinkJob::Scrobble {
                track,
                timestamp_ms,
            } => match sink.scrobble(&track, timestamp_ms).await {
                Ok(()) => debug!(sink = sink.name(), track_id = %track.id, "Scrobbled"),
                Err(e) => warn!(sink = sink.name(), track_id = %track.id, error = %e, "Scrobble failed"),
            },
            SinkJob::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!(sink = sink.name(), "Sink worker finished");
}
