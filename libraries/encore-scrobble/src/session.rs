//! Listening session for the current track

use chrono::{DateTime, Utc};
use encore_core::Track;
use std::time::Duration;
use tokio::time::Instant;

/// Listening time bookkeeping for one track start.
///
/// `played` only grows while the session is running; paused intervals are
/// never counted. Time is measured with the tokio clock so it can be driven
/// from tests.
#[derive(Debug, Clone)]
pub struct ScrobbleSession {
    /// Track being listened to
    pub track: Track,

    /// Wall-clock start of the session (reported as the scrobble timestamp)
    pub started_at: DateTime<Utc>,

    /// Whether the scrobble has already been sent
    pub scrobbled: bool,

    accumulated: Duration,
    running_since: Option<Instant>,
}

impl ScrobbleSession {
    /// Start a running session for `track` now
    pub fn start(track: Track) -> Self {
        Self {
            track,
            started_at: Utc::now(),
            scrobbled: false,
            accumulated: Duration::ZERO,
            running_since: Some(Instant::now()),
        }
    }

    /// Total listened time, including the currently running interval
    pub fn played(&self) -> Duration {
        self.accumulated
            + self
                .running_since
                .map_or(Duration::ZERO, |since| since.elapsed())
    }

    /// Whether time is currently being counted
    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    /// Fold the running interval into the total and stop counting
    pub fn pause(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    /// Start counting again from now
    pub fn resume(&mut self) {
        self.pause();
        self.running_since = Some(Instant::now());
    }

    /// Session start as Unix milliseconds
    pub fn started_at_ms(&self) -> i64 {
        self.started_at.timestamp_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_core::TrackSource;

    fn session() -> ScrobbleSession {
        ScrobbleSession::start(Track::new("1", "Song", "Artist", 200_000, TrackSource::Piped))
    }

    #[tokio::test(start_paused = true)]
    async fn paused_time_is_not_counted() {
        let mut session = session();

        tokio::time::advance(Duration::from_secs(10)).await;
        session.pause();
        let at_pause = session.played();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(session.played(), at_pause);
        assert!(!session.is_running());

        session.resume();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(session.played(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn resume_while_running_keeps_elapsed_time() {
        let mut session = session();

        tokio::time::advance(Duration::from_secs(20)).await;
        session.resume();
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(session.played(), Duration::from_secs(40));
    }

    #[tokio::test(start_paused = true)]
    async fn double_pause_is_harmless() {
        let mut session = session();

        tokio::time::advance(Duration::from_secs(7)).await;
        session.pause();
        session.pause();

        assert_eq!(session.played(), Duration::from_secs(7));
    }
}
