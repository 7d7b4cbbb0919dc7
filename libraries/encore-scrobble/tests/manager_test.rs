//! Scrobble lifecycle tests.
//!
//! Time is driven with the paused tokio clock, so "listening for 100 s" takes
//! no real time.

use async_trait::async_trait;
use encore_core::{ScrobbleSink, SinkError, Track, TrackSource};
use encore_scrobble::{ScrobbleManager, MIN_TRACK_DURATION_MS};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// Recording sink
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Call {
    NowPlaying(String),
    Scrobble(String, i64),
}

#[derive(Default)]
struct RecordingSink {
    configured: bool,
    fail: bool,
    delay: Duration,
    calls: Mutex<Vec<Call>>,
}

impl RecordingSink {
    fn configured() -> Arc<Self> {
        Arc::new(Self {
            configured: true,
            ..Default::default()
        })
    }

    fn unconfigured() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            configured: true,
            fail: true,
            ..Default::default()
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            configured: true,
            delay,
            ..Default::default()
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn scrobble_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Scrobble(..)))
            .count()
    }
}

#[async_trait]
impl ScrobbleSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn update_now_playing(&self, track: &Track) -> Result<(), SinkError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.calls.lock().unwrap().push(Call::NowPlaying(track.id.clone()));
        if self.fail {
            return Err(SinkError::Transport("offline".to_string()));
        }
        Ok(())
    }

    async fn scrobble(&self, track: &Track, timestamp_ms: i64) -> Result<(), SinkError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.calls
            .lock()
            .unwrap()
            .push(Call::Scrobble(track.id.clone(), timestamp_ms));
        if self.fail {
            return Err(SinkError::Transport("offline".to_string()));
        }
        Ok(())
    }
}

fn track(id: &str, duration_ms: u64) -> Track {
    Track::new(id, format!("Song {id}"), "Artist", duration_ms, TrackSource::Piped)
}

fn manager(sinks: &[Arc<RecordingSink>]) -> ScrobbleManager {
    ScrobbleManager::new(
        sinks
            .iter()
            .map(|s| s.clone() as Arc<dyn ScrobbleSink>)
            .collect(),
    )
}

async fn listen(manager: &mut ScrobbleManager, seconds: u64) {
    for _ in 0..seconds {
        tokio::time::advance(Duration::from_secs(1)).await;
        manager.on_progress(0);
    }
    manager.flush().await;
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test(start_paused = true)]
async fn half_of_a_200s_track_scrobbles_exactly_once() {
    let sink = RecordingSink::configured();
    let mut manager = manager(&[sink.clone()]);

    manager.on_track_start(track("a", 200_000));
    listen(&mut manager, 99).await;
    assert_eq!(sink.scrobble_count(), 0);

    listen(&mut manager, 1).await;
    assert_eq!(sink.scrobble_count(), 1);

    listen(&mut manager, 100).await;
    assert_eq!(sink.scrobble_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn now_playing_precedes_scrobble_with_session_start_timestamp() {
    let sink = RecordingSink::configured();
    let mut manager = manager(&[sink.clone()]);

    manager.on_track_start(track("a", 60_000));
    let started_at = manager.session().unwrap().started_at_ms();
    listen(&mut manager, 30).await;

    assert_eq!(
        sink.calls(),
        vec![
            Call::NowPlaying("a".to_string()),
            Call::Scrobble("a".to_string(), started_at),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn long_tracks_cap_at_four_minutes() {
    let sink = RecordingSink::configured();
    let mut manager = manager(&[sink.clone()]);

    manager.on_track_start(track("long", 20 * 60_000));
    listen(&mut manager, 239).await;
    assert_eq!(sink.scrobble_count(), 0);
    listen(&mut manager, 1).await;
    assert_eq!(sink.scrobble_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn short_tracks_never_scrobble() {
    let sink = RecordingSink::configured();
    let mut manager = manager(&[sink.clone()]);

    manager.on_track_start(track("jingle", MIN_TRACK_DURATION_MS - 1));
    listen(&mut manager, 60).await;

    assert_eq!(sink.scrobble_count(), 0);
    assert_eq!(sink.calls(), vec![Call::NowPlaying("jingle".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn paused_time_does_not_count() {
    let sink = RecordingSink::configured();
    let mut manager = manager(&[sink.clone()]);

    manager.on_track_start(track("a", 100_000));
    listen(&mut manager, 40).await;

    manager.on_pause();
    let played = manager.played();
    tokio::time::advance(Duration::from_secs(600)).await;
    assert!(!manager.on_progress(0));
    assert_eq!(manager.played(), played);

    manager.on_resume();
    listen(&mut manager, 9).await;
    assert_eq!(sink.scrobble_count(), 0);
    listen(&mut manager, 1).await;
    assert_eq!(sink.scrobble_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn track_change_resets_the_session() {
    let sink = RecordingSink::configured();
    let mut manager = manager(&[sink.clone()]);

    manager.on_track_start(track("a", 100_000));
    listen(&mut manager, 40).await;
    manager.on_track_end();
    assert!(manager.session().is_none());

    manager.on_track_start(track("b", 100_000));
    listen(&mut manager, 40).await;
    assert_eq!(sink.scrobble_count(), 0);

    listen(&mut manager, 10).await;
    assert_eq!(
        sink.calls().last(),
        Some(&Call::Scrobble(
            "b".to_string(),
            manager.session().unwrap().started_at_ms()
        ))
    );
}

#[tokio::test(start_paused = true)]
async fn unknown_duration_is_filled_in_later() {
    let sink = RecordingSink::configured();
    let mut manager = manager(&[sink.clone()]);

    manager.on_track_start(track("a", 0));
    listen(&mut manager, 50).await;
    assert_eq!(sink.scrobble_count(), 0);

    manager.on_duration_known(80_000);
    assert!(manager.on_progress(0));
}

#[tokio::test(start_paused = true)]
async fn unconfigured_sinks_are_never_called_and_failures_are_swallowed() {
    let silent = RecordingSink::unconfigured();
    let broken = RecordingSink::failing();
    let healthy = RecordingSink::configured();
    let mut manager = manager(&[silent.clone(), broken.clone(), healthy.clone()]);

    manager.on_track_start(track("a", 60_000));
    listen(&mut manager, 30).await;

    assert!(silent.calls().is_empty());
    assert_eq!(broken.scrobble_count(), 1);
    assert_eq!(healthy.scrobble_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn events_without_a_session_are_ignored() {
    let sink = RecordingSink::configured();
    let mut manager = manager(&[sink.clone()]);

    manager.on_pause();
    manager.on_resume();
    assert!(!manager.on_progress(10_000));
    manager.on_track_end();

    assert!(sink.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn slow_sink_does_not_hold_up_bookkeeping() {
    let slow = RecordingSink::slow(Duration::from_secs(60));
    let fast = RecordingSink::configured();
    let mut manager = manager(&[slow.clone(), fast.clone()]);

    manager.on_track_start(track("a", 200_000));
    manager.on_pause();
    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(manager.played(), Duration::ZERO);

    manager.on_resume();
    tokio::time::advance(Duration::from_secs(45)).await;
    assert!(!manager.on_progress(0));
    assert_eq!(manager.played(), Duration::from_secs(45));

    tokio::time::advance(Duration::from_secs(55)).await;
    assert!(manager.on_progress(0));
    manager.flush().await;

    // Each sink sees now playing before the scrobble
    let started_at = manager.session().unwrap().started_at_ms();
    let expected = vec![
        Call::NowPlaying("a".to_string()),
        Call::Scrobble("a".to_string(), started_at),
    ];
    assert_eq!(slow.calls(), expected);
    assert_eq!(fast.calls(), expected);
}

// =============================================================================
// Properties
// =============================================================================

#[derive(Debug, Clone)]
enum Step {
    Listen(u64),
    Pause(u64),
    Seek,
}

fn arb_steps() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec(
        prop_oneof![
            (1u64..60).prop_map(Step::Listen),
            (1u64..300).prop_map(Step::Pause),
            Just(Step::Seek),
        ],
        0..30,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn scrobbles_at_most_once_and_only_past_threshold(
        duration_ms in 10_000u64..600_000,
        steps in arb_steps(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        runtime.block_on(async {
            let sink = RecordingSink::configured();
            let mut manager = manager(&[sink.clone()]);
            manager.on_track_start(track("p", duration_ms));

            let mut listened_ms = 0u64;
            for step in steps {
                match step {
                    Step::Listen(secs) => {
                        tokio::time::advance(Duration::from_secs(secs)).await;
                        listened_ms += secs * 1000;
                        manager.on_progress(0);
                    }
                    Step::Pause(secs) => {
                        manager.on_pause();
                        tokio::time::advance(Duration::from_secs(secs)).await;
                        manager.on_progress(0);
                        manager.on_resume();
                    }
                    Step::Seek => {
                        manager.on_progress(duration_ms / 3);
                    }
                }
            }

            manager.flush().await;
            let threshold = encore_scrobble::scrobble_threshold_ms(duration_ms);
            let expected = usize::from(duration_ms >= MIN_TRACK_DURATION_MS && listened_ms >= threshold);
            prop_assert_eq!(sink.scrobble_count(), expected);
            Ok(())
        })?;
    }
}
