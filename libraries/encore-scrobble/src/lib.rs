//! Encore Scrobble
//!
//! Turns a stream of timeline events (track start, pause, resume, progress,
//! end) into "now playing" and "scrobble" calls on every configured
//! [`ScrobbleSink`](encore_core::ScrobbleSink).
//!
//! # Rules
//!
//! - Tracks shorter than 30 s are never scrobbled
//! - A track is scrobbled once it has been *listened to* (paused time
//!   excluded) for half its duration or four minutes, whichever comes first
//! - At most one scrobble per track start
//!
//! # Example
//!
//! ```ignore
//! use encore_scrobble::{ListenBrainzConfig, ListenBrainzSink, ScrobbleManager};
//! use std::sync::Arc;
//!
//! let sink = ListenBrainzSink::new(ListenBrainzConfig::with_token("my-token"))?;
//! let mut manager = ScrobbleManager::new(vec![Arc::new(sink)]);
//!
//! manager.on_track_start(track);
//! // ... later, from the progress tick
//! manager.on_progress(position_ms);
//! ```

pub mod listenbrainz;
pub mod manager;
pub mod session;

pub use listenbrainz::{ListenBrainzConfig, ListenBrainzSink, DEFAULT_LISTENBRAINZ_URL};
pub use manager::{
    scrobble_threshold_ms, ScrobbleManager, MAX_SCROBBLE_THRESHOLD_MS, MIN_TRACK_DURATION_MS,
};
pub use session::ScrobbleSession;
