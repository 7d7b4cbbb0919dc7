//! Capability traits implemented by back-ends
use crate::error::{LyricsError, ProviderError, SinkError};
use crate::types::{Lyrics, StreamInfo, Track, TrackSource};
use async_trait::async_trait;

/// Music back-end that can search, look up and resolve streams
///
/// Implementations must be cheap to share behind an `Arc` and safe to call
/// from several tasks at once.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Source tag of the identifiers this provider understands
    fn source(&self) -> TrackSource;

    /// Human-readable name used in logs
    fn name(&self) -> &str;

    /// Search for tracks matching `query`, returning at most `limit` results
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>, ProviderError>;

    /// Resolve a playable stream for one of this provider's identifiers
    async fn get_stream(&self, track_id: &str) -> Result<StreamInfo, ProviderError>;

    /// Fetch metadata for one of this provider's identifiers
    async fn get_track_info(&self, track_id: &str) -> Result<Track, ProviderError>;

    /// Whether the provider should be asked at all right now
    ///
    /// Must be cheap; it is consulted on every resolver call.
    fn is_available(&self) -> bool {
        true
    }
}

/// Listening-history service
#[async_trait]
pub trait ScrobbleSink: Send + Sync {
    /// Human-readable name used in logs
    fn name(&self) -> &str;

    /// Whether credentials are present; unconfigured sinks are never called
    fn is_configured(&self) -> bool;

    /// Announce the track that just started playing
    async fn update_now_playing(&self, track: &Track) -> Result<(), SinkError>;

    /// Submit a completed listen that started at `timestamp_ms` (Unix millis)
    async fn scrobble(&self, track: &Track, timestamp_ms: i64) -> Result<(), SinkError>;
}

/// Lyrics back-end
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// Human-readable name used in logs and in [`Lyrics::source`]
    fn name(&self) -> &str;

    /// Look up lyrics by title and artist; `Ok(None)` means the back-end has none
    async fn search_lyrics(&self, title: &str, artist: &str)
        -> Result<Option<Lyrics>, LyricsError>;

    /// Whether the provider should be asked at all right now
    fn is_available(&self) -> bool {
        true
    }
}
