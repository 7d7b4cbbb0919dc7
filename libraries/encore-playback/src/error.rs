//! Error types for playback control

use crate::engine::EngineError;
use encore_resolver::ResolverError;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Another load is still being handed to the engine
    #[error("A track load is already in flight")]
    LoadInFlight,

    /// Queue is empty
    #[error("Queue is empty")]
    QueueEmpty,

    /// No track is currently loaded
    #[error("No track loaded")]
    NoTrackLoaded,

    /// A newer load or play request replaced this one while it was resolving
    #[error("Request superseded by a newer load")]
    Superseded,

    /// `play_track` needs a resolver and none was configured
    #[error("No stream resolver configured")]
    NoResolver,

    /// Every provider failed to produce a stream
    #[error(transparent)]
    Resolution(#[from] ResolverError),

    /// The audio engine refused the track
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
