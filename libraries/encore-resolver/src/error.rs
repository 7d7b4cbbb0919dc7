//! Error types for stream resolution.

use thiserror::Error;

/// Errors raised once every provider has been exhausted.
///
/// Each variant carries the per-provider failure messages in the order they
/// were encountered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// No provider could produce a playable stream
    #[error("No stream available: {}", summarize(.errors))]
    NoStreamAvailable { errors: Vec<String> },

    /// No provider could describe the track
    #[error("Track info unavailable: {}", summarize(.errors))]
    TrackInfoUnavailable { errors: Vec<String> },

    /// Every attempted provider failed the search
    #[error("Search failed: {}", summarize(.errors))]
    SearchFailed { errors: Vec<String> },
}

impl ResolverError {
    /// Per-provider failure messages
    pub fn errors(&self) -> &[String] {
        match self {
            Self::NoStreamAvailable { errors }
            | Self::TrackInfoUnavailable { errors }
            | Self::SearchFailed { errors } => errors,
        }
    }
}

fn summarize(errors: &[String]) -> String {
    if errors.is_empty() {
        "no provider could be attempted".to_string()
    } else {
        errors.join("; ")
    }
}
