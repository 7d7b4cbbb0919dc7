//! Error types for the capability traits
use crate::types::TrackSource;
use thiserror::Error;

/// Errors returned by a [`StreamProvider`](crate::StreamProvider)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Provider is switched off or currently unhealthy
    #[error("Provider unavailable: {provider}")]
    Unavailable { provider: String },

    /// Identifier unknown to this provider
    #[error("Track not found on {provider}: {id}")]
    NotFound { provider: TrackSource, id: String },

    /// Network failure or unexpected HTTP status
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be understood
    #[error("Parse error: {0}")]
    Parse(String),

    /// Anything else the provider wants to report
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Whether the failure says something about the provider's health
    /// rather than about the requested track
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Parse(_))
    }
}

/// Errors returned by a [`ScrobbleSink`](crate::ScrobbleSink)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// No credentials configured
    #[error("Sink not configured: {0}")]
    NotConfigured(String),

    /// Service answered with an error status
    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Network failure
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Errors returned by a [`LyricsProvider`](crate::LyricsProvider)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LyricsError {
    /// Network failure or unexpected HTTP status
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be understood
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_and_parse_count_against_health() {
        assert!(ProviderError::transport("timeout").is_transport());
        assert!(ProviderError::parse("bad json").is_transport());
        assert!(!ProviderError::NotFound {
            provider: TrackSource::Piped,
            id: "x".to_string()
        }
        .is_transport());
        assert!(!ProviderError::Unavailable {
            provider: "piped".to_string()
        }
        .is_transport());
    }

    #[test]
    fn messages_name_the_failure() {
        let err = ProviderError::NotFound {
            provider: TrackSource::YouTube,
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Track not found on youtube: abc");

        let err = SinkError::Rejected {
            status: 401,
            message: "Invalid token".to_string(),
        };
        assert_eq!(err.to_string(), "Rejected (401): Invalid token");
    }
}
