use crate::types::TrackSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resolved playable stream for a track
///
/// Short-lived: the expiry is advisory and never enforced here. Callers
/// re-resolve when playback of a stale URL fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Identifier of the track this stream plays (in `source`'s id space)
    pub track_id: String,

    /// Playable URL
    pub url: String,

    /// MIME type reported by the back-end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Bitrate in bits per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,

    /// When the URL stops working, if the back-end says so
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Back-end that produced the stream
    pub source: TrackSource,
}

impl StreamInfo {
    /// Create stream info with only the required fields
    pub fn new(track_id: impl Into<String>, url: impl Into<String>, source: TrackSource) -> Self {
        Self {
            track_id: track_id.into(),
            url: url.into(),
            mime_type: None,
            bitrate: None,
            expires_at: None,
            source,
        }
    }

    /// Whether the advertised expiry has passed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_is_advisory() {
        let now = Utc::now();
        let mut info = StreamInfo::new("id", "https://example.com/a.m4a", TrackSource::Piped);
        assert!(!info.is_expired(now));

        info.expires_at = Some(now - Duration::seconds(1));
        assert!(info.is_expired(now));

        info.expires_at = Some(now + Duration::hours(6));
        assert!(!info.is_expired(now));
    }
}
