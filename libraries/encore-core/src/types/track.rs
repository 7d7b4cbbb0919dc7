//! Track domain type
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Content back-end a track identifier belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackSource {
    /// YouTube (direct extraction)
    YouTube,

    /// SoundCloud
    SoundCloud,

    /// Piped, a YouTube proxy front-end
    Piped,

    /// File on the local machine
    Local,
}

impl TrackSource {
    /// Stable lowercase name, used in logs and configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackSource::YouTube => "youtube",
            TrackSource::SoundCloud => "soundcloud",
            TrackSource::Piped => "piped",
            TrackSource::Local => "local",
        }
    }
}

impl fmt::Display for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TrackSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "youtube" => Ok(TrackSource::YouTube),
            "soundcloud" => Ok(TrackSource::SoundCloud),
            "piped" => Ok(TrackSource::Piped),
            "local" => Ok(TrackSource::Local),
            other => Err(format!("unknown track source: {other}")),
        }
    }
}

/// Playable track
///
/// Created by a provider on search or lookup and treated as an immutable value
/// afterwards. The identifier is only meaningful together with `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Source-scoped identifier
    pub id: String,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Album name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,

    /// Track duration in milliseconds (authoritative once known, 0 if unknown)
    pub duration_ms: u64,

    /// Artwork URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    /// Back-end the identifier belongs to
    pub source: TrackSource,
}

impl Track {
    /// Create a track with the required metadata
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        duration_ms: u64,
        source: TrackSource,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: None,
            duration_ms,
            thumbnail_url: None,
            source,
        }
    }

    /// Set the album name
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Set the artwork URL
    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    /// Get the track duration as a Duration
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Query used to find this track on another back-end
    pub fn search_query(&self) -> String {
        format!("{} {}", self.title, self.artist)
    }

    /// Case-insensitive `(title, artist)` pair used to merge search results
    pub fn dedup_key(&self) -> (String, String) {
        (self.title.to_lowercase(), self.artist.to_lowercase())
    }
}
