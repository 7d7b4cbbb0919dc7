//! LRCLIB lyrics provider (<https://lrclib.net>).

use crate::lrc::parse_lrc;
use async_trait::async_trait;
use encore_core::{Lyrics, LyricsError, LyricsProvider};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Public LRCLIB instance
pub const DEFAULT_LRCLIB_URL: &str = "https://lrclib.net";

/// Placeholder text for tracks LRCLIB marks as instrumental
const INSTRUMENTAL: &str = "[Instrumental]";

/// Configuration for [`LrcLibProvider`]
#[derive(Debug, Clone)]
pub struct LrcLibConfig {
    /// API base URL
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for LrcLibConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LRCLIB_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Lyrics from LRCLIB, with synced lines when available.
pub struct LrcLibProvider {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LrcLibResponse {
    #[serde(default)]
    track_name: Option<String>,
    #[serde(default)]
    artist_name: Option<String>,
    #[serde(default)]
    plain_lyrics: Option<String>,
    #[serde(default)]
    synced_lyrics: Option<String>,
    #[serde(default)]
    instrumental: bool,
}

impl LrcLibProvider {
    /// Create a provider for the configured instance
    pub fn new(config: LrcLibConfig) -> Result<Self, LyricsError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("Encore/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LyricsError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl LrcLibResponse {
    fn into_lyrics(self, title: &str, artist: &str, source: &str) -> Option<Lyrics> {
        let track_title = self.track_name.unwrap_or_else(|| title.to_string());
        let artist = self.artist_name.unwrap_or_else(|| artist.to_string());

        if self.instrumental {
            return Some(Lyrics {
                track_title,
                artist,
                plain_text: INSTRUMENTAL.to_string(),
                synced: None,
                source: source.to_string(),
            });
        }

        let synced = self
            .synced_lyrics
            .as_deref()
            .map(parse_lrc)
            .filter(|lines| !lines.is_empty());

        let plain_text = match self.plain_lyrics.filter(|text| !text.trim().is_empty()) {
            Some(text) => text,
            None => synced
                .as_ref()
                .map(|lines| {
                    lines
                        .iter()
                        .map(|line| line.text.as_str())
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .unwrap_or_default(),
        };

        if plain_text.is_empty() && synced.is_none() {
            return None;
        }

        Some(Lyrics {
            track_title,
            artist,
            plain_text,
            synced,
            source: source.to_string(),
        })
    }
}

#[async_trait]
impl LyricsProvider for LrcLibProvider {
    fn name(&self) -> &str {
        "LRCLIB"
    }

    async fn search_lyrics(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<Option<Lyrics>, LyricsError> {
        let url = format!("{}/api/get", self.base_url);
        debug!(title = %title, artist = %artist, "Querying LRCLIB");

        let response = self
            .http
            .get(&url)
            .query(&[("artist_name", artist), ("track_name", title)])
            .send()
            .await
            .map_err(|e| LyricsError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LyricsError::Transport(format!("HTTP {}", status.as_u16())));
        }

        let body: LrcLibResponse = response
            .json()
            .await
            .map_err(|e| LyricsError::Parse(e.to_string()))?;

        Ok(body.into_lyrics(title, artist, self.name()))
    }
}
