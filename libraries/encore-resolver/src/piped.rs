//! Piped (YouTube proxy) stream provider.
//!
//! Speaks the public Piped JSON API:
//! - `GET /search?q=<query>&filter=music_songs`
//! - `GET /streams/<video id>`

use crate::health::ProviderHealth;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use encore_core::{ProviderError, StreamInfo, StreamProvider, Track, TrackSource};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Public instance used when nothing else is configured
pub const DEFAULT_PIPED_URL: &str = "https://pipedapi.kavin.rocks";

/// Suffix YouTube appends to auto-generated artist channels
const TOPIC_SUFFIX: &str = " - Topic";

/// Configuration for one Piped instance.
#[derive(Debug, Clone)]
pub struct PipedConfig {
    /// API base URL (no trailing slash needed)
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,

    /// Whether the provider takes part in resolution at all
    pub enabled: bool,
}

impl PipedConfig {
    /// Configuration for the instance at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(15),
            enabled: true,
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for PipedConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PIPED_URL)
    }
}

/// Stream provider backed by a Piped instance.
pub struct PipedProvider {
    http: Client,
    base_url: Url,
    name: String,
    enabled: bool,
    health: ProviderHealth,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    url: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    uploader_name: Option<String>,
    #[serde(default)]
    duration: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamsResponse {
    title: String,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    duration: i64,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    audio_streams: Vec<AudioStream>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AudioStream {
    url: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    bitrate: Option<u32>,
}

impl PipedProvider {
    /// Create a provider for the configured instance
    pub fn new(config: PipedConfig) -> Result<Self, ProviderError> {
        let trimmed = config.base_url.trim_end_matches('/');
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(ProviderError::Other(format!(
                "Piped URL must start with http:// or https://: {}",
                config.base_url
            )));
        }
        // Trailing slash so relative joins keep any path prefix
        let base_url = Url::parse(&format!("{trimmed}/"))
            .map_err(|e| ProviderError::Other(format!("Invalid Piped URL: {e}")))?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("Encore/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::transport(e.to_string()))?;

        let name = match base_url.host_str() {
            Some(host) => format!("piped@{host}"),
            None => "piped".to_string(),
        };

        Ok(Self {
            http,
            base_url,
            health: ProviderHealth::new(name.clone()),
            name,
            enabled: config.enabled,
        })
    }

    /// Health gate of this instance
    pub fn health(&self) -> &ProviderHealth {
        &self.health
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        id: &str,
    ) -> Result<T, ProviderError> {
        let result = self.fetch(path, query, id).await;
        match &result {
            Ok(_) => self.health.record_success(),
            Err(e) if e.is_transport() => self.health.record_failure(),
            Err(_) => {}
        }
        result
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        id: &str,
    ) -> Result<T, ProviderError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ProviderError::Other(format!("Invalid request path {path}: {e}")))?;

        debug!(provider = %self.name, url = %url, "Piped request");

        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| ProviderError::transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            return Err(ProviderError::NotFound {
                provider: TrackSource::Piped,
                id: id.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ProviderError::transport(format!("HTTP {}", status.as_u16())));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::parse(e.to_string()))
    }

    /// Extract the `v` parameter from a relative `/watch?v=...` link
    fn video_id(&self, link: &str) -> Option<String> {
        let url = self.base_url.join(link).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
            .filter(|id| !id.is_empty())
    }
}

fn clean_artist(uploader: Option<String>) -> String {
    let uploader = uploader.unwrap_or_default();
    uploader
        .strip_suffix(TOPIC_SUFFIX)
        .unwrap_or(&uploader)
        .to_string()
}

fn seconds_to_ms(seconds: i64) -> u64 {
    u64::try_from(seconds).unwrap_or(0).saturating_mul(1000)
}

/// Read the `expire` query parameter (Unix seconds) of a stream URL
fn stream_expiry(stream_url: &str) -> Option<DateTime<Utc>> {
    let url = Url::parse(stream_url).ok()?;
    let (_, value) = url.query_pairs().find(|(key, _)| key == "expire")?;
    let seconds = value.parse::<i64>().ok()?;
    Utc.timestamp_opt(seconds, 0).single()
}

#[async_trait]
impl StreamProvider for PipedProvider {
    fn source(&self) -> TrackSource {
        TrackSource::Piped
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>, ProviderError> {
        let response: SearchResponse = self
            .get_json("search", &[("q", query), ("filter", "music_songs")], query)
            .await?;

        let tracks = response
            .items
            .into_iter()
            .filter(|item| item.kind == "stream")
            .filter_map(|item| {
                let id = self.video_id(&item.url)?;
                let mut track = Track::new(
                    id,
                    item.title,
                    clean_artist(item.uploader_name),
                    seconds_to_ms(item.duration),
                    TrackSource::Piped,
                );
                track.thumbnail_url = item.thumbnail;
                Some(track)
            })
            .take(limit)
            .collect();

        Ok(tracks)
    }

    async fn get_stream(&self, track_id: &str) -> Result<StreamInfo, ProviderError> {
        let response: StreamsResponse = self
            .get_json(&format!("streams/{track_id}"), &[], track_id)
            .await?;

        let best = response
            .audio_streams
            .into_iter()
            .max_by_key(|stream| stream.bitrate.unwrap_or(0))
            .ok_or_else(|| ProviderError::NotFound {
                provider: TrackSource::Piped,
                id: track_id.to_string(),
            })?;

        Ok(StreamInfo {
            track_id: track_id.to_string(),
            expires_at: stream_expiry(&best.url),
            url: best.url,
            mime_type: best.mime_type,
            bitrate: best.bitrate,
            source: TrackSource::Piped,
        })
    }

    async fn get_track_info(&self, track_id: &str) -> Result<Track, ProviderError> {
        let response: StreamsResponse = self
            .get_json(&format!("streams/{track_id}"), &[], track_id)
            .await?;

        let mut track = Track::new(
            track_id,
            response.title,
            clean_artist(response.uploader),
            seconds_to_ms(response.duration),
            TrackSource::Piped,
        );
        track.thumbnail_url = response.thumbnail_url;
        Ok(track)
    }

    fn is_available(&self) -> bool {
        self.enabled && self.health.is_available()
    }
}
