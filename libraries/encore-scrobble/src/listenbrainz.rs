//! ListenBrainz scrobble sink.
//!
//! Submits listens through `POST /1/submit-listens` authenticated with a user
//! token (`Authorization: Token <token>`).

use async_trait::async_trait;
use encore_core::{ScrobbleSink, SinkError, Track};
use reqwest::Client;
use serde::Serialize;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

/// Public ListenBrainz API
pub const DEFAULT_LISTENBRAINZ_URL: &str = "https://api.listenbrainz.org";

/// Configuration for [`ListenBrainzSink`]
#[derive(Debug, Clone)]
pub struct ListenBrainzConfig {
    /// API base URL
    pub api_url: String,
    /// User token; the sink stays unconfigured without one
    pub token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for ListenBrainzConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_LISTENBRAINZ_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl ListenBrainzConfig {
    /// Default endpoint with `token`
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct SubmitListens<'a> {
    listen_type: &'static str,
    payload: [Listen<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Listen<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    listened_at: Option<i64>,
    track_metadata: TrackMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct TrackMetadata<'a> {
    artist_name: &'a str,
    track_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    release_name: Option<&'a str>,
    additional_info: AdditionalInfo,
}

#[derive(Debug, Serialize)]
struct AdditionalInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u64>,
    submission_client: &'static str,
}

impl<'a> SubmitListens<'a> {
    fn new(listen_type: &'static str, track: &'a Track, listened_at: Option<i64>) -> Self {
        Self {
            listen_type,
            payload: [Listen {
                listened_at,
                track_metadata: TrackMetadata {
                    artist_name: &track.artist,
                    track_name: &track.title,
                    release_name: track.album.as_deref(),
                    additional_info: AdditionalInfo {
                        duration_ms: (track.duration_ms > 0).then_some(track.duration_ms),
                        submission_client: "Encore",
                    },
                },
            }],
        }
    }
}

/// Scrobble sink for ListenBrainz.
///
/// The token can be replaced at runtime with [`set_token`](Self::set_token).
pub struct ListenBrainzSink {
    http: Client,
    api_url: String,
    token: RwLock<Option<String>>,
}

impl ListenBrainzSink {
    /// Create a sink from `config`
    pub fn new(config: ListenBrainzConfig) -> Result<Self, SinkError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("Encore/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: RwLock::new(normalize_token(config.token)),
        })
    }

    /// Replace (or clear) the user token
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = normalize_token(token);
    }

    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn submit(&self, body: &SubmitListens<'_>) -> Result<(), SinkError> {
        let token = self
            .token()
            .ok_or_else(|| SinkError::NotConfigured("ListenBrainz token missing".to_string()))?;
        let url = format!("{}/1/submit-listens", self.api_url);

        debug!(listen_type = body.listen_type, "Submitting to ListenBrainz");

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Token {token}"))
            .json(body)
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(SinkError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn normalize_token(token: Option<String>) -> Option<String> {
    token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl ScrobbleSink for ListenBrainzSink {
    fn name(&self) -> &str {
        "ListenBrainz"
    }

    fn is_configured(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    async fn update_now_playing(&self, track: &Track) -> Result<(), SinkError> {
        self.submit(&SubmitListens::new("playing_now", track, None))
            .await
    }

    async fn scrobble(&self, track: &Track, timestamp_ms: i64) -> Result<(), SinkError> {
        self.submit(&SubmitListens::new("single", track, Some(timestamp_ms / 1000)))
            .await
    }
}
