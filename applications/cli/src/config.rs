/// CLI configuration
use crate::error::{AppError, Result};
use encore_lyrics::DEFAULT_LRCLIB_URL;
use encore_playback::PlaybackConfig;
use encore_resolver::{DEFAULT_FALLBACK_SEARCH_LIMIT, DEFAULT_PIPED_URL};
use encore_scrobble::DEFAULT_LISTENBRAINZ_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File looked up in the working directory when no `--config` is given
const DEFAULT_CONFIG_NAME: &str = "encore";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_providers")]
    pub providers: ProviderSettings,

    #[serde(default = "default_lyrics")]
    pub lyrics: LyricsSettings,

    #[serde(default = "default_scrobble")]
    pub scrobble: ScrobbleSettings,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderSettings {
    /// Piped API instances, highest priority first
    #[serde(default = "default_piped_instances")]
    pub piped_instances: Vec<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_fallback_search_limit")]
    pub fallback_search_limit: usize,
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LyricsSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_lrclib_url")]
    pub lrclib_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScrobbleSettings {
    #[serde(default = "default_listenbrainz_url")]
    pub listenbrainz_url: String,

    /// ListenBrainz user token; scrobbling is off without one
    #[serde(default)]
    pub listenbrainz_token: Option<String>,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// `path` must exist when given; otherwise `encore.toml` in the working
    /// directory is used if present. `ENCORE__SECTION__KEY` variables override
    /// both.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        settings = match path {
            Some(path) => settings.add_source(config::File::from(path)),
            None => settings.add_source(config::File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        settings = settings.add_source(
            config::Environment::with_prefix("ENCORE")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("providers.piped_instances"),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.providers.piped_instances.is_empty() {
            return Err(AppError::Config(
                "At least one provider instance is required (set providers.piped_instances)"
                    .to_string(),
            ));
        }

        if self.providers.timeout_secs == 0 {
            return Err(AppError::Config(
                "providers.timeout_secs must be greater than zero".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.playback.volume) {
            return Err(AppError::Config(format!(
                "playback.volume must be between 0.0 and 1.0, got {}",
                self.playback.volume
            )));
        }

        if !(1.0..=2.0).contains(&self.playback.volume_boost) {
            return Err(AppError::Config(format!(
                "playback.volume_boost must be between 1.0 and 2.0, got {}",
                self.playback.volume_boost
            )));
        }

        Ok(())
    }
}

// Default values
fn default_providers() -> ProviderSettings {
    ProviderSettings {
        piped_instances: default_piped_instances(),
        timeout_secs: default_timeout_secs(),
        fallback_search_limit: default_fallback_search_limit(),
    }
}

fn default_piped_instances() -> Vec<String> {
    vec![DEFAULT_PIPED_URL.to_string()]
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_fallback_search_limit() -> usize {
    DEFAULT_FALLBACK_SEARCH_LIMIT
}

fn default_lyrics() -> LyricsSettings {
    LyricsSettings {
        enabled: default_enabled(),
        lrclib_url: default_lrclib_url(),
    }
}

fn default_enabled() -> bool {
    true
}

fn default_lrclib_url() -> String {
    DEFAULT_LRCLIB_URL.to_string()
}

fn default_scrobble() -> ScrobbleSettings {
    ScrobbleSettings {
        listenbrainz_url: default_listenbrainz_url(),
        listenbrainz_token: None,
    }
}

fn default_listenbrainz_url() -> String {
    DEFAULT_LISTENBRAINZ_URL.to_string()
}

fn default_state_file() -> PathBuf {
    PathBuf::from("./data/encore-state.json")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            lyrics: default_lyrics(),
            scrobble: default_scrobble(),
            playback: PlaybackConfig::default(),
            state_file: default_state_file(),
        }
    }
}
