/// Composition root: builds every service from the configuration
use crate::config::AppConfig;
use crate::error::Result;
use encore_core::{LyricsProvider, ScrobbleSink, StreamProvider};
use encore_lyrics::{LrcLibConfig, LrcLibProvider, LyricsAggregator};
use encore_playback::{JsonFileStore, PlaybackController, PlaybackStore};
use encore_resolver::{PipedConfig, PipedProvider, ProviderResolver};
use encore_scrobble::{ListenBrainzConfig, ListenBrainzSink, ScrobbleManager};
use std::sync::Arc;
use tracing::info;

pub fn build_resolver(config: &AppConfig) -> Result<ProviderResolver> {
    let mut providers: Vec<Arc<dyn StreamProvider>> = Vec::new();
    for instance in &config.providers.piped_instances {
        let provider =
            PipedProvider::new(PipedConfig::new(instance).with_timeout(config.providers.timeout()))?;
        info!(provider = provider.name(), "Stream provider ready");
        providers.push(Arc::new(provider));
    }

    Ok(ProviderResolver::new(providers)
        .with_fallback_search_limit(config.providers.fallback_search_limit))
}

/// Lyrics chain, or `None` when lyrics are disabled
pub fn build_lyrics(config: &AppConfig) -> Result<Option<Arc<dyn LyricsProvider>>> {
    if !config.lyrics.enabled {
        return Ok(None);
    }

    let lrclib = LrcLibProvider::new(LrcLibConfig {
        base_url: config.lyrics.lrclib_url.clone(),
        ..LrcLibConfig::default()
    })?;
    let chain: Vec<Arc<dyn LyricsProvider>> = vec![Arc::new(lrclib)];
    let aggregator: Arc<dyn LyricsProvider> = Arc::new(LyricsAggregator::new(chain));
    Ok(Some(aggregator))
}

pub fn build_scrobbler(config: &AppConfig) -> Result<ScrobbleManager> {
    let listenbrainz = ListenBrainzSink::new(ListenBrainzConfig {
        api_url: config.scrobble.listenbrainz_url.clone(),
        token: config.scrobble.listenbrainz_token.clone(),
        ..ListenBrainzConfig::default()
    })?;

    if listenbrainz.is_configured() {
        info!("ListenBrainz scrobbling enabled");
    } else {
        info!("No ListenBrainz token, scrobbling disabled");
    }

    let sinks: Vec<Arc<dyn ScrobbleSink>> = vec![Arc::new(listenbrainz)];
    Ok(ScrobbleManager::new(sinks))
}

pub async fn open_store(config: &AppConfig) -> Result<Arc<JsonFileStore>> {
    Ok(Arc::new(JsonFileStore::open(&config.state_file).await?))
}

/// Controller wired to every configured service
///
/// Restores the last persisted volume. Must run inside the tokio runtime.
pub async fn build_controller(config: &AppConfig) -> Result<PlaybackController> {
    let store = open_store(config).await?;
    let persisted = store.load().await?;

    let mut builder = PlaybackController::builder()
        .resolver(build_resolver(config)?)
        .scrobbler(build_scrobbler(config)?)
        .store(store)
        .config(config.playback.clone());
    if let Some(lyrics) = build_lyrics(config)? {
        builder = builder.lyrics(lyrics);
    }

    let controller = builder.build();
    if let Some(volume) = persisted.last_volume {
        controller.set_volume(volume);
    }
    Ok(controller)
}
