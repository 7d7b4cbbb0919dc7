//! Ordered lyrics lookup across several providers.

use async_trait::async_trait;
use encore_core::{Lyrics, LyricsError, LyricsProvider};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tries providers in order until one has lyrics.
///
/// Implements [`LyricsProvider`] itself so callers depend only on the
/// capability. A failing provider is logged and skipped; the aggregate only
/// errors when every provider that was asked failed.
#[derive(Clone, Default)]
pub struct LyricsAggregator {
    providers: Vec<Arc<dyn LyricsProvider>>,
}

impl LyricsAggregator {
    /// Aggregate `providers`, highest priority first
    pub fn new(providers: Vec<Arc<dyn LyricsProvider>>) -> Self {
        Self { providers }
    }

    /// Number of configured providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is configured
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl LyricsProvider for LyricsAggregator {
    fn name(&self) -> &str {
        "aggregator"
    }

    async fn search_lyrics(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<Option<Lyrics>, LyricsError> {
        let mut attempted = 0usize;
        let mut failed = 0usize;
        let mut last_error = None;

        for provider in &self.providers {
            if !provider.is_available() {
                continue;
            }
            attempted += 1;

            match provider.search_lyrics(title, artist).await {
                Ok(Some(lyrics)) => {
                    debug!(provider = provider.name(), title = %title, "Lyrics found");
                    return Ok(Some(lyrics));
                }
                Ok(None) => {
                    debug!(provider = provider.name(), title = %title, "No lyrics");
                }
                Err(e) => {
                    warn!(provider = provider.name(), title = %title, error = %e, "Lyrics lookup failed");
                    failed += 1;
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if failed == attempted => Err(e),
            _ => Ok(None),
        }
    }

    fn is_available(&self) -> bool {
        self.providers.iter().any(|provider| provider.is_available())
    }
}
