//! Priority-ordered provider resolution with fallback.

use crate::error::ResolverError;
use encore_core::{ProviderError, StreamInfo, StreamProvider, Track, TrackSource};
use futures_util::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Number of candidates requested from each provider during fallback
pub const DEFAULT_FALLBACK_SEARCH_LIMIT: usize = 5;

/// Routes search and stream requests across an ordered list of providers.
///
/// Provider order is fixed at construction and doubles as priority. Each call
/// consults [`StreamProvider::is_available`] before touching a provider, so a
/// benched provider costs nothing.
#[derive(Clone)]
pub struct ProviderResolver {
    providers: Vec<Arc<dyn StreamProvider>>,
    fallback_search_limit: usize,
}

impl ProviderResolver {
    /// Create a resolver over `providers`, highest priority first
    pub fn new(providers: Vec<Arc<dyn StreamProvider>>) -> Self {
        Self {
            providers,
            fallback_search_limit: DEFAULT_FALLBACK_SEARCH_LIMIT,
        }
    }

    /// Set how many candidates fallback searches request
    pub fn with_fallback_search_limit(mut self, limit: usize) -> Self {
        self.fallback_search_limit = limit.max(1);
        self
    }

    /// Configured providers in priority order
    pub fn providers(&self) -> &[Arc<dyn StreamProvider>] {
        &self.providers
    }

    /// Search providers in priority order and return the first non-empty result.
    ///
    /// Returns an empty list when nothing matched. A `NotFound` answer counts
    /// as a miss; errors only when every provider that was attempted failed.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>, ResolverError> {
        let mut attempted = 0usize;
        let mut errors = Vec::new();

        for provider in self.available() {
            attempted += 1;
            match provider.search(query, limit).await {
                Ok(tracks) if !tracks.is_empty() => {
                    debug!(
                        provider = provider.name(),
                        query = %query,
                        count = tracks.len(),
                        "Search answered"
                    );
                    return Ok(tracks.into_iter().take(limit).collect());
                }
                Ok(_) | Err(ProviderError::NotFound { .. }) => {
                    debug!(provider = provider.name(), query = %query, "Search returned nothing");
                }
                Err(e) => {
                    warn!(provider = provider.name(), query = %query, error = %e, "Search failed");
                    errors.push(format!("{}: {}", provider.name(), e));
                }
            }
        }

        if attempted > 0 && errors.len() == attempted {
            return Err(ResolverError::SearchFailed { errors });
        }
        Ok(Vec::new())
    }

    /// Search every available provider concurrently.
    ///
    /// Results are concatenated in priority order and de-duplicated by
    /// case-insensitive `(title, artist)`, keeping the first occurrence.
    /// Failing providers are logged and skipped.
    pub async fn search_all(&self, query: &str, limit_per_provider: usize) -> Vec<Track> {
        let providers: Vec<_> = self.available().collect();
        let results = join_all(
            providers
                .iter()
                .map(|provider| provider.search(query, limit_per_provider)),
        )
        .await;

        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for (provider, result) in providers.iter().zip(results) {
            match result {
                Ok(tracks) => {
                    for track in tracks.into_iter().take(limit_per_provider) {
                        if seen.insert(track.dedup_key()) {
                            merged.push(track);
                        }
                    }
                }
                Err(e) => {
                    warn!(provider = provider.name(), query = %query, error = %e, "Search failed, skipping provider");
                }
            }
        }

        debug!(query = %query, count = merged.len(), "Merged search results");
        merged
    }

    /// Resolve a stream when only an identifier is known.
    ///
    /// The provider matching `preferred` (or the highest-priority provider
    /// when no source is given) is asked first. If it cannot serve the track,
    /// its metadata is looked up and the remaining providers are searched for
    /// `"<title> <artist>"`.
    pub async fn resolve_stream(
        &self,
        track_id: &str,
        preferred: Option<TrackSource>,
    ) -> Result<StreamInfo, ResolverError> {
        let primary = self.primary_index(preferred);
        let mut errors = Vec::new();

        if let Some(stream) = self.try_primary(primary, track_id, &mut errors).await {
            return Ok(stream);
        }

        let track = match self.get_track_info(track_id, preferred).await {
            Ok(track) => track,
            Err(e) => {
                errors.extend(e.errors().iter().cloned());
                warn!(track_id = %track_id, "No metadata for fallback lookup");
                return Err(ResolverError::NoStreamAvailable { errors });
            }
        };

        self.fallback(&track, primary, errors).await
    }

    /// Resolve a stream for a track whose metadata is already known.
    pub async fn resolve_track(&self, track: &Track) -> Result<StreamInfo, ResolverError> {
        let primary = self.primary_index(Some(track.source));
        let mut errors = Vec::new();

        if let Some(stream) = self.try_primary(primary, &track.id, &mut errors).await {
            return Ok(stream);
        }

        self.fallback(track, primary, errors).await
    }

    /// Look up track metadata, preferred source first, then priority order.
    pub async fn get_track_info(
        &self,
        track_id: &str,
        preferred: Option<TrackSource>,
    ) -> Result<Track, ResolverError> {
        let mut errors = Vec::new();

        for index in self.preferred_order(preferred) {
            let provider = &self.providers[index];
            if !provider.is_available() {
                continue;
            }
            match provider.get_track_info(track_id).await {
                Ok(track) => return Ok(track),
                Err(e) => {
                    debug!(provider = provider.name(), track_id = %track_id, error = %e, "Track info lookup failed");
                    errors.push(format!("{}: {}", provider.name(), e));
                }
            }
        }

        Err(ResolverError::TrackInfoUnavailable { errors })
    }

    fn available(&self) -> impl Iterator<Item = &Arc<dyn StreamProvider>> {
        self.providers.iter().filter(|provider| {
            let available = provider.is_available();
            if !available {
                debug!(provider = provider.name(), "Skipping unavailable provider");
            }
            available
        })
    }

    /// Index of the provider that owns `source`'s identifiers.
    ///
    /// With no declared source the highest-priority provider is used. Sources
    /// no provider serves (local files) have no primary.
    fn primary_index(&self, source: Option<TrackSource>) -> Option<usize> {
        match source {
            Some(source) => self.providers.iter().position(|p| p.source() == source),
            None if self.providers.is_empty() => None,
            None => Some(0),
        }
    }

    fn preferred_order(&self, preferred: Option<TrackSource>) -> Vec<usize> {
        let first = preferred.and_then(|source| self.primary_index(Some(source)));
        first
            .into_iter()
            .chain((0..self.providers.len()).filter(move |&i| Some(i) != first))
            .collect()
    }

    async fn try_primary(
        &self,
        primary: Option<usize>,
        track_id: &str,
        errors: &mut Vec<String>,
    ) -> Option<StreamInfo> {
        let provider = &self.providers[primary?];
        if !provider.is_available() {
            errors.push(format!("{}: unavailable", provider.name()));
            return None;
        }

        match provider.get_stream(track_id).await {
            Ok(stream) => {
                debug!(provider = provider.name(), track_id = %track_id, "Stream resolved");
                Some(stream)
            }
            Err(e) => {
                warn!(provider = provider.name(), track_id = %track_id, error = %e, "Stream resolution failed, falling back");
                errors.push(format!("{}: {}", provider.name(), e));
                None
            }
        }
    }

    /// Re-search every other available provider and resolve the first match.
    async fn fallback(
        &self,
        track: &Track,
        exclude: Option<usize>,
        mut errors: Vec<String>,
    ) -> Result<StreamInfo, ResolverError> {
        let query = track.search_query();

        for (index, provider) in self.providers.iter().enumerate() {
            if Some(index) == exclude || !provider.is_available() {
                continue;
            }

            let candidate = match provider.search(&query, self.fallback_search_limit).await {
                Ok(candidates) => candidates.into_iter().next(),
                Err(e) => {
                    errors.push(format!("{}: {}", provider.name(), e));
                    continue;
                }
            };
            let Some(candidate) = candidate else {
                errors.push(format!("{}: no match for '{}'", provider.name(), query));
                continue;
            };

            match provider.get_stream(&candidate.id).await {
                Ok(stream) => {
                    info!(
                        provider = provider.name(),
                        original_id = %track.id,
                        fallback_id = %candidate.id,
                        "Resolved stream through fallback"
                    );
                    return Ok(stream);
                }
                Err(e) => errors.push(format!("{}: {}", provider.name(), e)),
            }
        }

        warn!(track_id = %track.id, attempts = errors.len(), "Every provider exhausted");
        Err(ResolverError::NoStreamAvailable { errors })
    }
}

impl std::fmt::Debug for ProviderResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderResolver")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("fallback_search_limit", &self.fallback_search_limit)
            .finish()
    }
}
