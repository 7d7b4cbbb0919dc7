//! Play history tracking
//!
//! Maintains a bounded, de-duplicated list of played tracks, newest first.

use chrono::{DateTime, Utc};
use encore_core::Track;
use rand::seq::SliceRandom;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of remembered plays
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// One remembered play
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub track: Track,
    pub played_at: DateTime<Utc>,
}

/// Play history with bounded size
///
/// Replaying a track moves it to the front instead of adding a second entry.
/// When full, the oldest entry is discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayHistory {
    /// History buffer (most recent = front)
    entries: VecDeque<HistoryEntry>,

    /// Maximum history size
    max_size: usize,
}

impl PlayHistory {
    /// Create new history with specified maximum size
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_size.min(DEFAULT_HISTORY_SIZE)),
            max_size,
        }
    }

    /// Record that `track` was played at `played_at`
    pub fn record(&mut self, track: Track, played_at: DateTime<Utc>) {
        self.entries.retain(|entry| entry.track.id != track.id);
        self.entries.push_front(HistoryEntry { track, played_at });
        self.entries.truncate(self.max_size);
    }

    /// All entries, newest first
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Up to `count` most recent tracks
    pub fn recent(&self, count: usize) -> Vec<&Track> {
        self.entries.iter().take(count).map(|entry| &entry.track).collect()
    }

    /// Random "play again" suggestions, skipping `exclude_id`
    pub fn play_again(&self, count: usize, exclude_id: Option<&str>) -> Vec<Track> {
        let candidates: Vec<&HistoryEntry> = self
            .entries
            .iter()
            .filter(|entry| Some(entry.track.id.as_str()) != exclude_id)
            .collect();

        let mut rng = thread_rng();
        candidates
            .choose_multiple(&mut rng, count)
            .map(|entry| entry.track.clone())
            .collect()
    }

    /// Get number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if history is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Get maximum history size
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Default for PlayHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}
