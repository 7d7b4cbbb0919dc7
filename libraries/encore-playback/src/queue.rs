//! Play queue
//!
//! Append-only list of resolved tracks with a cursor. Entries are unique by
//! track id: enqueueing a known track refreshes its stream URL and moves the
//! cursor to it instead of adding a duplicate.

use crate::state::QueueEntry;
use encore_core::Track;

/// Play queue with a cursor
#[derive(Debug, Clone, Default)]
pub struct Queue {
    entries: Vec<QueueEntry>,
    cursor: Option<usize>,
}

impl Queue {
    /// Create empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `track` (or refresh it if already queued) and point the cursor at it
    ///
    /// Returns the entry's index.
    pub fn enqueue(&mut self, track: Track, stream_url: String) -> usize {
        let index = match self.position_of(&track.id) {
            Some(index) => {
                self.entries[index] = QueueEntry { track, stream_url };
                index
            }
            None => {
                self.entries.push(QueueEntry { track, stream_url });
                self.entries.len() - 1
            }
        };
        self.cursor = Some(index);
        index
    }

    /// Index of the entry for `track_id`
    pub fn position_of(&self, track_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.track.id == track_id)
    }

    /// Entry under the cursor
    pub fn current(&self) -> Option<&QueueEntry> {
        self.entries.get(self.cursor?)
    }

    /// Cursor position
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Move the cursor; `None` if `index` is out of bounds
    pub fn set_cursor(&mut self, index: usize) -> Option<&QueueEntry> {
        if index >= self.entries.len() {
            return None;
        }
        self.cursor = Some(index);
        self.entries.get(index)
    }

    /// Index after the cursor, wrapping to the start
    pub fn next_index(&self) -> Option<usize> {
        let len = self.entries.len();
        if len == 0 {
            return None;
        }
        Some(self.cursor.map_or(0, |cursor| (cursor + 1) % len))
    }

    /// Index before the cursor, wrapping to the end
    pub fn previous_index(&self) -> Option<usize> {
        let len = self.entries.len();
        if len == 0 {
            return None;
        }
        Some(self.cursor.map_or(0, |cursor| (cursor + len - 1) % len))
    }

    /// Whether the cursor is on the last entry
    pub fn is_at_end(&self) -> bool {
        self.cursor
            .is_some_and(|cursor| cursor + 1 >= self.entries.len())
    }

    /// Entry at `index`
    pub fn get(&self, index: usize) -> Option<&QueueEntry> {
        self.entries.get(index)
    }

    /// All entries in order
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry and reset the cursor
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}
