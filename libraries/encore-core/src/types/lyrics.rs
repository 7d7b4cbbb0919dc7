use serde::{Deserialize, Serialize};

/// Lyrics for a track, plain and optionally time-synced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lyrics {
    /// Title as reported by the lyrics back-end
    pub track_title: String,

    /// Artist as reported by the lyrics back-end
    pub artist: String,

    /// Plain text lyrics
    pub plain_text: String,

    /// Time-synced lines, ordered by time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced: Option<Vec<SyncedLine>>,

    /// Name of the provider that returned these lyrics
    pub source: String,
}

/// One line of synced lyrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedLine {
    /// Start time in milliseconds
    pub time_ms: u64,

    /// Line text
    pub text: String,
}

impl Lyrics {
    /// Whether the lyrics carry timing information
    pub fn is_synced(&self) -> bool {
        self.synced.as_ref().is_some_and(|lines| !lines.is_empty())
    }

    /// Line active at `position_ms` (the last line starting at or before it)
    pub fn line_at(&self, position_ms: u64) -> Option<&SyncedLine> {
        let lines = self.synced.as_ref()?;
        let upcoming = lines.partition_point(|line| line.time_ms <= position_ms);
        upcoming.checked_sub(1).map(|index| &lines[index])
    }
}
