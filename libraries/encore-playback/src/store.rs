//! Persistence hooks
//!
//! The controller calls these from detached tasks after each load and volume
//! change. Failures are logged by the caller and never affect playback.

use crate::history::PlayHistory;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use encore_core::Track;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Everything the player remembers between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub last_track: Option<Track>,
    pub last_volume: Option<f32>,
    pub history: PlayHistory,
}

/// Where the controller writes "last track", "last volume" and play history
#[async_trait]
pub trait PlaybackStore: Send + Sync {
    async fn save_last_track(&self, track: &Track) -> Result<(), StoreError>;

    async fn save_last_volume(&self, volume: f32) -> Result<(), StoreError>;

    async fn record_play(&self, track: &Track, played_at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Snapshot of everything stored
    async fn load(&self) -> Result<PersistedState, StoreError>;
}

/// In-memory store (the default when nothing is configured)
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<PersistedState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut PersistedState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

#[async_trait]
impl PlaybackStore for MemoryStore {
    async fn save_last_track(&self, track: &Track) -> Result<(), StoreError> {
        self.with_state(|state| state.last_track = Some(track.clone()));
        Ok(())
    }

    async fn save_last_volume(&self, volume: f32) -> Result<(), StoreError> {
        self.with_state(|state| state.last_volume = Some(volume));
        Ok(())
    }

    async fn record_play(&self, track: &Track, played_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.with_state(|state| state.history.record(track.clone(), played_at));
        Ok(())
    }

    async fn load(&self) -> Result<PersistedState, StoreError> {
        Ok(self.with_state(|state| state.clone()))
    }
}

/// Single JSON document on disk
///
/// Every change rewrites the whole document through a temporary file and a
/// rename, so a crash mid-write leaves the previous version intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: AsyncMutex<PersistedState>,
}

impl JsonFileStore {
    /// Open (or start) the document at `path`
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No state file yet, starting empty");
                PersistedState::default()
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            path = %path.display(),
            history = state.history.len(),
            "Opened state file"
        );

        Ok(Self {
            path,
            state: AsyncMutex::new(state),
        })
    }

    /// Location of the document
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn update(&self, f: impl FnOnce(&mut PersistedState) + Send) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        f(&mut state);
        write_atomically(&self.path, &serde_json::to_vec_pretty(&*state)?).await
    }
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl PlaybackStore for JsonFileStore {
    async fn save_last_track(&self, track: &Track) -> Result<(), StoreError> {
        let track = track.clone();
        self.update(move |state| state.last_track = Some(track)).await
    }

    async fn save_last_volume(&self, volume: f32) -> Result<(), StoreError> {
        self.update(move |state| state.last_volume = Some(volume)).await
    }

    async fn record_play(&self, track: &Track, played_at: DateTime<Utc>) -> Result<(), StoreError> {
        let track = track.clone();
        self.update(move |state| state.history.record(track, played_at))
            .await
    }

    async fn load(&self) -> Result<PersistedState, StoreError> {
        Ok(self.state.lock().await.clone())
    }
}
