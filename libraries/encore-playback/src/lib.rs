//! Encore Playback
//!
//! The playback state machine sitting between a play queue and an externally
//! supplied audio engine.
//!
//! # Features
//!
//! - **Single-flight loading**: one track hand-off at a time, extra requests are rejected
//! - **Queue**: de-duplicated by track id, circular next/previous, random next in shuffle
//! - **State merge**: engine-owned fields overwrite, controller-owned fields survive
//! - **Timeline**: derives scrobble events from the merged state stream
//! - **Side effects**: lyrics, last-track, volume and history writes run detached
//!
//! # Example
//!
//! ```ignore
//! use encore_playback::{PlaybackController, SimulatedEngine};
//! use std::sync::Arc;
//!
//! let controller = PlaybackController::builder()
//!     .resolver(resolver)
//!     .build();
//! controller.set_audio_player(Arc::new(SimulatedEngine::new()));
//!
//! controller.play_track(track).await?;
//! let mut updates = controller.subscribe();
//! while updates.changed().await.is_ok() {
//!     println!("{:?}", updates.borrow().phase);
//! }
//! ```

mod controller;
mod engine;
mod error;
mod history;
mod queue;
mod shuffle;
mod simulated;
mod state;
mod store;
mod timeline;
mod types;

pub use controller::{PlaybackController, PlaybackControllerBuilder};
pub use engine::{AudioEngine, EngineError, EngineState};
pub use error::{PlaybackError, Result};
pub use history::{HistoryEntry, PlayHistory, DEFAULT_HISTORY_SIZE};
pub use queue::Queue;
pub use shuffle::pick_shuffled_index;
pub use simulated::SimulatedEngine;
pub use state::{PlayerState, QueueEntry};
pub use store::{JsonFileStore, MemoryStore, PersistedState, PlaybackStore, StoreError};
pub use timeline::{TimelineEvent, TimelineTracker};
pub use types::{PlaybackConfig, PlaybackPhase, RepeatMode};
