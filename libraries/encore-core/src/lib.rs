//! Encore Core
//!
//! Platform-agnostic domain types, capability traits and error types shared by
//! every Encore crate.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `StreamInfo`, `Lyrics`
//! - **Capability Traits**: `StreamProvider`, `ScrobbleSink`, `LyricsProvider`
//! - **Error Handling**: one error enum per capability
//!
//! Concrete back-ends (Piped, LRCLIB, ListenBrainz) live in their own crates and
//! only depend on this one, so new back-ends are added by implementing a trait
//! rather than by branching on a source tag.
//!
//! # Example
//!
//! ```rust
//! use encore_core::{Track, TrackSource};
//!
//! let track = Track::new("dQw4w9WgXcQ", "Never Gonna Give You Up", "Rick Astley", 213_000, TrackSource::Piped)
//!     .with_album("Whenever You Need Somebody");
//!
//! assert_eq!(track.search_query(), "Never Gonna Give You Up Rick Astley");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{LyricsError, ProviderError, SinkError};
pub use traits::{LyricsProvider, ScrobbleSink, StreamProvider};
pub use types::{Lyrics, StreamInfo, SyncedLine, Track, TrackSource};
