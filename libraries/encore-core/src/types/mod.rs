//! Domain types

mod lyrics;
mod stream;
mod track;

pub use lyrics::{Lyrics, SyncedLine};
pub use stream::StreamInfo;
pub use track::{Track, TrackSource};
