//! Encore Lyrics
//!
//! Lyrics lookup for the playback controller:
//!
//! - [`LyricsAggregator`]: asks an ordered list of providers, first hit wins
//! - [`LrcLibProvider`]: the free LRCLIB API, plain and synced lyrics
//! - [`parse_lrc`]: `[mm:ss.xx]` synced-lyrics parser

pub mod aggregator;
pub mod lrc;
pub mod lrclib;

pub use aggregator::LyricsAggregator;
pub use lrc::parse_lrc;
pub use lrclib::{LrcLibConfig, LrcLibProvider, DEFAULT_LRCLIB_URL};
