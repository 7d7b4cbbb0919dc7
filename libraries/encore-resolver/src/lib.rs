//! Encore Resolver
//!
//! Multi-provider stream resolution for Encore.
//!
//! # Features
//!
//! - Priority-ordered search with empty-result fallthrough
//! - Concurrent search across every provider with result de-duplication
//! - Stream resolution that falls back to re-searching other providers by
//!   title and artist when the preferred provider cannot serve a track
//! - A consecutive-failure health gate shared by the HTTP providers
//! - A Piped (YouTube proxy) provider
//!
//! # Example
//!
//! ```ignore
//! use encore_resolver::{PipedConfig, PipedProvider, ProviderResolver};
//! use std::sync::Arc;
//!
//! let piped = PipedProvider::new(PipedConfig::new("https://pipedapi.kavin.rocks"))?;
//! let resolver = ProviderResolver::new(vec![Arc::new(piped)]);
//!
//! let tracks = resolver.search("teardrop massive attack", 10).await?;
//! let stream = resolver.resolve_track(&tracks[0]).await?;
//! println!("{}", stream.url);
//! ```

pub mod error;
pub mod health;
pub mod piped;
pub mod resolver;

pub use error::ResolverError;
pub use health::ProviderHealth;
pub use piped::{PipedConfig, PipedProvider, DEFAULT_PIPED_URL};
pub use resolver::{ProviderResolver, DEFAULT_FALLBACK_SEARCH_LIMIT};
