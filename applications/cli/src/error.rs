/// CLI error types
use encore_core::{LyricsError, ProviderError, SinkError};
use encore_playback::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider setup failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Lyrics setup failed: {0}")]
    Lyrics(#[from] LyricsError),

    #[error("Scrobbler setup failed: {0}")]
    Sink(#[from] SinkError),

    #[error("State file error: {0}")]
    Store(#[from] StoreError),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
