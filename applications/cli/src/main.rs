/// Encore - command-line player
mod app;
mod config;
mod error;

use crate::config::AppConfig;
use chrono::Local;
use clap::{Parser, Subcommand};
use encore_core::{LyricsProvider, StreamInfo, Track, TrackSource};
use encore_playback::{PlaybackPhase, PlaybackStore, SimulatedEngine};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "encore")]
#[command(about = "Encore streaming music player", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for tracks
    Search {
        /// Search terms
        query: String,
        /// Maximum number of results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        /// Ask every provider and merge the results
        #[arg(long)]
        all: bool,
    },
    /// Resolve a playable stream URL for a track id
    Resolve {
        /// Track id
        id: String,
        /// Source the id belongs to (youtube, soundcloud, piped, local)
        #[arg(short, long)]
        source: Option<TrackSource>,
    },
    /// Look up lyrics
    Lyrics {
        /// Track title
        title: String,
        /// Artist name
        artist: String,
    },
    /// Search, then play the best match on the headless engine
    Play {
        /// Search terms
        query: String,
        /// Stop after this many seconds
        #[arg(long, default_value_t = 30)]
        listen_secs: u64,
    },
    /// Show recently played tracks
    History {
        /// Number of entries
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// Also suggest this many random tracks to play again
        #[arg(long)]
        suggest: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "encore=info,encore_playback=info,encore_resolver=info,encore_scrobble=info,encore_lyrics=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    config.validate()?;

    match cli.command {
        Commands::Search { query, limit, all } => {
            search(&config, &query, limit, all).await?;
        }
        Commands::Resolve { id, source } => {
            resolve(&config, &id, source).await?;
        }
        Commands::Lyrics { title, artist } => {
            lyrics(&config, &title, &artist).await?;
        }
        Commands::Play { query, listen_secs } => {
            play(&config, &query, Duration::from_secs(listen_secs)).await?;
        }
        Commands::History { limit, suggest } => {
            history(&config, limit, suggest).await?;
        }
    }

    Ok(())
}

async fn search(config: &AppConfig, query: &str, limit: usize, all: bool) -> anyhow::Result<()> {
    let resolver = app::build_resolver(config)?;
    let tracks = if all {
        resolver.search_all(query, limit).await
    } else {
        resolver.search(query, limit).await?
    };

    if tracks.is_empty() {
        println!("No results for '{query}'");
    }
    for track in &tracks {
        println!("{}", describe(track));
    }
    Ok(())
}

async fn resolve(config: &AppConfig, id: &str, source: Option<TrackSource>) -> anyhow::Result<()> {
    let resolver = app::build_resolver(config)?;
    let stream = resolver.resolve_stream(id, source).await?;
    print_stream(&stream);
    Ok(())
}

async fn lyrics(config: &AppConfig, title: &str, artist: &str) -> anyhow::Result<()> {
    let Some(provider) = app::build_lyrics(config)? else {
        println!("Lyrics are disabled in the configuration");
        return Ok(());
    };

    match provider.search_lyrics(title, artist).await? {
        Some(lyrics) => {
            println!("{} - {} (via {})", lyrics.artist, lyrics.track_title, lyrics.source);
            println!();
            println!("{}", lyrics.plain_text);
        }
        None => println!("No lyrics found for '{title}' by {artist}"),
    }
    Ok(())
}

async fn play(config: &AppConfig, query: &str, listen: Duration) -> anyhow::Result<()> {
    let resolver = app::build_resolver(config)?;
    let Some(track) = resolver.search(query, 1).await?.into_iter().next() else {
        println!("No results for '{query}'");
        return Ok(());
    };

    let controller = app::build_controller(config).await?;
    controller.set_audio_player(Arc::new(SimulatedEngine::new()));

    println!("Playing {}", describe(&track));
    controller.play_track(track).await?;

    let mut updates = controller.subscribe();
    let deadline = tokio::time::sleep(listen);
    tokio::pin!(deadline);

    let mut last_phase = None;
    let mut last_line: Option<String> = None;

    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("Listening time is up");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();

                if last_phase != Some(state.phase) {
                    info!(
                        phase = ?state.phase,
                        position_ms = state.position_ms,
                        duration_ms = state.duration_ms,
                        "Playback phase changed"
                    );
                    last_phase = Some(state.phase);
                }

                if let Some(line) = state.current_lyric_line() {
                    if last_line.as_deref() != Some(line) {
                        println!("  {line}");
                        last_line = Some(line.to_string());
                    }
                }

                match state.phase {
                    PlaybackPhase::Ended => break,
                    PlaybackPhase::Error => {
                        warn!(error = ?state.error, "Playback failed");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    controller.release();
    Ok(())
}

async fn history(config: &AppConfig, limit: usize, suggest: Option<usize>) -> anyhow::Result<()> {
    let store = app::open_store(config).await?;
    let persisted = store.load().await?;

    if persisted.history.is_empty() {
        println!("Nothing played yet");
    }
    for entry in persisted.history.entries().take(limit) {
        let played_at = entry.played_at.with_timezone(&Local);
        println!(
            "{}  {}",
            played_at.format("%Y-%m-%d %H:%M"),
            describe(&entry.track)
        );
    }

    if let Some(count) = suggest {
        let exclude = persisted.last_track.as_ref().map(|track| track.id.as_str());
        let suggestions = persisted.history.play_again(count, exclude);
        if !suggestions.is_empty() {
            println!();
            println!("Play again:");
        }
        for track in &suggestions {
            println!("  {}", describe(track));
        }
    }
    Ok(())
}

fn print_stream(stream: &StreamInfo) {
    println!("{}", stream.url);
    if let Some(mime_type) = &stream.mime_type {
        println!("  type:    {mime_type}");
    }
    if let Some(bitrate) = stream.bitrate {
        println!("  bitrate: {} kbps", bitrate / 1000);
    }
    if let Some(expires_at) = stream.expires_at {
        println!("  expires: {}", expires_at.with_timezone(&Local).format("%H:%M:%S"));
    }
    println!("  source:  {}", stream.source);
}

fn describe(track: &Track) -> String {
    format!(
        "{}  {} - {} ({}) [{}]",
        track.id,
        track.artist,
        track.title,
        format_duration(track.duration_ms),
        track.source
    )
}

fn format_duration(duration_ms: u64) -> String {
    let total_secs = duration_ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_render_as_minutes_and_seconds() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(61_999), "1:01");
        assert_eq!(format_duration(3_600_000), "60:00");
    }

    #[test]
    fn cli_parses_play_options() {
        let cli = Cli::try_parse_from(["encore", "play", "teardrop", "--listen-secs", "5"]).unwrap();
        match cli.command {
            Commands::Play { query, listen_secs } => {
                assert_eq!(query, "teardrop");
                assert_eq!(listen_secs, 5);
            }
            _ => panic!("expected play"),
        }
    }

    #[test]
    fn cli_parses_history_suggestions() {
        let cli = Cli::try_parse_from(["encore", "history", "--suggest", "3"]).unwrap();
        match cli.command {
            Commands::History { limit, suggest } => {
                assert_eq!(limit, 20);
                assert_eq!(suggest, Some(3));
            }
            _ => panic!("expected history"),
        }
    }

    #[test]
    fn cli_parses_track_sources() {
        let cli = Cli::try_parse_from(["encore", "resolve", "abc", "--source", "youtube"]).unwrap();
        match cli.command {
            Commands::Resolve { id, source } => {
                assert_eq!(id, "abc");
                assert_eq!(source, Some(TrackSource::YouTube));
            }
            _ => panic!("expected resolve"),
        }
    }
}
