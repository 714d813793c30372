//! saavndl - Download songs and albums from JioSaavn with embedded cover art

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod acquire;
mod cli;
mod error;
mod fetch;
mod plan;
mod resolve;
mod session;
mod tag;
mod utils;

use acquire::YtDlp;
use cli::Cli;
use fetch::PageClient;
use resolve::PlaylistContext;
use session::{ConsoleReporter, Session, SessionStatus};
use tag::LoftyTagger;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "saavndl=debug,reqwest=debug"
    } else {
        "saavndl=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match run(cli).await {
        Ok(SessionStatus::AllSucceeded) => ExitCode::SUCCESS,
        Ok(SessionStatus::Partial) => ExitCode::from(2),
        Ok(SessionStatus::AllFailed) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<SessionStatus> {
    // Reject bad input before any network or subprocess work
    let url = cli::validate_url(&cli.url)?;

    std::fs::create_dir_all(&cli.out)
        .with_context(|| format!("Failed to create output directory {}", cli.out.display()))?;

    let fetcher = PageClient::new()?;
    let ytdlp = YtDlp::default();

    let playlist = resolve_tracks(&ytdlp, &fetcher, url.as_str()).await?;
    info!(
        "Resolved {} track(s): {}",
        playlist.total(),
        playlist
            .tracks
            .first()
            .map(|t| format!("{} - {}", t.artist_line(), t.title))
            .unwrap_or_default()
    );

    let reporter = ConsoleReporter::new();
    let tagger = LoftyTagger;
    let session = Session::new(
        &ytdlp,
        &tagger,
        &fetcher,
        &reporter,
        cli.out,
        cli.album,
        cli.format,
    );

    // A user interrupt aborts the whole session; dropping the in-flight
    // acquire future kills the child process.
    let summary = tokio::select! {
        summary = session.run(&playlist) => summary,
        _ = tokio::signal::ctrl_c() => {
            anyhow::bail!("interrupted by user");
        }
    };

    Ok(summary.status())
}

/// Probe the tool first (handles playlists); fall back to scraping the
/// catalog page when the probe yields nothing.
async fn resolve_tracks(ytdlp: &YtDlp, fetcher: &PageClient, url: &str) -> Result<PlaylistContext> {
    match ytdlp.probe(url).await {
        Ok(blob) => match resolve::resolve_probe(&blob, url) {
            Ok(playlist) => return Ok(playlist),
            Err(e) => debug!("Probe blob unusable ({}), scraping page instead", e),
        },
        Err(e) => debug!("Probe failed ({:#}), scraping page instead", e),
    }

    let html = fetcher.fetch_page(url).await?;
    let track = resolve::resolve_page(url, &html)?;
    Ok(PlaylistContext::single(track))
}
