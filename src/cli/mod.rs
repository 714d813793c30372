//! CLI surface for saavndl

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use url::Url;

use crate::acquire::AudioFormat;

#[derive(Parser, Debug)]
#[command(name = "saavndl", about = "Download JioSaavn tracks and albums with embedded cover art")]
#[command(version)]
pub struct Cli {
    /// JioSaavn song, album, or playlist URL
    pub url: String,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,

    /// Force album-style folder layout even for single tracks
    #[arg(long)]
    pub album: bool,

    /// Target audio format
    #[arg(short, long, value_enum, default_value_t = AudioFormat::Flac)]
    pub format: AudioFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Reject unsupported URLs before any network or subprocess work begins
pub fn validate_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).context("Not a valid URL")?;

    if !matches!(url.scheme(), "http" | "https") {
        bail!("Unsupported URL scheme '{}'", url.scheme());
    }

    let host = url.host_str().unwrap_or_default();
    if host != "jiosaavn.com" && !host.ends_with(".jiosaavn.com") {
        bail!("Please provide a JioSaavn URL (got host '{}')", host);
    }

    if url.path().trim_matches('/').is_empty() {
        bail!("URL has no song, album, or playlist path");
    }

    Ok(url)
}
