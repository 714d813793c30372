//! Session orchestration
//!
//! Sequences plan -> acquire -> tag per track, over every track of the
//! resolved context. Per-track failures are caught at the track boundary
//! and recorded; the session always proceeds to the next track and always
//! reaches the summary. Presentation is behind the [`Reporter`] seam so
//! the pipeline itself has no rendering dependencies.

use std::path::PathBuf;
use std::sync::Mutex;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::acquire::{Acquire, AcquireRequest, AudioFormat};
use crate::error::{ResolutionError, TrackError};
use crate::fetch::PageClient;
use crate::plan;
use crate::resolve::models::{UNKNOWN_ALBUM, UNKNOWN_ARTIST, UNKNOWN_TITLE};
use crate::resolve::{NormalizedTrack, PlaylistContext};
use crate::tag::Tagger;

/// Per-track result record
#[derive(Debug)]
pub struct TrackOutcome {
    pub track: NormalizedTrack,
    pub destination: Option<PathBuf>,
    pub error: Option<TrackError>,
}

impl TrackOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Overall session status, observable through the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    AllSucceeded,
    Partial,
    AllFailed,
}

/// Accumulated session tally; skipped probe entries count as failed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl SessionSummary {
    fn record(&mut self, outcome: &TrackOutcome) {
        if outcome.succeeded() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn status(&self) -> SessionStatus {
        if self.failed == 0 {
            SessionStatus::AllSucceeded
        } else if self.succeeded == 0 {
            SessionStatus::AllFailed
        } else {
            SessionStatus::Partial
        }
    }
}

/// Injected reporting interface; the pipeline never renders directly
pub trait Reporter: Send + Sync {
    /// A track's pipeline is starting
    fn on_track_start(&self, track: &NormalizedTrack, index: usize, total: usize);

    /// Acquisition progress, 0-100. Zero is a real value; "never called"
    /// is the only signal for unknown progress.
    fn on_progress(&self, percent: f64);

    fn on_track_complete(&self, outcome: &TrackOutcome);

    fn on_session_summary(&self, summary: &SessionSummary);
}

/// Runs the per-track pipeline over a resolved context
pub struct Session<'a> {
    acquirer: &'a dyn Acquire,
    tagger: &'a dyn Tagger,
    fetcher: &'a PageClient,
    reporter: &'a dyn Reporter,
    base_dir: PathBuf,
    force_album_layout: bool,
    format: AudioFormat,
}

impl<'a> Session<'a> {
    pub fn new(
        acquirer: &'a dyn Acquire,
        tagger: &'a dyn Tagger,
        fetcher: &'a PageClient,
        reporter: &'a dyn Reporter,
        base_dir: PathBuf,
        force_album_layout: bool,
        format: AudioFormat,
    ) -> Self {
        Self {
            acquirer,
            tagger,
            fetcher,
            reporter,
            base_dir,
            force_album_layout,
            format,
        }
    }

    /// Process every track sequentially and report the final tally
    pub async fn run(&self, playlist: &PlaylistContext) -> SessionSummary {
        let mut summary = SessionSummary {
            total: playlist.total(),
            succeeded: 0,
            failed: 0,
        };

        // Entries the probe could not describe are failures the user
        // must see per track, not just a tally adjustment.
        for index in &playlist.skipped_entries {
            warn!("Playlist entry {} was empty, skipping", index);
            let outcome = TrackOutcome {
                track: skipped_entry_record(*index),
                destination: None,
                error: Some(TrackError::Resolution(ResolutionError::EmptyEntry {
                    index: *index,
                })),
            };
            self.reporter.on_track_complete(&outcome);
            summary.record(&outcome);
        }

        let count = playlist.tracks.len();
        for (index, track) in playlist.tracks.iter().enumerate() {
            self.reporter.on_track_start(track, index, count);

            let outcome = match self.try_track(track, playlist.album_layout).await {
                Ok(destination) => {
                    info!("Downloaded: {}", destination.display());
                    TrackOutcome {
                        track: track.clone(),
                        destination: Some(destination),
                        error: None,
                    }
                }
                Err(error) => {
                    warn!("Track failed: {}: {}", track.title, error);
                    TrackOutcome {
                        track: track.clone(),
                        destination: None,
                        error: Some(error),
                    }
                }
            };

            self.reporter.on_track_complete(&outcome);
            summary.record(&outcome);
        }

        self.reporter.on_session_summary(&summary);
        summary
    }

    async fn try_track(
        &self,
        track: &NormalizedTrack,
        from_playlist: bool,
    ) -> Result<PathBuf, TrackError> {
        let plan = plan::plan(track, &self.base_dir, self.force_album_layout, from_playlist)?;
        let request = AcquireRequest::new(&track.source_url, &plan, self.format);

        let reporter = self.reporter;
        let destination = self
            .acquirer
            .acquire(&request, &mut |percent| reporter.on_progress(percent))
            .await?;

        let cover = self.fetch_cover(track).await;
        self.tagger.tag(&destination, track, cover.as_deref())?;

        Ok(destination)
    }

    /// Cover fetch failure downgrades to tagging without art
    async fn fetch_cover(&self, track: &NormalizedTrack) -> Option<Vec<u8>> {
        let url = track.cover_art_url.as_deref()?;
        match self.fetcher.fetch_bytes(url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Failed to fetch cover art for {}: {:#}", track.title, e);
                None
            }
        }
    }
}

/// Placeholder record for a playlist position the probe left empty
fn skipped_entry_record(index: usize) -> NormalizedTrack {
    NormalizedTrack {
        title: format!("{} (entry {})", UNKNOWN_TITLE, index),
        artists: vec![UNKNOWN_ARTIST.to_string()],
        album: UNKNOWN_ALBUM.to_string(),
        duration: None,
        cover_art_url: None,
        track_number: None,
        year: None,
        genre: None,
        source_url: String::new(),
    }
}

/// Console presentation: an indicatif bar per track plus a colored tally
pub struct ConsoleReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn on_track_start(&self, track: &NormalizedTrack, index: usize, total: usize) {
        println!(
            "{} [{}/{}] {} - {}",
            "Downloading".cyan(),
            index + 1,
            total,
            track.artist_line(),
            track.title.bold()
        );

        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}%")
                .unwrap()
                .progress_chars("#>-"),
        );
        *self.bar.lock().unwrap() = Some(bar);
    }

    fn on_progress(&self, percent: f64) {
        if let Some(bar) = self.bar.lock().unwrap().as_ref() {
            bar.set_position(percent.clamp(0.0, 100.0).round() as u64);
        }
    }

    fn on_track_complete(&self, outcome: &TrackOutcome) {
        if let Some(bar) = self.bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }

        match (&outcome.destination, &outcome.error) {
            (Some(destination), None) => {
                println!("  {} {}", "ok".green(), destination.display());
            }
            (_, Some(error)) => {
                println!("  {} {}: {}", "failed".red(), outcome.track.title, error);
            }
            (None, None) => {}
        }
    }

    fn on_session_summary(&self, summary: &SessionSummary) {
        println!();
        let line = format!(
            "{} total, {} succeeded, {} failed",
            summary.total, summary.succeeded, summary.failed
        );
        match summary.status() {
            SessionStatus::AllSucceeded => {
                println!("{}", format!("Download complete: {}", line).green().bold());
            }
            SessionStatus::Partial => {
                println!("{}", format!("Partial download: {}", line).yellow().bold());
            }
            SessionStatus::AllFailed => {
                println!("{}", format!("Download failed: {}", line).red().bold());
            }
        }
    }
}
