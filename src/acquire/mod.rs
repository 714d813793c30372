//! Acquisition driver for the external download tool
//!
//! One invocation downloads exactly one track (`--no-playlist`); playlist
//! iteration belongs to the session. The tool's stdout is consumed line by
//! line as it is produced so progress can be surfaced live, and the exit
//! code is the authoritative success signal, double-checked against the
//! expected output file because the tool can exit 0 without producing it.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::SystemTime;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::ValueEnum;
use regex::Regex;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::AcquisitionError;
use crate::plan::OutputPlan;

/// `[download]  45.3% of 4.25MiB at 1.02MiB/s ETA 00:02`
static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\[download\]\s+(\d{1,3}(?:\.\d+)?)%\s+of\s+~?\s*([\d.]+\s?[KMGT]?i?B)\s+at\s+([\d.]+\s?[KMGT]?i?B/s)\s+ETA\s+([\d:]+)",
    )
    .expect("progress pattern is valid")
});

/// Target output codec for the download tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AudioFormat {
    /// Lossless FLAC (default)
    Flac,
    /// MP3 at a fixed ~320 kbps
    Mp3,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Flac => "flac",
            Self::Mp3 => "mp3",
        }
    }
}

/// One parsed progress line
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressTick {
    pub percent: f64,
    pub size: String,
    pub rate: String,
    pub eta: String,
}

/// Parse a tool output line into a progress tick, if it is one
pub fn parse_progress_line(line: &str) -> Option<ProgressTick> {
    let caps = PROGRESS_RE.captures(line.trim())?;
    Some(ProgressTick {
        percent: caps[1].parse().ok()?,
        size: caps[2].to_string(),
        rate: caps[3].to_string(),
        eta: caps[4].to_string(),
    })
}

/// Everything the driver needs for one track
#[derive(Debug, Clone)]
pub struct AcquireRequest {
    pub source_url: String,
    pub output_template: String,
    pub expected_file: PathBuf,
    pub format: AudioFormat,
}

impl AcquireRequest {
    pub fn new(source_url: &str, plan: &OutputPlan, format: AudioFormat) -> Self {
        Self {
            source_url: source_url.to_string(),
            output_template: plan.template(),
            expected_file: plan.final_path(format.extension()),
            format,
        }
    }
}

/// Seam for the external acquisition tool
#[async_trait]
pub trait Acquire: Send + Sync {
    /// Fetch one track and return the produced file's path; the callback
    /// receives a 0-100 percentage.
    ///
    /// `0` is a valid received value; "callback never invoked" is the
    /// only signal for unknown progress.
    async fn acquire(
        &self,
        request: &AcquireRequest,
        on_progress: &mut (dyn FnMut(f64) + Send),
    ) -> Result<PathBuf, AcquisitionError>;
}

/// yt-dlp subprocess driver
pub struct YtDlp {
    program: String,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::with_program("yt-dlp")
    }
}

impl YtDlp {
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    /// Probe a URL: one JSON document describing a track or a playlist
    pub async fn probe(&self, url: &str) -> Result<Value> {
        let output = Command::new(&self.program)
            .args(["--ignore-config", "--dump-single-json", url])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to run {} probe", self.program))?;

        let output = if output.status.success() {
            output
        } else {
            // Some catalog URLs only resolve with the extractor forced on
            debug!("Probe failed, retrying with forced extractor args");
            let retry = Command::new(&self.program)
                .args([
                    "--ignore-config",
                    "--dump-single-json",
                    "--extractor-args",
                    "jiosaavn:all",
                    url,
                ])
                .stdin(Stdio::null())
                .stderr(Stdio::null())
                .output()
                .await
                .with_context(|| format!("Failed to run {} probe", self.program))?;
            if !retry.status.success() {
                anyhow::bail!(
                    "{} probe exited with status {}",
                    self.program,
                    retry.status.code().unwrap_or(-1)
                );
            }
            retry
        };

        serde_json::from_slice(&output.stdout).context("Failed to parse probe JSON")
    }

    /// Full argument list for one track acquisition
    fn build_args(request: &AcquireRequest) -> Vec<String> {
        let mut args: Vec<String> = [
            "--ignore-config",
            "--no-part",
            "--newline",
            "--prefer-ffmpeg",
            "--embed-thumbnail",
            "--add-metadata",
            "--no-playlist",
            "--extractor-args",
            "jiosaavn:all",
            "-x",
            "--audio-format",
            request.format.extension(),
        ]
        .map(str::to_string)
        .to_vec();

        if request.format == AudioFormat::Mp3 {
            args.push("--audio-quality".to_string());
            args.push("320K".to_string());
        }

        args.push("-o".to_string());
        args.push(request.output_template.clone());
        args.push(request.source_url.clone());
        args
    }
}

#[async_trait]
impl Acquire for YtDlp {
    async fn acquire(
        &self,
        request: &AcquireRequest,
        on_progress: &mut (dyn FnMut(f64) + Send),
    ) -> Result<PathBuf, AcquisitionError> {
        let args = Self::build_args(request);
        debug!("Running: {} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A user interrupt drops this future; never orphan the tool.
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AcquisitionError::Spawn {
                tool: self.program.clone(),
                source,
            })?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("tool stderr: {}", line);
                }
            });
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AcquisitionError::Stream(std::io::Error::other("stdout not captured")))?;
        let mut lines = BufReader::new(stdout).lines();

        while let Some(line) = lines.next_line().await? {
            if let Some(tick) = parse_progress_line(&line) {
                on_progress(tick.percent.clamp(0.0, 100.0));
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(AcquisitionError::ToolFailed {
                code: status.code().unwrap_or(-1),
            });
        }

        // Zero exit is not proof; locate what was actually produced.
        locate_output(request)
    }
}

/// Find the file the tool produced for `request`
///
/// The exact expected path wins, but the tool applies its own filename
/// restriction and can shift the stem. A zero exit with no file carrying
/// the target extension in the destination directory is still a failure.
fn locate_output(request: &AcquireRequest) -> Result<PathBuf, AcquisitionError> {
    if request.expected_file.is_file() {
        return Ok(request.expected_file.clone());
    }

    let dir = request.expected_file.parent().unwrap_or(Path::new("."));
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(request.format.extension())
            {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
                newest = Some((modified, path));
            }
        }
    }

    match newest {
        Some((_, path)) => {
            debug!(
                "Expected {} absent, using produced file {}",
                request.expected_file.display(),
                path.display()
            );
            Ok(path)
        }
        None => Err(AcquisitionError::OutputMissing {
            expected: request.expected_file.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request(format: AudioFormat, expected: PathBuf) -> AcquireRequest {
        AcquireRequest {
            source_url: "https://www.jiosaavn.com/song/kesariya/HSFX".to_string(),
            output_template: "out/01 - Kesariya.%(ext)s".to_string(),
            expected_file: expected,
            format,
        }
    }

    #[test]
    fn test_parse_progress_line() {
        let tick =
            parse_progress_line("[download]  45.3% of 4.25MiB at 1.02MiB/s ETA 00:02").unwrap();
        assert_eq!(tick.percent, 45.3);
        assert_eq!(tick.size, "4.25MiB");
        assert_eq!(tick.rate, "1.02MiB/s");
        assert_eq!(tick.eta, "00:02");
    }

    #[test]
    fn test_parse_progress_line_estimated_size() {
        let tick =
            parse_progress_line("[download] 100.0% of ~3.52MiB at 512.00KiB/s ETA 00:00").unwrap();
        assert_eq!(tick.percent, 100.0);
        assert_eq!(tick.size, "3.52MiB");
    }

    #[test]
    fn test_parse_progress_line_integer_percent() {
        let tick = parse_progress_line("[download] 3% of 10.00MiB at 1.00MiB/s ETA 01:00").unwrap();
        assert_eq!(tick.percent, 3.0);
    }

    #[test]
    fn test_non_progress_lines_ignored() {
        assert!(parse_progress_line("[ExtractAudio] Destination: x.flac").is_none());
        assert!(parse_progress_line("[download] Destination: x.webm").is_none());
        assert!(parse_progress_line("[download]  45.3% of Unknown at Unknown ETA Unknown").is_none());
        assert!(parse_progress_line("").is_none());
    }

    #[test]
    fn test_build_args_flac() {
        let args = YtDlp::build_args(&request(AudioFormat::Flac, PathBuf::from("x.flac")));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"--embed-thumbnail".to_string()));
        assert!(args.contains(&"flac".to_string()));
        assert!(!args.contains(&"--audio-quality".to_string()));
        assert_eq!(args.last().unwrap(), "https://www.jiosaavn.com/song/kesariya/HSFX");
    }

    #[test]
    fn test_build_args_mp3_carries_bitrate() {
        let args = YtDlp::build_args(&request(AudioFormat::Mp3, PathBuf::from("x.mp3")));
        assert!(args.contains(&"mp3".to_string()));
        assert!(args.contains(&"--audio-quality".to_string()));
        assert!(args.contains(&"320K".to_string()));
    }

    #[tokio::test]
    async fn test_zero_exit_with_missing_file_is_failure() {
        // `true` accepts any args, exits 0, and produces nothing
        let driver = YtDlp::with_program("true");
        let dir = tempfile::tempdir().unwrap();
        let req = request(AudioFormat::Flac, dir.path().join("missing.flac"));

        let err = driver.acquire(&req, &mut |_| {}).await.unwrap_err();
        assert!(matches!(err, AcquisitionError::OutputMissing { .. }));
    }

    #[tokio::test]
    async fn test_renamed_output_with_expected_extension_is_accepted() {
        // The tool's own filename restriction can shift the stem
        let driver = YtDlp::with_program("true");
        let dir = tempfile::tempdir().unwrap();
        let produced = dir.path().join("Kesariya (restricted).flac");
        std::fs::write(&produced, b"audio").unwrap();

        let req = request(AudioFormat::Flac, dir.path().join("01 - Kesariya.flac"));
        let found = driver.acquire(&req, &mut |_| {}).await.unwrap();
        assert_eq!(found, produced);
    }

    #[test]
    fn test_locate_output_ignores_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("leftover.mp3"), b"x").unwrap();

        let req = request(AudioFormat::Flac, dir.path().join("01 - Kesariya.flac"));
        let err = locate_output(&req).unwrap_err();
        assert!(matches!(err, AcquisitionError::OutputMissing { .. }));
    }

    #[test]
    fn test_locate_output_prefers_exact_path() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("01 - Kesariya.flac");
        std::fs::write(dir.path().join("other.flac"), b"x").unwrap();
        std::fs::write(&expected, b"x").unwrap();

        let req = request(AudioFormat::Flac, expected.clone());
        assert_eq!(locate_output(&req).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let driver = YtDlp::with_program("false");
        let dir = tempfile::tempdir().unwrap();
        let req = request(AudioFormat::Flac, dir.path().join("missing.flac"));

        let err = driver.acquire(&req, &mut |_| {}).await.unwrap_err();
        assert!(matches!(err, AcquisitionError::ToolFailed { .. }));
    }

    #[tokio::test]
    async fn test_zero_exit_with_expected_file_succeeds() {
        let driver = YtDlp::with_program("true");
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("done.flac");
        std::fs::write(&expected, b"stub").unwrap();

        let req = request(AudioFormat::Flac, expected.clone());
        let found = driver.acquire(&req, &mut |_| {}).await.unwrap();
        assert_eq!(found, expected);
    }
}
