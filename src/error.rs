//! Error taxonomy for the per-track pipeline
//!
//! All four kinds are caught at the per-track boundary inside the session
//! and converted into a failure record; only a user interrupt or a
//! programming defect terminates the session.

use std::path::PathBuf;

use thiserror::Error;

/// Metadata resolution failed across every extraction strategy
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("no extraction strategy produced usable metadata")]
    NoDataFound,

    #[error("playlist probe contained no entries")]
    EmptyPlaylist,

    /// A single playlist position the probe could not describe
    #[error("playlist entry {index} contained no usable data")]
    EmptyEntry { index: usize },
}

/// The output directory could not be prepared
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("failed to create output directory {}", .dir.display())]
    CreateDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The external download tool failed to produce the expected file
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("failed to spawn {tool}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read download tool output")]
    Stream(#[from] std::io::Error),

    #[error("download tool exited with status {code}")]
    ToolFailed { code: i32 },

    /// The tool can exit 0 without producing the expected file
    /// (e.g. an already-exists skip under a different name).
    #[error("download tool exited cleanly but {} was not produced", .expected.display())]
    OutputMissing { expected: PathBuf },
}

/// The tag container could not be opened or saved
///
/// Field-level and cover-art sub-failures are swallowed by the tagging
/// engine and never surface as this error.
#[derive(Debug, Error)]
pub enum TaggingError {
    #[error("unsupported container format for {}", .path.display())]
    UnsupportedContainer { path: PathBuf },

    #[error("failed to open {} for tagging", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: lofty::error::LoftyError,
    },

    #[error("failed to save tags to {}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: lofty::error::LoftyError,
    },
}

/// Any failure that marks a single track as failed
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("planning failed: {0}")]
    Planning(#[from] PlanningError),

    #[error("acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("tagging failed: {0}")]
    Tagging(#[from] TaggingError),
}
