//! Output path planner
//!
//! Derives a sanitized, collision-safe destination directory and filename
//! stem for a resolved track. The track-number prefix is zero-padded so an
//! album directory sorts lexicographically in track order.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::PlanningError;
use crate::resolve::models::UNKNOWN_TITLE;
use crate::resolve::NormalizedTrack;
use crate::utils::sanitize_filename;

/// A planned destination: directory plus extension-less filename stem
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPlan {
    pub dir: PathBuf,
    pub stem: String,
}

impl OutputPlan {
    /// Output template for the download tool (`%(ext)s` placeholder)
    pub fn template(&self) -> String {
        self.dir
            .join(format!("{}.%(ext)s", self.stem))
            .to_string_lossy()
            .into_owned()
    }

    /// The file the tool is expected to produce for a given extension
    pub fn final_path(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", self.stem, extension))
    }
}

/// Plan the destination for one track, creating the directory idempotently
///
/// An album-named subdirectory is used when the layout is forced or the
/// track came from a playlist/album context; otherwise the base directory
/// is targeted directly.
pub fn plan(
    track: &NormalizedTrack,
    base_dir: &Path,
    force_album_layout: bool,
    from_playlist: bool,
) -> Result<OutputPlan, PlanningError> {
    let dir = if force_album_layout || from_playlist {
        base_dir.join(sanitize_filename(&track.album))
    } else {
        base_dir.to_path_buf()
    };

    fs::create_dir_all(&dir).map_err(|source| PlanningError::CreateDir {
        dir: dir.clone(),
        source,
    })?;

    let stem = filename_stem(track);
    debug!("Planned output: {}/{}", dir.display(), stem);

    Ok(OutputPlan { dir, stem })
}

/// Filename stem rule: `{track:02} - {title}` wins over
/// `{artist} - {title}` wins over `{title}`, never empty
pub fn filename_stem(track: &NormalizedTrack) -> String {
    let title = sanitize_filename(&track.title);

    let stem = if let Some(number) = track.track_number.as_deref().filter(|n| !n.is_empty()) {
        format!("{:0>2} - {}", number, title)
    } else {
        let artist = sanitize_filename(&track.artist_line());
        if artist.is_empty() || artist == "_" {
            title.clone()
        } else {
            format!("{} - {}", artist, title)
        }
    };

    if stem.trim().is_empty() {
        if title.is_empty() {
            UNKNOWN_TITLE.to_string()
        } else {
            title
        }
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::models::{UNKNOWN_ALBUM, UNKNOWN_ARTIST};

    fn track(title: &str, artists: &[&str], album: &str, number: Option<&str>) -> NormalizedTrack {
        NormalizedTrack {
            title: title.to_string(),
            artists: artists.iter().map(|a| a.to_string()).collect(),
            album: album.to_string(),
            duration: None,
            cover_art_url: None,
            track_number: number.map(str::to_string),
            year: None,
            genre: None,
            source_url: "https://www.jiosaavn.com/song/x/y".to_string(),
        }
    }

    #[test]
    fn test_track_number_is_zero_padded() {
        let stem = filename_stem(&track("Kesariya", &["Arijit Singh"], "Brahmastra", Some("3")));
        assert_eq!(stem, "03 - Kesariya");
        assert!(stem.starts_with("03 - "));
    }

    #[test]
    fn test_wide_track_number_is_kept() {
        let stem = filename_stem(&track("Kesariya", &[], "Brahmastra", Some("12")));
        assert_eq!(stem, "12 - Kesariya");
    }

    #[test]
    fn test_artist_prefix_without_track_number() {
        let stem = filename_stem(&track("Song", &["Al"], UNKNOWN_ALBUM, None));
        assert_eq!(stem, "Al - Song");
    }

    #[test]
    fn test_title_alone_when_nothing_else() {
        let mut t = track("Song", &[], UNKNOWN_ALBUM, None);
        t.artists.clear();
        assert_eq!(filename_stem(&t), "Song");
    }

    #[test]
    fn test_stem_never_empty() {
        let mut t = track("///", &[], UNKNOWN_ALBUM, None);
        t.artists.clear();
        assert_eq!(filename_stem(&t), "_");

        t.title = "  ".to_string();
        assert_eq!(filename_stem(&t), "Unknown Title");
    }

    #[test]
    fn test_stem_sanitizes_title_and_artist() {
        let stem = filename_stem(&track("What? Why?", &["AC/DC"], UNKNOWN_ALBUM, None));
        assert_eq!(stem, "AC_DC - What_ Why_");
    }

    #[test]
    fn test_flat_layout_targets_base_dir() {
        let base = tempfile::tempdir().unwrap();
        let plan = plan(
            &track("Kesariya", &["Arijit Singh"], "Brahmastra", None),
            base.path(),
            false,
            false,
        )
        .unwrap();
        assert_eq!(plan.dir, base.path());
        assert_eq!(plan.stem, "Arijit Singh - Kesariya");
    }

    #[test]
    fn test_album_layout_creates_album_subdir() {
        let base = tempfile::tempdir().unwrap();
        let t = track("Kesariya", &["Arijit Singh"], "Brahmastra", None);

        let forced = plan(&t, base.path(), true, false).unwrap();
        assert_eq!(forced.dir, base.path().join("Brahmastra"));
        assert!(forced.dir.is_dir());
        assert_eq!(
            forced.final_path("flac"),
            base.path().join("Brahmastra").join("Arijit Singh - Kesariya.flac")
        );

        // Planning again over the existing directory is fine
        let again = plan(&t, base.path(), false, true).unwrap();
        assert_eq!(again, forced);
    }

    #[test]
    fn test_template_has_extension_placeholder() {
        let base = tempfile::tempdir().unwrap();
        let t = track("Song", &[UNKNOWN_ARTIST], UNKNOWN_ALBUM, Some("7"));
        let plan = plan(&t, base.path(), false, false).unwrap();
        assert!(plan.template().ends_with("07 - Song.%(ext)s"));
    }
}
