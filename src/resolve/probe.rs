//! Resolution from a pre-fetched tool probe blob
//!
//! The download tool's probe mode returns a single JSON document that is
//! either one track or a playlist container of tracks. Entries use the
//! same loosely-shaped fields as the page strategies, so the normalization
//! helpers from [`super::models`] apply here too.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ResolutionError;

use super::models::{
    normalize_cover, normalize_names, normalize_scalar, NormalizedTrack,
    PlaylistContext, UNKNOWN_ALBUM, UNKNOWN_ARTIST, UNKNOWN_TITLE,
};

/// Ordered candidate fields for the release year; the first present value
/// contributes its first four characters
const YEAR_KEYS: [&str; 4] = ["release_year", "release_date", "upload_date", "timestamp"];

const ALBUM_KEYS: [&str; 4] = ["album", "album_name", "playlist", "series"];

const TRACK_NUMBER_KEYS: [&str; 3] = ["track_number", "playlist_index", "playlist_autonumber"];

/// Resolve a probe blob into an ordered track sequence
///
/// A `_type == "playlist"` marker or an entry count above one signals
/// playlist mode; null or empty constituent entries are skipped and
/// counted, never fatal.
pub fn resolve_probe(blob: &Value, fallback_url: &str) -> Result<PlaylistContext, ResolutionError> {
    let Some(info) = blob.as_object() else {
        return Err(ResolutionError::NoDataFound);
    };
    if info.is_empty() {
        return Err(ResolutionError::NoDataFound);
    }

    let n_entries = blob
        .get("n_entries")
        .and_then(Value::as_u64)
        .unwrap_or_default();
    let is_playlist =
        blob.get("_type").and_then(Value::as_str) == Some("playlist") || n_entries > 1;

    if !is_playlist {
        return Ok(PlaylistContext {
            tracks: vec![entry_to_track(blob, fallback_url)],
            album_layout: false,
            skipped_entries: Vec::new(),
        });
    }

    let entries = blob
        .get("entries")
        .and_then(Value::as_array)
        .filter(|e| !e.is_empty())
        .ok_or(ResolutionError::EmptyPlaylist)?;

    debug!("Probe detected playlist with {} entries", entries.len());

    let mut tracks = Vec::with_capacity(entries.len());
    let mut skipped_entries = Vec::new();

    for (idx, entry) in entries.iter().enumerate() {
        let usable = entry.as_object().is_some_and(|o| !o.is_empty());
        if !usable {
            warn!("Skipping playlist entry {}: empty entry", idx + 1);
            skipped_entries.push(idx + 1);
            continue;
        }
        tracks.push(entry_to_track(entry, fallback_url));
    }

    if tracks.is_empty() {
        return Err(ResolutionError::EmptyPlaylist);
    }

    Ok(PlaylistContext {
        tracks,
        album_layout: true,
        skipped_entries,
    })
}

/// Build a complete record from one probe entry, synthesizing fallbacks
fn entry_to_track(entry: &Value, fallback_url: &str) -> NormalizedTrack {
    let title = entry
        .get("title")
        .or_else(|| entry.get("track"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNKNOWN_TITLE)
        .to_string();

    let album = ALBUM_KEYS
        .iter()
        .filter_map(|k| entry.get(*k))
        .find_map(|v| {
            v.as_str()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| UNKNOWN_ALBUM.to_string());

    let track_number = TRACK_NUMBER_KEYS
        .iter()
        .filter_map(|k| entry.get(*k))
        .find_map(normalize_scalar);

    let cover_art_url = entry
        .get("thumbnail")
        .and_then(normalize_cover)
        .or_else(|| entry.get("thumbnails").and_then(normalize_cover))
        .or_else(|| entry.get("image").and_then(normalize_cover));

    let source_url = entry
        .get("webpage_url")
        .or_else(|| entry.get("url"))
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())
        .unwrap_or(fallback_url)
        .to_string();

    NormalizedTrack {
        title,
        artists: pick_artists(entry),
        album,
        duration: entry.get("duration").and_then(normalize_scalar),
        cover_art_url,
        track_number,
        year: extract_year(entry),
        genre: extract_genre(entry),
        source_url,
    }
}

/// Artist names from a probe entry: `artist`, then `artists` (string or
/// list of strings or `{name}` objects), then `creator`
fn pick_artists(entry: &Value) -> Vec<String> {
    if let Some(artist) = entry
        .get("artist")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|a| !a.is_empty())
    {
        return vec![artist.to_string()];
    }

    if let Some(artists) = entry.get("artists") {
        let names = normalize_names(artists);
        if !names.is_empty() {
            return names;
        }
    }

    if let Some(creator) = entry
        .get("creator")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        return vec![creator.to_string()];
    }

    vec![UNKNOWN_ARTIST.to_string()]
}

/// First four characters of the first present year candidate field
pub fn extract_year(entry: &Value) -> Option<String> {
    YEAR_KEYS
        .iter()
        .filter_map(|k| entry.get(*k))
        .find_map(normalize_scalar)
        .map(|v| v.chars().take(4).collect())
}

/// Genre as a single string or a list joined with "; "
pub fn extract_genre(entry: &Value) -> Option<String> {
    let genre = entry.get("genre")?;
    let joined = match genre {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        _ => return None,
    };
    (!joined.is_empty()).then_some(joined)
}
