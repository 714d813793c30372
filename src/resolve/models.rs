//! Normalized track records and shape-tolerant JSON field types
//!
//! Catalog metadata arrives in several inconsistent shapes: an artist can
//! be a plain string, a `{name}` object, or a list of either; a cover can
//! be a URL string or a list of image variants. Each field shape is
//! modeled as an untagged enum with one normalization function instead of
//! ad hoc type checks at call sites.

use serde::Deserialize;
use serde_json::Value;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// The canonical unit flowing through the pipeline
///
/// Produced once by the resolver and immutable thereafter. Every field
/// has a deterministic fallback; the record is never partially built.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTrack {
    /// Never empty; synthesized placeholder if the source had none
    pub title: String,
    /// At least one entry; "Unknown Artist" if absent
    pub artists: Vec<String>,
    /// "Unknown Album" if absent
    pub album: String,
    pub duration: Option<String>,
    pub cover_art_url: Option<String>,
    /// Used for zero-padded ordering and filename prefixing
    pub track_number: Option<String>,
    pub year: Option<String>,
    pub genre: Option<String>,
    /// The location the acquisition driver will fetch
    pub source_url: String,
}

impl NormalizedTrack {
    /// All artists joined into a single display/tag string
    pub fn artist_line(&self) -> String {
        self.artists.join("; ")
    }
}

/// An ordered sequence of tracks plus layout and accounting context
///
/// A single track is a one-element sequence; nothing downstream
/// special-cases it.
#[derive(Debug, Clone)]
pub struct PlaylistContext {
    pub tracks: Vec<NormalizedTrack>,
    /// Whether album-style subdirectory layout applies
    pub album_layout: bool,
    /// One-based positions of probe entries that were null or empty;
    /// skipped but never fatal
    pub skipped_entries: Vec<usize>,
}

impl PlaylistContext {
    pub fn single(track: NormalizedTrack) -> Self {
        Self {
            tracks: vec![track],
            album_layout: false,
            skipped_entries: Vec::new(),
        }
    }

    /// Total entries the source declared, including skipped ones
    pub fn total(&self) -> usize {
        self.tracks.len() + self.skipped_entries.len()
    }
}

/// A field that is either a plain string or a `{name: ...}` object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringOrNamed {
    Named { name: String },
    Text(String),
}

impl StringOrNamed {
    pub fn into_name(self) -> String {
        match self {
            Self::Named { name } => name,
            Self::Text(text) => text,
        }
    }
}

/// A name field that may also be a list of [`StringOrNamed`]
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NameField {
    One(StringOrNamed),
    Many(Vec<StringOrNamed>),
}

impl NameField {
    pub fn into_names(self) -> Vec<String> {
        let names = match self {
            Self::One(one) => vec![one.into_name()],
            Self::Many(many) => many.into_iter().map(StringOrNamed::into_name).collect(),
        };
        names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect()
    }
}

/// A cover art field: a URL string or a list of image variants
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CoverField {
    Url(String),
    Variants(Vec<CoverVariant>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CoverVariant {
    Url(String),
    Entry {
        #[serde(alias = "link")]
        url: String,
    },
}

impl CoverVariant {
    fn into_url(self) -> String {
        match self {
            Self::Url(url) | Self::Entry { url } => url,
        }
    }
}

impl CoverField {
    /// First (highest-priority) variant wins for variant lists
    pub fn into_url(self) -> Option<String> {
        let url = match self {
            Self::Url(url) => url,
            Self::Variants(variants) => variants.into_iter().next()?.into_url(),
        };
        let url = url.trim().to_string();
        (!url.is_empty()).then_some(url)
    }
}

/// Normalize a string-or-`{name}`(-or-list) field to a single name
pub fn normalize_name(value: &Value) -> Option<String> {
    let names = normalize_names(value);
    if names.is_empty() {
        None
    } else {
        Some(names.join("; "))
    }
}

/// Normalize a string-or-`{name}`(-or-list) field to a name list
pub fn normalize_names(value: &Value) -> Vec<String> {
    serde_json::from_value::<NameField>(value.clone())
        .map(NameField::into_names)
        .unwrap_or_default()
}

/// Normalize a cover art field to a single URL
pub fn normalize_cover(value: &Value) -> Option<String> {
    serde_json::from_value::<CoverField>(value.clone())
        .ok()
        .and_then(CoverField::into_url)
}

/// Stringify a value that may be a string or a number (durations, track
/// numbers, timestamps)
pub fn normalize_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
