//! Page extraction strategies
//!
//! The catalog page structure is not contractually stable, so metadata is
//! pulled through an ordered chain of independent strategies. Each one
//! swallows its own parse and shape errors and returns `None` to fall
//! through to the next; the first structurally valid record wins.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::ResolutionError;

use super::models::{
    normalize_cover, normalize_name, normalize_names, normalize_scalar, NormalizedTrack,
    UNKNOWN_ALBUM, UNKNOWN_ARTIST, UNKNOWN_TITLE,
};

static LD_JSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<script type="application/ld\+json">(.*?)</script>"#)
        .expect("linked-data pattern is valid")
});

static INITIAL_DATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)window\.__INITIAL_DATA__\s*=\s*(\{.*?\});")
        .expect("page-init pattern is valid")
});

static OG_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta\s+property="og:title"\s+content="([^"]*)""#)
        .expect("og:title pattern is valid")
});

static OG_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta\s+property="og:image"\s+content="([^"]*)""#)
        .expect("og:image pattern is valid")
});

static HTML_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title>(.*?)</title>").expect("title pattern is valid"));

/// A fetched catalog page plus the URL it came from
pub struct ProbePage<'a> {
    pub url: &'a str,
    pub html: &'a str,
}

/// One independent extraction attempt against a fetched page
pub trait Strategy {
    fn name(&self) -> &'static str;

    /// Return a complete record, or `None` to fall through
    fn try_resolve(&self, page: &ProbePage<'_>) -> Option<NormalizedTrack>;
}

/// Run the full chain; first structurally valid result wins
pub fn resolve_page(url: &str, html: &str) -> Result<NormalizedTrack, ResolutionError> {
    let page = ProbePage { url, html };

    for strategy in strategy_chain() {
        if let Some(track) = strategy.try_resolve(&page) {
            debug!("Resolved via {} strategy: {}", strategy.name(), track.title);
            return Ok(track);
        }
        debug!("Strategy {} produced nothing, falling through", strategy.name());
    }

    Err(ResolutionError::NoDataFound)
}

/// The prioritized chain, highest-fidelity source first
pub fn strategy_chain() -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(LinkedData),
        Box::new(PageInitData),
        Box::new(MetaTags),
        Box::new(UrlSlug),
    ]
}

/// Strategy 1: embedded `application/ld+json` blocks
///
/// Only a block whose declared `@type` is `MusicRecording` is accepted.
pub struct LinkedData;

impl Strategy for LinkedData {
    fn name(&self) -> &'static str {
        "linked-data"
    }

    fn try_resolve(&self, page: &ProbePage<'_>) -> Option<NormalizedTrack> {
        for capture in LD_JSON_RE.captures_iter(page.html) {
            let Ok(data) = serde_json::from_str::<Value>(capture[1].trim()) else {
                continue;
            };

            if data.get("@type").and_then(Value::as_str) != Some("MusicRecording") {
                continue;
            }

            let Some(title) = data
                .get("name")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
            else {
                continue;
            };

            let mut artists = normalize_names(&data["byArtist"]);
            if artists.is_empty() {
                artists.push(UNKNOWN_ARTIST.to_string());
            }

            return Some(NormalizedTrack {
                title,
                artists,
                album: normalize_name(&data["inAlbum"])
                    .unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
                duration: normalize_scalar(&data["duration"]),
                cover_art_url: normalize_cover(&data["image"]),
                track_number: None,
                year: None,
                genre: None,
                source_url: page.url.to_string(),
            });
        }

        None
    }
}

/// Strategy 2: the server-rendered `window.__INITIAL_DATA__` blob
///
/// Navigates the known `entities -> songs` path and takes the first song.
pub struct PageInitData;

impl Strategy for PageInitData {
    fn name(&self) -> &'static str {
        "page-init"
    }

    fn try_resolve(&self, page: &ProbePage<'_>) -> Option<NormalizedTrack> {
        let capture = INITIAL_DATA_RE.captures(page.html)?;
        let data = serde_json::from_str::<Value>(&capture[1]).ok()?;

        let songs = data.get("entities")?.get("songs")?.as_object()?;
        let song = songs.values().next()?;

        let title = song
            .get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNKNOWN_TITLE)
            .to_string();

        let mut artists = normalize_names(&song["primary_artists"]);
        if artists.is_empty() {
            artists.push(UNKNOWN_ARTIST.to_string());
        }

        Some(NormalizedTrack {
            title,
            artists,
            album: normalize_name(&song["album"]).unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
            duration: normalize_scalar(&song["duration"]),
            cover_art_url: normalize_cover(&song["image"]),
            track_number: None,
            year: None,
            genre: None,
            source_url: page.url.to_string(),
        })
    }
}

/// Strategy 3: OpenGraph meta tags, a last-resort title/image pair
pub struct MetaTags;

impl Strategy for MetaTags {
    fn name(&self) -> &'static str {
        "meta-tags"
    }

    fn try_resolve(&self, page: &ProbePage<'_>) -> Option<NormalizedTrack> {
        let title = OG_TITLE_RE
            .captures(page.html)
            .map(|c| c[1].trim().to_string())
            .filter(|t| !t.is_empty())?;

        let cover_art_url = OG_IMAGE_RE
            .captures(page.html)
            .map(|c| c[1].trim().to_string())
            .filter(|u| !u.is_empty());

        Some(NormalizedTrack {
            title,
            artists: vec![UNKNOWN_ARTIST.to_string()],
            album: UNKNOWN_ALBUM.to_string(),
            duration: None,
            cover_art_url,
            track_number: None,
            year: None,
            genre: None,
            source_url: page.url.to_string(),
        })
    }
}

/// Strategy 4: derive a title from the HTML `<title>` or the URL slug
pub struct UrlSlug;

impl Strategy for UrlSlug {
    fn name(&self) -> &'static str {
        "url-slug"
    }

    fn try_resolve(&self, page: &ProbePage<'_>) -> Option<NormalizedTrack> {
        let title = html_title(page.html)
            .or_else(|| slug_title(page.url))
            .filter(|t| !t.is_empty())?;

        Some(NormalizedTrack {
            title,
            artists: vec![UNKNOWN_ARTIST.to_string()],
            album: UNKNOWN_ALBUM.to_string(),
            duration: None,
            cover_art_url: None,
            track_number: None,
            year: None,
            genre: None,
            source_url: page.url.to_string(),
        })
    }
}

/// Text of the `<title>` element before any " - Site Name" suffix
fn html_title(html: &str) -> Option<String> {
    let raw = HTML_TITLE_RE.captures(html)?[1].trim().to_string();
    let title = raw.split(" - ").next().unwrap_or("").trim().to_string();
    (!title.is_empty()).then_some(title)
}

/// Title-cased last path segment of the URL, with hyphens as spaces
fn slug_title(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).next_back()?;

    let words: Vec<String> = segment
        .split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();

    let title = words.join(" ");
    (!title.is_empty()).then_some(title)
}
