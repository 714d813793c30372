//! Tagging engine
//!
//! Writes container-appropriate tags and embeds cover art into a finished
//! audio file. Field writes and the cover-art embed fail independently:
//! a bad cover never aborts the text fields already applied, and the
//! engine always saves whatever was successfully set. Only a container
//! open/save failure surfaces as a [`TaggingError`].

pub mod picture;

use std::path::Path;

use lofty::config::WriteOptions;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, ItemValue, Tag, TagItem, TagType};
use tracing::{debug, warn};

use crate::error::TaggingError;
use crate::resolve::NormalizedTrack;
use crate::utils::cover_art::{self, ProcessedCover};

/// Container format inferred from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Flac,
    Mp3,
    Mp4,
    Ogg,
}

impl Container {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "flac" => Some(Self::Flac),
            "mp3" => Some(Self::Mp3),
            "m4a" | "mp4" => Some(Self::Mp4),
            "ogg" | "oga" | "opus" => Some(Self::Ogg),
            _ => None,
        }
    }

    fn tag_type(self) -> TagType {
        match self {
            Self::Flac | Self::Ogg => TagType::VorbisComments,
            Self::Mp3 => TagType::Id3v2,
            Self::Mp4 => TagType::Mp4Ilst,
        }
    }
}

/// Seam for the tagging step, so the session can be exercised without
/// real container files
pub trait Tagger: Send + Sync {
    fn tag(
        &self,
        path: &Path,
        track: &NormalizedTrack,
        cover: Option<&[u8]>,
    ) -> Result<(), TaggingError>;
}

/// The lofty-backed engine used in production
pub struct LoftyTagger;

impl Tagger for LoftyTagger {
    fn tag(
        &self,
        path: &Path,
        track: &NormalizedTrack,
        cover: Option<&[u8]>,
    ) -> Result<(), TaggingError> {
        tag_file(path, track, cover)
    }
}

/// Write tags and cover art into the file at `path`
pub fn tag_file(
    path: &Path,
    track: &NormalizedTrack,
    cover: Option<&[u8]>,
) -> Result<(), TaggingError> {
    let container = Container::from_path(path).ok_or_else(|| TaggingError::UnsupportedContainer {
        path: path.to_path_buf(),
    })?;

    let mut tagged_file = Probe::open(path)
        .map_err(|source| TaggingError::Open {
            path: path.to_path_buf(),
            source,
        })?
        .read()
        .map_err(|source| TaggingError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let tag_type = container.tag_type();
    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| TaggingError::UnsupportedContainer {
            path: path.to_path_buf(),
        })?;

    apply_text_fields(tag, track);

    if let Some(bytes) = cover {
        match cover_art::process_cover_art(bytes) {
            Ok(processed) => embed_cover(tag, container, &processed),
            Err(e) => warn!("Skipping cover art for {}: {:#}", path.display(), e),
        }
    }

    // ID3v2.3 for the widest player compatibility
    let write_options = match container {
        Container::Mp3 => WriteOptions::default().use_id3v23(true),
        _ => WriteOptions::default(),
    };

    tagged_file
        .save_to_path(path, write_options)
        .map_err(|source| TaggingError::Save {
            path: path.to_path_buf(),
            source,
        })?;

    debug!("Tagged {} as {:?}", path.display(), container);
    Ok(())
}

/// Set the text fields; replace semantics keep repeated tagging idempotent
fn apply_text_fields(tag: &mut Tag, track: &NormalizedTrack) {
    let artist_line = track.artist_line();

    tag.set_title(track.title.clone());
    tag.set_artist(artist_line.clone());
    tag.set_album(track.album.clone());
    // Album artist mirrors the artist line
    tag.insert(TagItem::new(
        ItemKey::AlbumArtist,
        ItemValue::Text(artist_line),
    ));

    if let Some(number) = track
        .track_number
        .as_deref()
        .and_then(|n| n.parse::<u32>().ok())
    {
        tag.set_track(number);
    }
    if let Some(year) = track.year.as_deref().and_then(|y| y.parse::<u32>().ok()) {
        tag.set_year(year);
    }
    if let Some(genre) = &track.genre {
        tag.set_genre(genre.clone());
    }
}

/// Embed a processed JPEG cover the way the container expects
fn embed_cover(tag: &mut Tag, container: Container, cover: &ProcessedCover) {
    match container {
        // No binary attachment primitive in Vorbis comments on Ogg; the
        // picture block goes in as a base64 text comment.
        Container::Ogg => {
            let encoded = picture::encode_metadata_block_picture(cover);
            tag.insert_unchecked(TagItem::new(
                ItemKey::Unknown(picture::METADATA_BLOCK_PICTURE.to_string()),
                ItemValue::Text(encoded),
            ));
        }
        Container::Flac | Container::Mp3 | Container::Mp4 => {
            let front_cover = Picture::new_unchecked(
                PictureType::CoverFront,
                Some(MimeType::Jpeg),
                None,
                cover.data.clone(),
            );
            tag.remove_picture_type(PictureType::CoverFront);
            tag.push_picture(front_cover);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use std::path::PathBuf;

    fn sample_track() -> NormalizedTrack {
        NormalizedTrack {
            title: "Kesariya".to_string(),
            artists: vec!["Arijit Singh".to_string(), "Pritam".to_string()],
            album: "Brahmastra".to_string(),
            duration: Some("268".to_string()),
            cover_art_url: None,
            track_number: Some("3".to_string()),
            year: Some("2022".to_string()),
            genre: Some("Bollywood".to_string()),
            source_url: "https://www.jiosaavn.com/song/kesariya/HSFX".to_string(),
        }
    }

    fn sample_cover() -> ProcessedCover {
        ProcessedCover {
            data: vec![0xFF, 0xD8, 0xFF, 0xD9],
            width: 4,
            height: 4,
        }
    }

    #[test]
    fn test_container_dispatch() {
        assert_eq!(Container::from_path(Path::new("a.flac")), Some(Container::Flac));
        assert_eq!(Container::from_path(Path::new("a.MP3")), Some(Container::Mp3));
        assert_eq!(Container::from_path(Path::new("a.m4a")), Some(Container::Mp4));
        assert_eq!(Container::from_path(Path::new("a.opus")), Some(Container::Ogg));
        assert_eq!(Container::from_path(Path::new("a.wav")), None);
        assert_eq!(Container::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_text_fields_applied() {
        let mut tag = Tag::new(TagType::VorbisComments);
        apply_text_fields(&mut tag, &sample_track());

        assert_eq!(tag.title().as_deref(), Some("Kesariya"));
        assert_eq!(tag.artist().as_deref(), Some("Arijit Singh; Pritam"));
        assert_eq!(tag.album().as_deref(), Some("Brahmastra"));
        assert_eq!(tag.track(), Some(3));
        assert_eq!(tag.year(), Some(2022));
        assert_eq!(tag.genre().as_deref(), Some("Bollywood"));
        assert_eq!(
            tag.get_string(&ItemKey::AlbumArtist),
            Some("Arijit Singh; Pritam")
        );
    }

    #[test]
    fn test_text_fields_idempotent() {
        let mut tag = Tag::new(TagType::Id3v2);
        apply_text_fields(&mut tag, &sample_track());
        let count = tag.items().count();

        apply_text_fields(&mut tag, &sample_track());
        assert_eq!(tag.items().count(), count);
        assert_eq!(tag.title().as_deref(), Some("Kesariya"));
    }

    #[test]
    fn test_unparsable_track_number_is_skipped() {
        let mut track = sample_track();
        track.track_number = Some("A1".to_string());
        track.year = None;

        let mut tag = Tag::new(TagType::VorbisComments);
        apply_text_fields(&mut tag, &track);
        assert_eq!(tag.track(), None);
        assert_eq!(tag.year(), None);
    }

    #[test]
    fn test_ogg_cover_is_base64_text_comment() {
        let mut tag = Tag::new(TagType::VorbisComments);
        embed_cover(&mut tag, Container::Ogg, &sample_cover());

        assert_eq!(tag.pictures().len(), 0);
        let key = ItemKey::Unknown(picture::METADATA_BLOCK_PICTURE.to_string());
        let value = tag.get_string(&key).unwrap();
        let block = STANDARD.decode(value).unwrap();
        // picture type 3 = front cover
        assert_eq!(&block[..4], &3u32.to_be_bytes());
    }

    #[test]
    fn test_binary_containers_get_one_front_cover() {
        for container in [Container::Flac, Container::Mp3, Container::Mp4] {
            let mut tag = Tag::new(container.tag_type());
            embed_cover(&mut tag, container, &sample_cover());
            embed_cover(&mut tag, container, &sample_cover());

            assert_eq!(tag.pictures().len(), 1);
            assert_eq!(tag.pictures()[0].pic_type(), PictureType::CoverFront);
            assert_eq!(tag.pictures()[0].mime_type(), Some(&MimeType::Jpeg));
        }
    }

    #[test]
    fn test_unsupported_container_is_an_error() {
        let track = sample_track();
        let err = tag_file(&PathBuf::from("song.wav"), &track, None).unwrap_err();
        assert!(matches!(err, TaggingError::UnsupportedContainer { .. }));
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let track = sample_track();
        let err = tag_file(&PathBuf::from("/nonexistent/song.flac"), &track, None).unwrap_err();
        assert!(matches!(err, TaggingError::Open { .. }));
    }
}
