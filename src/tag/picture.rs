//! Vorbis comment picture block encoding
//!
//! Ogg containers have no binary attachment primitive, so cover art is
//! carried as a FLAC-style picture block, base64-encoded, under the
//! standard `METADATA_BLOCK_PICTURE` comment key. Other readers of the
//! container depend on this exact layout.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::utils::cover_art::ProcessedCover;

/// The standard Vorbis comment key for an embedded picture
pub const METADATA_BLOCK_PICTURE: &str = "METADATA_BLOCK_PICTURE";

/// Picture type 3 = front cover
const FRONT_COVER: u32 = 3;

const JPEG_MIME: &str = "image/jpeg";

/// Color depth of the baseline JPEG covers we embed
const COLOR_DEPTH: u32 = 24;

/// Serialize a processed cover as a base64 METADATA_BLOCK_PICTURE value
///
/// Layout (all integers big-endian): picture type, MIME length + bytes,
/// description length + bytes, width, height, depth, color count,
/// data length + bytes.
pub fn encode_metadata_block_picture(cover: &ProcessedCover) -> String {
    let mime = JPEG_MIME.as_bytes();
    let mut block = Vec::with_capacity(cover.data.len() + mime.len() + 32);

    block.extend_from_slice(&FRONT_COVER.to_be_bytes());
    block.extend_from_slice(&(mime.len() as u32).to_be_bytes());
    block.extend_from_slice(mime);
    block.extend_from_slice(&0u32.to_be_bytes()); // empty description
    block.extend_from_slice(&cover.width.to_be_bytes());
    block.extend_from_slice(&cover.height.to_be_bytes());
    block.extend_from_slice(&COLOR_DEPTH.to_be_bytes());
    block.extend_from_slice(&0u32.to_be_bytes()); // not palette-indexed
    block.extend_from_slice(&(cover.data.len() as u32).to_be_bytes());
    block.extend_from_slice(&cover.data);

    STANDARD.encode(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_be_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    #[test]
    fn test_block_layout_round_reads() {
        let cover = ProcessedCover {
            data: vec![0xFF, 0xD8, 0xFF, 0xE0],
            width: 500,
            height: 500,
        };
        let encoded = encode_metadata_block_picture(&cover);
        let block = STANDARD.decode(encoded).unwrap();

        assert_eq!(read_u32(&block, 0), FRONT_COVER);

        let mime_len = read_u32(&block, 4) as usize;
        assert_eq!(&block[8..8 + mime_len], JPEG_MIME.as_bytes());

        let mut at = 8 + mime_len;
        let desc_len = read_u32(&block, at) as usize;
        assert_eq!(desc_len, 0);
        at += 4;

        assert_eq!(read_u32(&block, at), 500); // width
        assert_eq!(read_u32(&block, at + 4), 500); // height
        assert_eq!(read_u32(&block, at + 8), COLOR_DEPTH);
        assert_eq!(read_u32(&block, at + 12), 0); // colors
        at += 16;

        let data_len = read_u32(&block, at) as usize;
        assert_eq!(data_len, 4);
        assert_eq!(&block[at + 4..], &cover.data[..]);
    }

    #[test]
    fn test_output_is_valid_base64() {
        let cover = ProcessedCover {
            data: vec![1, 2, 3],
            width: 1,
            height: 1,
        };
        let encoded = encode_metadata_block_picture(&cover);
        assert!(STANDARD.decode(encoded).is_ok());
    }
}
