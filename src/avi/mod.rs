//! MJPEG to AVI conversion
//!
//! Recorded clips are stored as a multipart JPEG stream, the same bytes the
//! live view serves. At upload time the [`Muxer`] rewrites that stream into
//! an AVI container one buffer at a time:
//!
//! ```text
//! header   310 bytes (+ 8 byte 01wb chunk header with audio)
//! audio    raw 8-bit PCM payload (optional)
//! per jpeg 00dc + LE size, jpeg bytes
//! index    idx1 + LE size, then per chunk: tag, 0, offset, size
//! ```
//!
//! Submodules:
//! - `framing`: multipart framing block geometry
//! - `header`: fixed-layout AVI header
//! - `index`: `idx1` index builder
//! - `muxer`: the pull-based streaming transform

pub mod framing;
mod header;
mod index;
mod muxer;

pub use header::{AviLayout, BuiltHeader, HeaderField, FieldWidth, AVI_HEADER_FIELDS, AVI_HEADER_TEMPLATE};
pub use index::{IndexBuilder, IndexEntry};
pub use muxer::{MuxState, Muxer, UploadMode, UploadStats};

/// Fixed AVI header length
pub const AVI_HEADER_LEN: usize = 310;
/// Per-chunk header: 4 byte tag + 4 byte LE size
pub const CHUNK_HEADER_LEN: usize = 8;
/// Bytes per `idx1` record
pub const INDEX_ENTRY_LEN: usize = 16;
/// Smallest output buffer the muxer accepts
pub const MIN_CHUNK_BUFFER: usize = AVI_HEADER_LEN + CHUNK_HEADER_LEN;

pub const VIDEO_CHUNK_TAG: [u8; 4] = *b"00dc";
pub const AUDIO_CHUNK_TAG: [u8; 4] = *b"01wb";
pub const INDEX_TAG: [u8; 4] = *b"idx1";

/// Write a 4 byte tag plus little-endian size
pub(crate) fn write_chunk_header(out: &mut [u8], tag: [u8; 4], size: u32) {
    out[..4].copy_from_slice(&tag);
    out[4..8].copy_from_slice(&size.to_le_bytes());
}
