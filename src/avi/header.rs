//! Fixed-layout AVI header
//!
//! The header is a 310 byte template (RIFF/hdrl with one MJPEG video stream
//! list and one 8-bit PCM audio stream list, followed by the `movi` LIST
//! opener). Per clip values are patched in at the offsets declared in
//! [`AVI_HEADER_FIELDS`].

use super::framing::{FRAMING_LEN, STREAM_BOUNDARY_LEN};
use super::index::IndexBuilder;
use super::{
    write_chunk_header, AUDIO_CHUNK_TAG, AVI_HEADER_LEN, CHUNK_HEADER_LEN, INDEX_ENTRY_LEN,
};
use crate::clip::FrameSize;
use crate::errors::{ClipError, ClipResult};

#[rustfmt::skip]
pub const AVI_HEADER_TEMPLATE: [u8; AVI_HEADER_LEN] = [
    0x52, 0x49, 0x46, 0x46, 0x00, 0x00, 0x00, 0x00, 0x41, 0x56, 0x49, 0x20, 0x4C, 0x49, 0x53, 0x54,
    0x16, 0x01, 0x00, 0x00, 0x68, 0x64, 0x72, 0x6C, 0x61, 0x76, 0x69, 0x68, 0x38, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0xE0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x4C, 0x49, 0x53, 0x54, 0x6C, 0x00, 0x00, 0x00,
    0x73, 0x74, 0x72, 0x6C, 0x73, 0x74, 0x72, 0x68, 0x30, 0x00, 0x00, 0x00, 0x76, 0x69, 0x64, 0x73,
    0x4D, 0x4A, 0x50, 0x47, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x73, 0x74, 0x72, 0x66,
    0x28, 0x00, 0x00, 0x00, 0x28, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x01, 0x00, 0x18, 0x00, 0x4D, 0x4A, 0x50, 0x47, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // audio stream list
    0x4C, 0x49, 0x53, 0x54, 0x56, 0x00, 0x00, 0x00,
    0x73, 0x74, 0x72, 0x6C, 0x73, 0x74, 0x72, 0x68, 0x30, 0x00, 0x00, 0x00, 0x61, 0x75, 0x64, 0x73,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x01, 0x00, 0x00, 0x00, 0x11, 0x2B, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x11, 0x2B, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x73, 0x74, 0x72, 0x66,
    0x12, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x11, 0x2B, 0x00, 0x00, 0x11, 0x2B, 0x00, 0x00,
    0x01, 0x00, 0x08, 0x00, 0x00, 0x00,
    // movi list opener
    0x4C, 0x49, 0x53, 0x54, 0x00, 0x00, 0x00, 0x00, 0x6D, 0x6F, 0x76, 0x69,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    U16,
    U32,
}

/// A patchable little-endian field of the header template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderField {
    pub name: &'static str,
    pub offset: usize,
    pub width: FieldWidth,
}

impl HeaderField {
    const fn u32(name: &'static str, offset: usize) -> Self {
        Self { name, offset, width: FieldWidth::U32 }
    }

    const fn u16(name: &'static str, offset: usize) -> Self {
        Self { name, offset, width: FieldWidth::U16 }
    }

    fn write(&self, header: &mut [u8], value: u32) {
        match self.width {
            FieldWidth::U32 => header[self.offset..self.offset + 4].copy_from_slice(&value.to_le_bytes()),
            FieldWidth::U16 => {
                header[self.offset..self.offset + 2].copy_from_slice(&(value as u16).to_le_bytes())
            }
        }
    }

    /// Read the field back out of a header
    pub fn read(&self, header: &[u8]) -> u32 {
        let at = self.offset;
        match self.width {
            FieldWidth::U32 => u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]]),
            FieldWidth::U16 => u32::from(u16::from_le_bytes([header[at], header[at + 1]])),
        }
    }
}

pub const RIFF_SIZE: HeaderField = HeaderField::u32("riff_size", 0x04);
pub const MICROS_PER_FRAME: HeaderField = HeaderField::u32("micros_per_frame", 0x20);
pub const TOTAL_FRAMES: HeaderField = HeaderField::u32("total_frames", 0x30);
pub const STREAM_COUNT: HeaderField = HeaderField::u32("stream_count", 0x38);
pub const WIDTH: HeaderField = HeaderField::u16("width", 0x40);
pub const HEIGHT: HeaderField = HeaderField::u16("height", 0x44);
pub const VIDEO_RATE: HeaderField = HeaderField::u32("video_rate", 0x84);
pub const VIDEO_LENGTH: HeaderField = HeaderField::u32("video_length", 0x8C);
pub const BITMAP_WIDTH: HeaderField = HeaderField::u16("bitmap_width", 0xA8);
pub const BITMAP_HEIGHT: HeaderField = HeaderField::u16("bitmap_height", 0xAC);
pub const AUDIO_LENGTH: HeaderField = HeaderField::u32("audio_length", 0x100);
pub const MOVI_LIST_SIZE: HeaderField = HeaderField::u32("movi_list_size", 0x12E);

/// Every field patched per clip, in write order
pub const AVI_HEADER_FIELDS: [HeaderField; 12] = [
    RIFF_SIZE,
    MICROS_PER_FRAME,
    TOTAL_FRAMES,
    STREAM_COUNT,
    WIDTH,
    HEIGHT,
    VIDEO_RATE,
    VIDEO_LENGTH,
    BITMAP_WIDTH,
    BITMAP_HEIGHT,
    AUDIO_LENGTH,
    MOVI_LIST_SIZE,
];

/// Everything the header depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AviLayout {
    pub frame_count: u32,
    pub fps: u32,
    pub frame_size: FrameSize,
    /// Size of the stored multipart clip
    pub clip_len: u64,
    /// Companion audio payload (WAV minus header), 0 without audio
    pub audio_len: u32,
}

/// Header bytes plus the index reserved for the clip's chunks
#[derive(Debug)]
pub struct BuiltHeader {
    pub bytes: Vec<u8>,
    pub index: IndexBuilder,
}

fn to_u32(value: u64, what: &str) -> ClipResult<u32> {
    u32::try_from(value)
        .map_err(|_| ClipError::ResourceExhausted(format!("{} of {} bytes exceeds 4 GiB", what, value)))
}

impl AviLayout {
    pub fn has_audio(&self) -> bool {
        self.audio_len > 0
    }

    /// Chunks in the movi list: one per frame plus the audio block
    pub fn chunk_count(&self) -> u32 {
        self.frame_count + u32::from(self.has_audio())
    }

    /// JPEG and audio payload bytes once all framing is stripped
    pub fn movi_payload_len(&self) -> ClipResult<u32> {
        let framing = u64::from(self.frame_count) * FRAMING_LEN as u64 + STREAM_BOUNDARY_LEN as u64;
        let video = self.clip_len.checked_sub(framing).ok_or_else(|| {
            ClipError::CorruptClip(format!(
                "{} byte clip is too short for {} frames",
                self.clip_len, self.frame_count
            ))
        })?;
        to_u32(video + u64::from(self.audio_len), "movi payload")
    }

    /// RIFF size field: everything after the first 8 bytes
    pub fn container_len(&self) -> ClipResult<u32> {
        let overhead = (CHUNK_HEADER_LEN + INDEX_ENTRY_LEN) as u64 * u64::from(self.chunk_count());
        let len = u64::from(self.movi_payload_len()?) + AVI_HEADER_LEN as u64 + overhead;
        to_u32(len, "AVI container")
    }

    /// Total bytes a conversion session emits
    pub fn output_len(&self) -> ClipResult<u64> {
        Ok(u64::from(self.container_len()?) + CHUNK_HEADER_LEN as u64)
    }

    /// `movi` LIST size: payload, chunk headers and the `movi` tag
    pub fn movi_list_len(&self) -> ClipResult<u32> {
        let len = u64::from(self.movi_payload_len()?)
            + CHUNK_HEADER_LEN as u64 * u64::from(self.chunk_count())
            + 4;
        to_u32(len, "movi list")
    }

    pub fn micros_per_frame(&self) -> u32 {
        (1_000_000.0 / f64::from(self.fps)).round() as u32
    }

    fn field_values(&self) -> ClipResult<[(HeaderField, u32); 12]> {
        let (width, height) = self.frame_size.dimensions();
        let streams = if self.has_audio() { 2 } else { 1 };
        Ok([
            (RIFF_SIZE, self.container_len()?),
            (MICROS_PER_FRAME, self.micros_per_frame()),
            (TOTAL_FRAMES, self.frame_count),
            (STREAM_COUNT, streams),
            (WIDTH, u32::from(width)),
            (HEIGHT, u32::from(height)),
            (VIDEO_RATE, self.fps),
            (VIDEO_LENGTH, self.frame_count),
            (BITMAP_WIDTH, u32::from(width)),
            (BITMAP_HEIGHT, u32::from(height)),
            (AUDIO_LENGTH, self.audio_len),
            (MOVI_LIST_SIZE, self.movi_list_len()?),
        ])
    }

    /// Build the header and reserve the clip's index
    pub fn build(&self, max_frames: u32) -> ClipResult<BuiltHeader> {
        if self.fps == 0 {
            return Err(ClipError::InvalidMetadata("frame rate of 0".to_string()));
        }
        if self.frame_count > max_frames {
            return Err(ClipError::ResourceExhausted(format!(
                "{} frames declared, index limited to {}",
                self.frame_count, max_frames
            )));
        }

        let mut bytes = Vec::with_capacity(AVI_HEADER_LEN + CHUNK_HEADER_LEN);
        bytes.extend_from_slice(&AVI_HEADER_TEMPLATE);
        for (field, value) in self.field_values()? {
            field.write(&mut bytes, value);
        }

        let mut index = IndexBuilder::with_capacity(self.chunk_count() as usize)?;
        if self.has_audio() {
            let mut chunk = [0u8; CHUNK_HEADER_LEN];
            write_chunk_header(&mut chunk, AUDIO_CHUNK_TAG, self.audio_len);
            bytes.extend_from_slice(&chunk);
            index.append(AUDIO_CHUNK_TAG, self.audio_len)?;
        }

        Ok(BuiltHeader { bytes, index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vga_layout(audio_len: u32) -> AviLayout {
        AviLayout {
            frame_count: 3,
            fps: 25,
            frame_size: FrameSize::Vga,
            clip_len: 3 * 92 + 3100 + 36,
            audio_len,
        }
    }

    #[test]
    fn test_template_structure() {
        assert_eq!(&AVI_HEADER_TEMPLATE[..4], b"RIFF");
        assert_eq!(&AVI_HEADER_TEMPLATE[8..12], b"AVI ");
        assert_eq!(&AVI_HEADER_TEMPLATE[0x58..0x5C], b"LIST");
        assert_eq!(&AVI_HEADER_TEMPLATE[0xCC..0xD0], b"LIST");
        assert_eq!(&AVI_HEADER_TEMPLATE[AVI_HEADER_LEN - 4..], b"movi");
    }

    #[test]
    fn test_sizes_without_audio() {
        let layout = vga_layout(0);
        assert_eq!(layout.movi_payload_len().unwrap(), 3100);
        assert_eq!(layout.container_len().unwrap(), 3100 + 310 + 24 * 3);
        assert_eq!(layout.output_len().unwrap(), 3490);
        assert_eq!(layout.movi_list_len().unwrap(), 3100 + 24 + 4);
    }

    #[test]
    fn test_header_fields_without_audio() {
        let built = vga_layout(0).build(20_000).unwrap();
        let header = &built.bytes;
        assert_eq!(header.len(), AVI_HEADER_LEN);
        assert_eq!(MICROS_PER_FRAME.read(header), 40_000);
        assert_eq!(TOTAL_FRAMES.read(header), 3);
        assert_eq!(VIDEO_LENGTH.read(header), 3);
        assert_eq!(VIDEO_RATE.read(header), 25);
        assert_eq!(STREAM_COUNT.read(header), 1);
        assert_eq!((WIDTH.read(header), HEIGHT.read(header)), (640, 480));
        assert_eq!((BITMAP_WIDTH.read(header), BITMAP_HEIGHT.read(header)), (640, 480));
        assert_eq!(&header[0x40..0x42], &[0x80, 0x02]);
        assert_eq!(&header[0xAC..0xAE], &[0xE0, 0x01]);
        assert_eq!(AUDIO_LENGTH.read(header), 0);
        assert_eq!(built.index.capacity(), 3);
        assert!(built.index.is_empty());
    }

    #[test]
    fn test_header_with_audio() {
        let layout = vga_layout(2000);
        let built = layout.build(20_000).unwrap();
        let bytes = &built.bytes;
        assert_eq!(bytes.len(), AVI_HEADER_LEN + CHUNK_HEADER_LEN);
        assert_eq!(STREAM_COUNT.read(bytes), 2);
        assert_eq!(AUDIO_LENGTH.read(bytes), 2000);
        assert_eq!(&bytes[AVI_HEADER_LEN..AVI_HEADER_LEN + 4], b"01wb");
        assert_eq!(&bytes[AVI_HEADER_LEN + 4..], &2000u32.to_le_bytes());
        assert_eq!(RIFF_SIZE.read(bytes), 5100 + 310 + 24 * 4);

        let entries = built.index.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tag, AUDIO_CHUNK_TAG);
        assert_eq!(entries[0].offset, 0);
        assert_eq!(built.index.next_offset(), 2008);
    }

    #[test]
    fn test_micros_per_frame_rounds() {
        let mut layout = vga_layout(0);
        layout.fps = 3;
        assert_eq!(layout.micros_per_frame(), 333_333);
        layout.fps = 7;
        assert_eq!(layout.micros_per_frame(), 142_857);
    }

    #[test]
    fn test_rejects_bad_layouts() {
        let mut layout = vga_layout(0);
        layout.fps = 0;
        assert!(matches!(layout.build(100), Err(ClipError::InvalidMetadata(_))));

        let layout = vga_layout(0);
        assert!(matches!(layout.build(2), Err(ClipError::ResourceExhausted(_))));

        let mut layout = vga_layout(0);
        layout.clip_len = 100;
        assert!(matches!(layout.build(100), Err(ClipError::CorruptClip(_))));
    }
}
