//! Synthetic recordings
//!
//! Clips are written with the same framing the live stream uses, so they
//! exercise the boundary scanner exactly like stored recordings do.

use chrono::{TimeZone, Utc};

use crate::audio::{noise_filter, write_wav, AnalogSource, SyntheticTone};
use crate::avi::framing::{write_frame, write_trailer};
use crate::clip::{clip_file_name, ClipMetadata, FrameSize};

/// A generated clip and the values needed to check its conversion
#[derive(Debug, Clone)]
pub struct ClipFixture {
    pub name: String,
    pub bytes: Vec<u8>,
    pub jpeg_sizes: Vec<u32>,
    pub metadata: ClipMetadata,
}

impl ClipFixture {
    pub fn jpeg_total(&self) -> u64 {
        self.jpeg_sizes.iter().map(|&s| u64::from(s)).sum()
    }
}

/// A JPEG-shaped payload of exactly `len` bytes
///
/// Starts with SOI and ends with EOI; the body varies with `seed` so frames
/// differ from each other.
pub fn synthetic_jpeg(seed: u32, len: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(len);
    data.extend_from_slice(&[0xFF, 0xD8]);
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    while data.len() + 2 < len {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        // avoid marker bytes inside the body
        data.push((state as u8) & 0x7F);
    }
    data.extend_from_slice(&[0xFF, 0xD9]);
    data.truncate(len);
    data
}

/// Multipart clip holding one synthetic JPEG per entry of `jpeg_sizes`
pub fn synthetic_clip(jpeg_sizes: &[u32]) -> Vec<u8> {
    let mut clip = Vec::new();
    for (seed, &size) in jpeg_sizes.iter().enumerate() {
        let jpeg = synthetic_jpeg(seed as u32, size as usize);
        // writing to a Vec cannot fail
        let _ = write_frame(&mut clip, &jpeg);
    }
    let _ = write_trailer(&mut clip);
    clip
}

/// Clip name in the recorder's naming scheme, fixed to 2024-03-15 14:25:01 UTC
pub fn test_clip_name(metadata: &ClipMetadata) -> String {
    let taken = Utc.with_ymd_and_hms(2024, 3, 15, 14, 25, 1).single();
    match taken {
        Some(taken) => clip_file_name(&taken, metadata, "mjpeg"),
        None => String::new(),
    }
}

impl ClipFixture {
    /// Build a named clip for `frame_size` at `fps`
    pub fn new(frame_size: FrameSize, fps: u32, jpeg_sizes: &[u32]) -> Self {
        let frame_count = jpeg_sizes.len() as u32;
        let metadata = ClipMetadata {
            frame_size,
            fps,
            duration_secs: frame_count / fps.max(1),
            frame_count,
        };
        Self {
            name: test_clip_name(&metadata),
            bytes: synthetic_clip(jpeg_sizes),
            jpeg_sizes: jpeg_sizes.to_vec(),
            metadata,
        }
    }
}

/// A filtered WAV file of `samples` samples of a synthetic tone
pub fn synthetic_wav(samples: usize, sample_rate: u32) -> Vec<u8> {
    let tone = SyntheticTone::new(u64::from(sample_rate / 440).max(2));
    let mut pcm: Vec<u8> = (0..samples).map(|_| (tone.read_raw() >> 4) as u8).collect();
    noise_filter(&mut pcm);

    let mut wav = Vec::new();
    let _ = write_wav(&mut wav, &pcm, sample_rate, pcm.len().max(1));
    wav
}
