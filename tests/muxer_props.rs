//! Property-Based Tests for the CrabClip AVI Muxer
//!
//! These tests verify the size, index and re-chunking invariants of the
//! streaming transform using proptest for input generation and shrinking.
//!
//! Run with: cargo test --test muxer_props

use std::io::Cursor;

use proptest::prelude::*;

use crabclip::avi::{IndexEntry, Muxer, MIN_CHUNK_BUFFER};
use crabclip::clip::{ClipMetadata, ClipUpload, CompanionAudio, FrameSize};
use crabclip::config::MuxConfig;
use crabclip::testing::synthetic_clip;

fn mux_config() -> MuxConfig {
    MuxConfig {
        avi_enabled: true,
        cluster_size: 32 * 1024,
        max_frames: 20_000,
    }
}

fn upload(sizes: &[u32], audio: Option<Vec<u8>>) -> ClipUpload<Cursor<Vec<u8>>> {
    let clip = synthetic_clip(sizes);
    ClipUpload {
        name: "props.mjpeg".to_string(),
        clip_len: clip.len() as u64,
        clip: Cursor::new(clip),
        metadata: Some(ClipMetadata {
            frame_size: FrameSize::Svga,
            fps: 20,
            duration_secs: 1,
            frame_count: sizes.len() as u32,
        }),
        audio: audio.map(|pcm| CompanionAudio {
            payload_len: pcm.len() as u32,
            reader: Cursor::new(pcm),
        }),
    }
}

fn convert(upload: ClipUpload<Cursor<Vec<u8>>>, buf_len: usize) -> Vec<u8> {
    let mut muxer = Muxer::new(&mux_config());
    muxer.start(upload).expect("start should succeed");
    let mut buf = vec![0u8; buf_len];
    let mut out = Vec::new();
    loop {
        let n = muxer.produce_next_chunk(&mut buf).expect("conversion should succeed");
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    out
}

fn index_of(avi: &[u8], chunks: usize) -> Vec<IndexEntry> {
    let len = 8 + 16 * chunks;
    IndexEntry::parse_block(&avi[avi.len() - len..]).expect("index block should parse")
}

// ═══════════════════════════════════════════════════════════════════════════
// OUTPUT SIZE INVARIANTS
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// INVARIANT: Output length is header + chunk headers + JPEG bytes + index
    #[test]
    fn output_length_matches_formula(
        sizes in prop::collection::vec(1u32..3000, 1..20),
    ) {
        let avi = convert(upload(&sizes, None), 4096);
        let frames = sizes.len() as u64;
        let jpeg: u64 = sizes.iter().map(|&s| u64::from(s)).sum();
        prop_assert_eq!(avi.len() as u64, 310 + frames * 8 + jpeg + 8 + frames * 16);

        let riff = u32::from_le_bytes([avi[4], avi[5], avi[6], avi[7]]);
        prop_assert_eq!(u64::from(riff) + 8, avi.len() as u64);
    }

    /// INVARIANT: Index entries are contiguous and end at the movi payload size
    #[test]
    fn index_offsets_are_contiguous(
        sizes in prop::collection::vec(1u32..2000, 1..16),
        audio_len in 0usize..1500,
    ) {
        let audio = (audio_len > 0).then(|| vec![0x80u8; audio_len]);
        let chunks = sizes.len() + usize::from(audio.is_some());
        let avi = convert(upload(&sizes, audio), 2048);
        let entries = index_of(&avi, chunks);

        prop_assert_eq!(entries.len(), chunks);
        let mut expected = 0u32;
        for entry in &entries {
            prop_assert_eq!(entry.offset, expected);
            expected += entry.size + 8;
        }
        let last = entries.last().unwrap();
        let movi = sizes.iter().sum::<u32>() + audio_len as u32;
        prop_assert_eq!(last.offset + last.size, movi + 8 * (chunks as u32 - 1));
        prop_assert_eq!(&entries[entries.len() - 1].tag, b"00dc");
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RE-CHUNKING INVARIANTS
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// INVARIANT: Output bytes do not depend on the caller's buffer size
    #[test]
    fn output_is_independent_of_buffer_size(
        sizes in prop::collection::vec(1u32..5000, 1..12),
        buf_len in MIN_CHUNK_BUFFER..2000,
    ) {
        let small = convert(upload(&sizes, None), 512);
        let large = convert(upload(&sizes, None), 32 * 1024);
        let odd = convert(upload(&sizes, None), buf_len);
        prop_assert_eq!(&small, &large);
        prop_assert_eq!(&odd, &large);
    }

    /// INVARIANT: Every JPEG appears intact behind its chunk header
    #[test]
    fn jpeg_payloads_survive(
        sizes in prop::collection::vec(4u32..1200, 1..8),
        buf_len in MIN_CHUNK_BUFFER..700,
    ) {
        let avi = convert(upload(&sizes, None), buf_len);
        let mut at = 310;
        for (seed, &size) in sizes.iter().enumerate() {
            prop_assert_eq!(&avi[at..at + 4], b"00dc");
            prop_assert_eq!(&avi[at + 4..at + 8], &size.to_le_bytes());
            let jpeg = crabclip::testing::synthetic_jpeg(seed as u32, size as usize);
            prop_assert_eq!(&avi[at + 8..at + 8 + size as usize], &jpeg[..]);
            at += 8 + size as usize;
        }
        prop_assert_eq!(&avi[at..at + 4], b"idx1");
    }
}
