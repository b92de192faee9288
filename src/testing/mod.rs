//! Testing utilities for CrabClip
//!
//! Synthetic clips, companion WAV files and clip names shaped like real
//! recordings, so the muxer and upload path can be exercised offline.

pub mod synthetic_data;

pub use synthetic_data::{
    synthetic_clip,
    synthetic_jpeg,
    synthetic_wav,
    test_clip_name,
    ClipFixture,
};
