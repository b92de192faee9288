//! Stored clip identification
//!
//! Submodules:
//! - `frame_size`: sensor frame-size classes and dimensions
//! - `metadata`: clip name grammar
//! - `classify`: AVI / pass-through decision and companion audio lookup

mod classify;
mod frame_size;
mod metadata;

pub use classify::{classify, open_companion_audio, ClipUpload, CompanionAudio};
pub use frame_size::{FrameSize, FRAME_SIZE_TABLE, FRAME_SIZE_TABLE_VERSION};
pub use metadata::{clip_file_name, parse_clip_name, parse_name_fields, ClipMetadata};
