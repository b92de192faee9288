//! CrabClip: upload-time MJPEG to AVI muxing for camera clip recorders
//!
//! Recorded clips are stored as the same multipart JPEG stream the live view
//! serves. When a clip leaves the device this crate rewrites it into an AVI
//! container on the fly, one caller buffer at a time, without ever holding
//! the whole file in memory. A companion microphone recording, captured while
//! the clip was being recorded, is interleaved as a PCM audio stream.
//!
//! # Features
//! - Pull-based AVI muxer over fixed-size buffers
//! - Clip classification from file name metadata
//! - Fixed-rate 8-bit microphone capture with WAV output
//! - Pluggable clip storage (filesystem or in-memory)
//! - Layered TOML and environment configuration
//!
//! # Usage
//! ```rust,no_run
//! use crabclip::{upload_clip, CrabClipConfig, FsStorage};
//!
//! let config = CrabClipConfig::load_or_default();
//! let storage = FsStorage::new(&config.storage.clip_directory);
//! let mut sink = std::fs::File::create("clip.avi").unwrap();
//! let stats = upload_clip(&storage, "20240315_142501_8_25_12_300.mjpeg", &config, &mut sink).unwrap();
//! println!("{} frames", stats.frames_emitted);
//! ```
pub mod audio;
pub mod avi;
pub mod clip;
pub mod config;
pub mod errors;
pub mod storage;
pub mod timing;
pub mod upload;

// Testing utilities - synthetic clips and audio for offline testing
pub mod testing;

// Re-exports for convenience
pub use audio::{AnalogSource, AudioCaptureSummary, AudioRecorder, SyntheticTone};
pub use avi::{MuxState, Muxer, UploadMode, UploadStats};
pub use clip::{classify, parse_clip_name, ClipMetadata, ClipUpload, FrameSize};
pub use config::CrabClipConfig;
pub use errors::{ClipError, ClipResult};
pub use storage::{ClipStorage, FsStorage, MemoryStorage};
pub use upload::upload_clip;

/// Initialize logging for clip processing
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "crabclip=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        frame_size_table_version: clip::FRAME_SIZE_TABLE_VERSION,
        microphone_backend: cfg!(feature = "microphone"),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub frame_size_table_version: u32,
    /// Built with the cpal microphone input
    pub microphone_backend: bool,
}
