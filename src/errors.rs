//! Error types for clip classification, muxing and audio capture

use thiserror::Error;

/// Errors surfaced to the upload and recording orchestration
#[derive(Error, Debug)]
pub enum ClipError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An embedded frame length field was zero or not a number
    #[error("AVI conversion failed on frame {frame}: {reason}")]
    CorruptFrame { frame: u32, reason: String },

    #[error("Corrupt clip: {0}")]
    CorruptClip(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Invalid clip metadata: {0}")]
    InvalidMetadata(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("An upload session is already active")]
    SessionActive,

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClipError {
    /// True for errors that mean the clip itself is unusable as an AVI source
    pub fn is_source_corruption(&self) -> bool {
        matches!(self, ClipError::CorruptFrame { .. } | ClipError::CorruptClip(_))
    }
}

/// Result alias used throughout the crate
pub type ClipResult<T> = Result<T, ClipError>;
