//! Upload classification
//!
//! Decides whether a stored clip is converted to AVI or forwarded as raw
//! MJPEG, and opens the companion WAV recorded alongside it.

use std::io::{Seek, SeekFrom};

use super::metadata::{parse_clip_name, ClipMetadata};
use crate::audio::WAV_HEADER_LEN;
use crate::config::CrabClipConfig;
use crate::errors::{ClipError, ClipResult};
use crate::storage::{stream_len, ClipStorage};

/// Companion audio positioned at the start of its PCM payload
#[derive(Debug)]
pub struct CompanionAudio<R> {
    pub reader: R,
    /// WAV file size minus the WAV header
    pub payload_len: u32,
}

/// A stored clip ready to hand to the [`Muxer`](crate::avi::Muxer)
#[derive(Debug)]
pub struct ClipUpload<R> {
    pub name: String,
    pub clip: R,
    pub clip_len: u64,
    /// `Some` only when the clip will be converted to AVI
    pub metadata: Option<ClipMetadata>,
    pub audio: Option<CompanionAudio<R>>,
}

impl<R> ClipUpload<R> {
    /// A clip forwarded unchanged
    pub fn pass_through(name: impl Into<String>, clip: R, clip_len: u64) -> Self {
        Self {
            name: name.into(),
            clip,
            clip_len,
            metadata: None,
            audio: None,
        }
    }

    pub fn eligible_for_avi(&self) -> bool {
        self.metadata.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub fn audio_len(&self) -> u32 {
        self.audio.as_ref().map_or(0, |a| a.payload_len)
    }
}

/// Open a WAV file and skip its header, `None` when absent or empty
pub fn open_companion_audio<S: ClipStorage>(
    storage: &S,
    audio_name: &str,
) -> ClipResult<Option<CompanionAudio<S::Reader>>> {
    let Some(mut reader) = storage.open(audio_name)? else {
        return Ok(None);
    };

    let file_len = stream_len(&mut reader)?;
    if file_len <= WAV_HEADER_LEN as u64 {
        return Ok(None);
    }
    let payload_len = u32::try_from(file_len - WAV_HEADER_LEN as u64).map_err(|_| {
        ClipError::ResourceExhausted(format!("{} byte audio file exceeds 4 GiB", file_len))
    })?;
    reader.seek(SeekFrom::Start(WAV_HEADER_LEN as u64))?;

    Ok(Some(CompanionAudio {
        reader,
        payload_len,
    }))
}

/// Classify a stored clip for upload
///
/// Clips whose name carries a frame count are converted to AVI (unless
/// conversion is disabled), everything else is uploaded verbatim.
pub fn classify<S: ClipStorage>(
    storage: &S,
    name: &str,
    config: &CrabClipConfig,
) -> ClipResult<ClipUpload<S::Reader>> {
    let mut clip = storage.open(name)?.ok_or_else(|| {
        ClipError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("clip not found: {}", name),
        ))
    })?;
    let clip_len = stream_len(&mut clip)?;

    let metadata = if config.mux.avi_enabled {
        parse_clip_name(name)
    } else {
        None
    };

    let Some(metadata) = metadata else {
        log::info!("Uploading {} as MJPEG", name);
        return Ok(ClipUpload::pass_through(name, clip, clip_len));
    };

    let audio_name = config.storage.audio_name_for(name);
    let audio = if audio_name != name {
        open_companion_audio(storage, &audio_name)?
    } else {
        None
    };

    match &audio {
        Some(a) => log::info!("Uploading {} as AVI with {} bytes of audio", name, a.payload_len),
        None => log::info!("Uploading {} as AVI", name),
    }

    Ok(ClipUpload {
        name: name.to_string(),
        clip,
        clip_len,
        metadata: Some(metadata),
        audio,
    })
}
