//! Pull-based MJPEG to AVI streaming transform
//!
//! # Spell: StreamingAviTransform
//! ^ Intent: rewrite a stored multipart JPEG clip into an AVI container one caller buffer at a time
//!
//! @Muxer
//!   : (ClipUpload, &mut [u8]) -> bytes written
//!   ! header_then_audio_then_video_then_index
//!   ! zero_only_at_end_of_stream
//!   ! resets_after_end_or_error
//!   ! one_session_at_a_time
//!   - whole_file_buffering
//!   - partial_container_on_corruption

use std::io::{self, Read};

use serde::{Deserialize, Serialize};

use super::framing::{
    parse_length_field, FRAMING_LEN, LENGTH_FIELD_LEN, LENGTH_OFFSET, STREAM_BOUNDARY,
};
use super::header::AviLayout;
use super::index::IndexBuilder;
use super::{write_chunk_header, CHUNK_HEADER_LEN, MIN_CHUNK_BUFFER, VIDEO_CHUNK_TAG};
use crate::clip::{ClipUpload, CompanionAudio};
use crate::config::MuxConfig;
use crate::errors::{ClipError, ClipResult};

/// Position of an AVI conversion session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MuxState {
    HeaderPending,
    AudioStreaming,
    VideoTransform,
    IndexStreaming,
    Terminated,
}

/// How a clip leaves the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadMode {
    Avi,
    PassThrough,
}

/// Summary of a finished upload session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadStats {
    pub clip_name: String,
    pub mode: UploadMode,
    pub frames_declared: u32,
    pub frames_emitted: u32,
    pub audio_bytes: u64,
    pub bytes_emitted: u64,
    /// Size the AVI header announced, `None` for pass-through
    pub expected_bytes: Option<u64>,
}

/// Fill `buf` from `source` until it is full or the source is exhausted
fn read_full<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// State carried between calls while converting one clip
struct AviSession<R> {
    state: MuxState,
    layout: AviLayout,
    header: Vec<u8>,
    index: Option<IndexBuilder>,
    index_cursor: usize,
    audio: Option<CompanionAudio<R>>,
    audio_remaining: u64,
    audio_sent: u64,
    /// Framing block fragment that straddled the previous cluster
    carry: [u8; FRAMING_LEN],
    carry_len: usize,
    /// JPEG bytes still to pass through before the next framing block
    payload_remaining: u64,
    /// JPEG bytes forwarded so far
    video_sent: u64,
    frames_emitted: u32,
}

impl<R: Read> AviSession<R> {
    fn new(layout: AviLayout, audio: Option<CompanionAudio<R>>, max_frames: u32) -> ClipResult<Self> {
        let built = layout.build(max_frames)?;
        let audio_remaining = u64::from(layout.audio_len);
        Ok(Self {
            state: MuxState::HeaderPending,
            layout,
            header: built.bytes,
            index: Some(built.index),
            index_cursor: 0,
            audio,
            audio_remaining,
            audio_sent: 0,
            carry: [0; FRAMING_LEN],
            carry_len: 0,
            payload_remaining: 0,
            video_sent: 0,
            frames_emitted: 0,
        })
    }

    fn produce(&mut self, clip: &mut R, out: &mut [u8]) -> ClipResult<usize> {
        loop {
            match self.state {
                MuxState::HeaderPending => {
                    let len = self.header.len();
                    out[..len].copy_from_slice(&self.header);
                    self.state = if self.audio.is_some() {
                        MuxState::AudioStreaming
                    } else {
                        MuxState::VideoTransform
                    };
                    return Ok(len);
                }
                MuxState::AudioStreaming => {
                    if let Some(sent) = self.stream_audio(out)? {
                        return Ok(sent);
                    }
                    self.state = MuxState::VideoTransform;
                }
                MuxState::VideoTransform => match self.transform_cluster(clip, out)? {
                    Some(0) => continue,
                    Some(len) => return Ok(len),
                    None => {
                        self.check_video_complete()?;
                        self.state = MuxState::IndexStreaming;
                    }
                },
                MuxState::IndexStreaming => {
                    let Some(index) = self.index.as_ref() else {
                        self.state = MuxState::Terminated;
                        continue;
                    };
                    let remaining = &index.as_bytes()[self.index_cursor..];
                    let len = remaining.len().min(out.len());
                    out[..len].copy_from_slice(&remaining[..len]);
                    self.index_cursor += len;
                    if self.index_cursor == index.as_bytes().len() {
                        self.index = None;
                        self.state = MuxState::Terminated;
                    }
                    if len > 0 {
                        return Ok(len);
                    }
                }
                MuxState::Terminated => return Ok(0),
            }
        }
    }

    /// Copy the next span of companion audio, `None` once it is exhausted
    fn stream_audio(&mut self, out: &mut [u8]) -> ClipResult<Option<usize>> {
        let Some(audio) = self.audio.as_mut() else {
            return Ok(None);
        };

        let want = self.audio_remaining.min(out.len() as u64) as usize;
        let read = if want == 0 {
            0
        } else {
            read_full(&mut audio.reader, &mut out[..want])?
        };

        if read > 0 {
            self.audio_remaining -= read as u64;
            self.audio_sent += read as u64;
            return Ok(Some(read));
        }

        if self.audio_remaining > 0 {
            log::warn!(
                "Companion audio ended {} bytes short of its declared length",
                self.audio_remaining
            );
        }
        self.audio = None;
        Ok(None)
    }

    /// Read one cluster and rewrite its framing in place
    ///
    /// Returns the transformed length, or `None` once the clip is exhausted.
    fn transform_cluster(&mut self, clip: &mut R, out: &mut [u8]) -> ClipResult<Option<usize>> {
        let carried = self.carry_len;
        out[..carried].copy_from_slice(&self.carry[..carried]);
        self.carry_len = 0;

        let read = read_full(clip, &mut out[carried..])?;
        if read == 0 {
            // left in place for check_video_complete
            self.carry_len = carried;
            return Ok(None);
        }
        let len = carried + read;

        // pos walks the source bytes, written trails it by the framing removed so far
        let mut pos = 0;
        let mut written = 0;
        loop {
            if self.payload_remaining > 0 {
                let take = self.payload_remaining.min((len - pos) as u64) as usize;
                out.copy_within(pos..pos + take, written);
                pos += take;
                written += take;
                self.payload_remaining -= take as u64;
                self.video_sent += take as u64;
                if self.payload_remaining > 0 {
                    break;
                }
            }

            let rest = len - pos;
            if rest == 0 {
                break;
            }
            if rest < FRAMING_LEN {
                self.carry[..rest].copy_from_slice(&out[pos..len]);
                self.carry_len = rest;
                break;
            }

            let frame = self.frames_emitted + 1;
            let field = &out[pos + LENGTH_OFFSET..pos + LENGTH_OFFSET + LENGTH_FIELD_LEN];
            let jpeg_len = match parse_length_field(field) {
                Some(0) => {
                    return Err(ClipError::CorruptFrame {
                        frame,
                        reason: "zero length field".to_string(),
                    })
                }
                Some(len) => len,
                None => {
                    return Err(ClipError::CorruptFrame {
                        frame,
                        reason: format!("unparsable length field {:?}", String::from_utf8_lossy(field)),
                    })
                }
            };

            let index = self
                .index
                .as_mut()
                .ok_or_else(|| ClipError::CorruptClip("frame found after index was sent".to_string()))?;
            index.append(VIDEO_CHUNK_TAG, jpeg_len)?;

            write_chunk_header(&mut out[written..], VIDEO_CHUNK_TAG, jpeg_len);
            written += CHUNK_HEADER_LEN;
            pos += FRAMING_LEN;
            self.frames_emitted = frame;
            self.payload_remaining = u64::from(jpeg_len);
        }

        Ok(Some(written))
    }

    fn check_video_complete(&self) -> ClipResult<()> {
        if self.payload_remaining > 0 {
            return Err(ClipError::CorruptClip(format!(
                "clip ends {} bytes into frame {}",
                self.payload_remaining, self.frames_emitted
            )));
        }
        if self.frames_emitted != self.layout.frame_count {
            return Err(ClipError::CorruptClip(format!(
                "clip holds {} frames, name declares {}",
                self.frames_emitted, self.layout.frame_count
            )));
        }

        let trailer = &self.carry[..self.carry_len];
        if trailer != STREAM_BOUNDARY {
            return Err(ClipError::CorruptClip(format!(
                "clip ends with {} bytes after frame {} instead of the closing boundary",
                trailer.len(),
                self.frames_emitted
            )));
        }
        log::debug!("Dropping {} trailing boundary bytes", trailer.len());

        let announced = u64::from(self.layout.movi_payload_len()?) - u64::from(self.layout.audio_len);
        if self.video_sent != announced {
            return Err(ClipError::CorruptClip(format!(
                "clip carried {} JPEG bytes, header announced {}",
                self.video_sent, announced
            )));
        }
        Ok(())
    }
}

enum SessionKind<R> {
    PassThrough,
    Avi(Box<AviSession<R>>),
}

struct Session<R> {
    name: String,
    clip: R,
    kind: SessionKind<R>,
    bytes_emitted: u64,
    expected_bytes: Option<u64>,
}

impl<R: Read> Session<R> {
    fn produce(&mut self, out: &mut [u8]) -> ClipResult<usize> {
        match &mut self.kind {
            SessionKind::PassThrough => Ok(read_full(&mut self.clip, out)?),
            SessionKind::Avi(avi) => avi.produce(&mut self.clip, out),
        }
    }

    fn stats(&self) -> UploadStats {
        let (mode, frames_declared, frames_emitted, audio_bytes) = match &self.kind {
            SessionKind::PassThrough => (UploadMode::PassThrough, 0, 0, 0),
            SessionKind::Avi(avi) => (
                UploadMode::Avi,
                avi.layout.frame_count,
                avi.frames_emitted,
                avi.audio_sent,
            ),
        };
        UploadStats {
            clip_name: self.name.clone(),
            mode,
            frames_declared,
            frames_emitted,
            audio_bytes,
            bytes_emitted: self.bytes_emitted,
            expected_bytes: self.expected_bytes,
        }
    }
}

/// Upload-time AVI muxer
///
/// Owns at most one session. Drive it with [`Muxer::start`] and then call
/// [`Muxer::produce_next_chunk`] until it returns 0.
pub struct Muxer<R> {
    max_frames: u32,
    session: Option<Session<R>>,
    last_stats: Option<UploadStats>,
}

impl<R: Read> Muxer<R> {
    pub fn new(config: &MuxConfig) -> Self {
        Self {
            max_frames: config.max_frames,
            session: None,
            last_stats: None,
        }
    }

    /// Begin uploading a classified clip
    ///
    /// The AVI header and index are prepared here, so resource and metadata
    /// errors surface before any byte is produced.
    pub fn start(&mut self, upload: ClipUpload<R>) -> ClipResult<UploadMode> {
        if self.session.is_some() {
            return Err(ClipError::SessionActive);
        }

        let ClipUpload {
            name,
            clip,
            clip_len,
            metadata,
            audio,
        } = upload;

        let (kind, expected_bytes) = match metadata {
            Some(meta) => {
                let layout = AviLayout {
                    frame_count: meta.frame_count,
                    fps: meta.fps,
                    frame_size: meta.frame_size,
                    clip_len,
                    audio_len: audio.as_ref().map_or(0, |a| a.payload_len),
                };
                let expected = layout.output_len()?;
                let avi = AviSession::new(layout, audio, self.max_frames)?;
                (SessionKind::Avi(Box::new(avi)), Some(expected))
            }
            None => (SessionKind::PassThrough, None),
        };

        let mode = match kind {
            SessionKind::Avi(_) => UploadMode::Avi,
            SessionKind::PassThrough => UploadMode::PassThrough,
        };
        log::debug!("Starting {:?} upload of {}", mode, name);

        self.session = Some(Session {
            name,
            clip,
            kind,
            bytes_emitted: 0,
            expected_bytes,
        });
        Ok(mode)
    }

    /// Fill `out` with the next part of the upload
    ///
    /// Returns 0 exactly once at the end of the stream, after which the
    /// muxer is idle again. Any error also ends the session.
    pub fn produce_next_chunk(&mut self, out: &mut [u8]) -> ClipResult<usize> {
        let Some(session) = self.session.as_mut() else {
            return Ok(0);
        };

        if out.len() < MIN_CHUNK_BUFFER {
            self.session = None;
            return Err(ClipError::InvalidArgument(format!(
                "output buffer of {} bytes, need at least {}",
                out.len(),
                MIN_CHUNK_BUFFER
            )));
        }

        match session.produce(out) {
            Ok(0) => {
                let stats = session.stats();
                if stats.mode == UploadMode::Avi {
                    log::info!(
                        "Processed {} of {} frames of {}",
                        stats.frames_emitted,
                        stats.frames_declared,
                        stats.clip_name
                    );
                }
                if let Some(expected) = stats.expected_bytes {
                    if expected != stats.bytes_emitted {
                        log::warn!(
                            "{} emitted {} bytes, header announced {}",
                            stats.clip_name,
                            stats.bytes_emitted,
                            expected
                        );
                    }
                }
                self.last_stats = Some(stats);
                self.session = None;
                Ok(0)
            }
            Ok(len) => {
                session.bytes_emitted += len as u64;
                Ok(len)
            }
            Err(e) => {
                log::error!("Upload of {} aborted: {}", session.name, e);
                self.session = None;
                Err(e)
            }
        }
    }

    /// Drop the active session without finishing it
    pub fn abort(&mut self) {
        if let Some(session) = self.session.take() {
            log::info!("Upload of {} cancelled", session.name);
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// State of the active AVI session, `None` when idle or passing through
    pub fn state(&self) -> Option<MuxState> {
        match self.session.as_ref().map(|s| &s.kind) {
            Some(SessionKind::Avi(avi)) => Some(avi.state),
            _ => None,
        }
    }

    /// Bytes the active session will emit in total, when known
    pub fn expected_len(&self) -> Option<u64> {
        self.session.as_ref().and_then(|s| s.expected_bytes)
    }

    /// Statistics of the most recently completed session
    pub fn last_stats(&self) -> Option<&UploadStats> {
        self.last_stats.as_ref()
    }
}
