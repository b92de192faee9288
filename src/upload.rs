//! Whole-clip upload driver
//!
//! Classifies a stored clip, runs it through the [`Muxer`] and pushes every
//! produced buffer into a sink. This is the loop a transfer transport runs;
//! the transport itself only needs to be a [`Write`].

use std::io::Write;

use crate::avi::{Muxer, UploadStats};
use crate::clip::classify;
use crate::config::CrabClipConfig;
use crate::errors::{ClipError, ClipResult};
use crate::storage::ClipStorage;

/// Upload `name` from `storage` into `sink`, converting to AVI when eligible
///
/// The sink is flushed before returning. On error the sink may already hold
/// a partial stream; the caller decides whether to discard it.
pub fn upload_clip<S, W>(
    storage: &S,
    name: &str,
    config: &CrabClipConfig,
    sink: &mut W,
) -> ClipResult<UploadStats>
where
    S: ClipStorage,
    W: Write,
{
    let upload = classify(storage, name, config)?;
    let mut muxer = Muxer::new(&config.mux);
    muxer.start(upload)?;

    let mut buf = vec![0u8; config.mux.cluster_size];
    loop {
        let len = muxer.produce_next_chunk(&mut buf)?;
        if len == 0 {
            break;
        }
        sink.write_all(&buf[..len])?;
    }
    sink.flush()?;

    muxer
        .last_stats()
        .cloned()
        .ok_or_else(|| ClipError::CorruptClip(format!("upload of {} ended without a summary", name)))
}
