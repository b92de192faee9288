//! Clip name metadata
//!
//! Recorded clips carry their recording parameters in the file name:
//!
//! ```text
//! 20240315_142501_8_25_12_300.mjpeg
//! ^date    ^time  ^ ^  ^  ^frame count
//!                 | |  duration (seconds, informational)
//!                 | fps
//!                 frame size class
//! ```
//!
//! Names that do not follow this grammar (older recordings, manual copies)
//! are foreign and get uploaded verbatim.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use super::frame_size::FrameSize;

/// Number of trailing numeric fields in a clip name
const META_FIELDS: usize = 4;

/// Recording parameters decoded from a clip name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipMetadata {
    pub frame_size: FrameSize,
    pub fps: u32,
    /// Recording duration in seconds, not used by the muxer
    pub duration_secs: u32,
    pub frame_count: u32,
}

/// Split a clip name into its four trailing numeric fields
///
/// Returns `(frame_size_class, fps, duration_secs, frame_count)` in name order.
pub fn parse_name_fields(name: &str) -> Option<[u32; META_FIELDS]> {
    let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let stem = match file_name.rfind('.') {
        Some(dot) => &file_name[..dot],
        None => file_name,
    };

    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < META_FIELDS {
        return None;
    }

    let mut fields = [0u32; META_FIELDS];
    for (slot, part) in fields.iter_mut().zip(&parts[parts.len() - META_FIELDS..]) {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }
    Some(fields)
}

/// Decode clip metadata, `None` when the clip is not eligible for AVI conversion
pub fn parse_clip_name(name: &str) -> Option<ClipMetadata> {
    let [class, fps, duration_secs, frame_count] = parse_name_fields(name)?;

    if frame_count == 0 || fps == 0 {
        return None;
    }
    let frame_size = FrameSize::from_class(class)?;

    Some(ClipMetadata {
        frame_size,
        fps,
        duration_secs,
        frame_count,
    })
}

/// Build the file name a recorder gives a finished clip
pub fn clip_file_name<Tz: TimeZone>(
    started_at: &DateTime<Tz>,
    metadata: &ClipMetadata,
    extension: &str,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}_{}_{}_{}_{}.{}",
        started_at.format("%Y%m%d_%H%M%S"),
        metadata.frame_size.class(),
        metadata.fps,
        metadata.duration_secs,
        metadata.frame_count,
        extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_parse_full_path() {
        let meta = parse_clip_name("/20240315/20240315_142501_8_25_12_300.mjpeg").unwrap();
        assert_eq!(meta.frame_size, FrameSize::Vga);
        assert_eq!(meta.fps, 25);
        assert_eq!(meta.duration_secs, 12);
        assert_eq!(meta.frame_count, 300);
    }

    #[test]
    fn test_zero_frame_count_is_foreign() {
        assert!(parse_name_fields("20240315_142501_8_25_12_0.mjpeg").is_some());
        assert!(parse_clip_name("20240315_142501_8_25_12_0.mjpeg").is_none());
    }

    #[test]
    fn test_missing_fields_is_foreign() {
        assert!(parse_clip_name("holiday.mjpeg").is_none());
        assert!(parse_clip_name("20240315_142501.mjpeg").is_none());
        assert!(parse_clip_name("20240315_142501_8_x_12_300.mjpeg").is_none());
        assert!(parse_clip_name("20240315_142501_8_-25_12_300.mjpeg").is_none());
    }

    #[test]
    fn test_unknown_frame_size_is_foreign() {
        assert!(parse_clip_name("20240315_142501_99_25_12_300.mjpeg").is_none());
    }

    #[test]
    fn test_file_name_round_trip() {
        let started = Utc.with_ymd_and_hms(2024, 3, 15, 14, 25, 1).unwrap();
        let meta = ClipMetadata {
            frame_size: FrameSize::Svga,
            fps: 10,
            duration_secs: 30,
            frame_count: 300,
        };
        let name = clip_file_name(&started, &meta, "mjpeg");
        assert_eq!(name, "20240315_142501_9_10_30_300.mjpeg");
        assert_eq!(parse_clip_name(&name), Some(meta));
    }
}
