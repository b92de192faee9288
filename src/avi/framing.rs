//! Multipart JPEG framing geometry
//!
//! Every stored frame is preceded by a 92 byte framing block:
//!
//! ```text
//! \r\n--123456789000000000000987654321\r\n          36 bytes boundary
//! Content-Type: image/jpeg\r\n                      26 bytes
//! Content-Length: %10u\r\n\r\n                      30 bytes, length at +78
//! ```
//!
//! and the stream ends with one more boundary.

use std::io::{self, Write};

pub const PART_BOUNDARY: &str = "123456789000000000000987654321";

/// Content type announced by the live stream
pub const STREAM_CONTENT_TYPE: &str =
    "multipart/x-mixed-replace;boundary=123456789000000000000987654321";

pub const STREAM_BOUNDARY: &[u8] = b"\r\n--123456789000000000000987654321\r\n";
pub const STREAM_BOUNDARY_LEN: usize = 36;

const CONTENT_TYPE_LINE: &[u8] = b"Content-Type: image/jpeg\r\n";
const CONTENT_LENGTH_PREFIX: &[u8] = b"Content-Length: ";

/// Width of the space padded decimal length field
pub const LENGTH_FIELD_LEN: usize = 10;
/// Offset of the length field from the start of the framing block
pub const LENGTH_OFFSET: usize = 78;
/// From the length field to the first JPEG byte
pub const REMAINDER_OFFSET: usize = 14;
/// Total framing bytes in front of each JPEG
pub const FRAMING_LEN: usize = LENGTH_OFFSET + REMAINDER_OFFSET;

/// Build the 92 byte framing block announcing a JPEG of `jpeg_len` bytes
pub fn framing_block(jpeg_len: u32) -> [u8; FRAMING_LEN] {
    let mut block = [0u8; FRAMING_LEN];
    let length = format!("{:>10}", jpeg_len);
    let parts: [&[u8]; 5] = [
        STREAM_BOUNDARY,
        CONTENT_TYPE_LINE,
        CONTENT_LENGTH_PREFIX,
        length.as_bytes(),
        b"\r\n\r\n",
    ];
    let mut at = 0;
    for part in parts {
        block[at..at + part.len()].copy_from_slice(part);
        at += part.len();
    }
    block
}

/// Write one frame as the recorder and live stream emit it
pub fn write_frame<W: Write>(out: &mut W, jpeg: &[u8]) -> io::Result<()> {
    let len = u32::try_from(jpeg.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "jpeg larger than 4 GiB"))?;
    out.write_all(&framing_block(len))?;
    out.write_all(jpeg)
}

/// Write the boundary closing a recorded stream
pub fn write_trailer<W: Write>(out: &mut W) -> io::Result<()> {
    out.write_all(STREAM_BOUNDARY)
}

/// Parse the decimal length field of a framing block
///
/// Leading spaces are skipped and digits are read up to the first non-digit.
/// Returns `None` when no digit is present or the value overflows.
pub fn parse_length_field(field: &[u8]) -> Option<u32> {
    let digits = field
        .iter()
        .skip_while(|b| **b == b' ')
        .take_while(|b| b.is_ascii_digit());

    let mut value: u32 = 0;
    let mut seen = false;
    for digit in digits {
        value = value.checked_mul(10)?.checked_add(u32::from(digit - b'0'))?;
        seen = true;
    }
    seen.then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_constants() {
        assert_eq!(STREAM_BOUNDARY.len(), STREAM_BOUNDARY_LEN);
        assert_eq!(
            STREAM_BOUNDARY_LEN + CONTENT_TYPE_LINE.len() + CONTENT_LENGTH_PREFIX.len(),
            LENGTH_OFFSET
        );
        assert_eq!(FRAMING_LEN, 92);
        assert!(STREAM_CONTENT_TYPE.ends_with(PART_BOUNDARY));
    }

    #[test]
    fn test_framing_block_layout() {
        let block = framing_block(1200);
        assert!(block.starts_with(STREAM_BOUNDARY));
        assert_eq!(&block[LENGTH_OFFSET..LENGTH_OFFSET + LENGTH_FIELD_LEN], b"      1200");
        assert!(block.ends_with(b"\r\n\r\n"));
        assert_eq!(
            parse_length_field(&block[LENGTH_OFFSET..LENGTH_OFFSET + LENGTH_FIELD_LEN]),
            Some(1200)
        );
    }

    #[test]
    fn test_parse_length_field() {
        assert_eq!(parse_length_field(b"0000012345"), Some(12345));
        assert_eq!(parse_length_field(b"       900"), Some(900));
        assert_eq!(parse_length_field(b"0000000000"), Some(0));
        assert_eq!(parse_length_field(b"   12\r\n\r\nx"), Some(12));
        assert_eq!(parse_length_field(b"ABCDEFGHIJ"), None);
        assert_eq!(parse_length_field(b"          "), None);
        assert_eq!(parse_length_field(b"9999999999"), None);
    }
}
