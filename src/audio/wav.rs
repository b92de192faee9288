//! WAV serialization for captured microphone audio
//!
//! Mono, unsigned 8-bit PCM. Only the size and rate fields of the template
//! change between recordings.

use std::io::{self, Write};

/// Length of the canonical RIFF/WAVE header
pub const WAV_HEADER_LEN: usize = 44;

/// RIFF size at +4 (file length minus 8)
const RIFF_SIZE_OFFSET: usize = 4;
const SAMPLE_RATE_OFFSET: usize = 24;
const BYTE_RATE_OFFSET: usize = 28;
/// `data` chunk length at +40
const DATA_SIZE_OFFSET: usize = 40;

/// Header template for 11025 Hz mono 8-bit PCM
pub const WAV_HEADER_TEMPLATE: [u8; WAV_HEADER_LEN] = [
    0x52, 0x49, 0x46, 0x46, 0x00, 0x00, 0x00, 0x00, 0x57, 0x41, 0x56, 0x45, 0x66, 0x6D, 0x74, 0x20,
    0x10, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x11, 0x2B, 0x00, 0x00, 0x11, 0x2B, 0x00, 0x00,
    0x01, 0x00, 0x08, 0x00, 0x64, 0x61, 0x74, 0x61, 0x00, 0x00, 0x00, 0x00,
];

/// Fields recovered from a stored WAV header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub data_len: u32,
}

fn put_u32(header: &mut [u8], offset: usize, value: u32) {
    header[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn get_u32(header: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        header[offset],
        header[offset + 1],
        header[offset + 2],
        header[offset + 3],
    ])
}

/// Build the header for `data_len` bytes of samples at `sample_rate`
pub fn wav_header(data_len: u32, sample_rate: u32) -> [u8; WAV_HEADER_LEN] {
    let mut header = WAV_HEADER_TEMPLATE;
    let total = data_len.saturating_add(WAV_HEADER_LEN as u32);
    put_u32(&mut header, RIFF_SIZE_OFFSET, total - 8);
    put_u32(&mut header, SAMPLE_RATE_OFFSET, sample_rate);
    // one byte per sample, one channel
    put_u32(&mut header, BYTE_RATE_OFFSET, sample_rate);
    put_u32(&mut header, DATA_SIZE_OFFSET, data_len);
    header
}

/// Parse a header produced by [`wav_header`]
pub fn read_wav_header(bytes: &[u8]) -> Option<WavInfo> {
    if bytes.len() < WAV_HEADER_LEN || &bytes[..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return None;
    }
    Some(WavInfo {
        sample_rate: get_u32(bytes, SAMPLE_RATE_OFFSET),
        data_len: get_u32(bytes, DATA_SIZE_OFFSET),
    })
}

/// Write a WAV file in bursts of at most `burst` bytes
///
/// The sample count is truncated to an even number. Returns the total bytes
/// written including the header.
pub fn write_wav<W: Write>(
    out: &mut W,
    samples: &[u8],
    sample_rate: u32,
    burst: usize,
) -> io::Result<usize> {
    let data = &samples[..samples.len() & !1];
    let data_len = u32::try_from(data.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "audio exceeds 4 GiB"))?;

    out.write_all(&wav_header(data_len, sample_rate))?;
    for part in data.chunks(burst.max(1)) {
        out.write_all(part)?;
    }
    out.flush()?;
    Ok(WAV_HEADER_LEN + data.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts the write calls it receives
    #[derive(Default)]
    struct BurstSink {
        bytes: Vec<u8>,
        writes: usize,
    }

    impl Write for BurstSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_template_is_default_rate() {
        let header = wav_header(0, 11_025);
        assert_eq!(&header[..4], b"RIFF");
        assert_eq!(get_u32(&header, 4), 36);
        assert_eq!(&header[8..], &WAV_HEADER_TEMPLATE[8..]);
    }

    #[test]
    fn test_size_fields() {
        let header = wav_header(1000, 8000);
        assert_eq!(get_u32(&header, 4), 1036);
        assert_eq!(get_u32(&header, 40), 1000);
        assert_eq!(
            read_wav_header(&header),
            Some(WavInfo {
                sample_rate: 8000,
                data_len: 1000
            })
        );
        assert_eq!(get_u32(&header, 28), 8000);
    }

    #[test]
    fn test_odd_length_is_truncated() {
        let mut out = Vec::new();
        let written = write_wav(&mut out, &[7u8; 11], 11_025, 4).unwrap();
        assert_eq!(written, 54);
        assert_eq!(out.len(), 54);
        assert_eq!(read_wav_header(&out).unwrap().data_len, 10);
    }

    #[test]
    fn test_written_in_bursts() {
        let mut sink = BurstSink::default();
        write_wav(&mut sink, &[1u8; 100], 11_025, 30).unwrap();
        // header plus 30 + 30 + 30 + 10
        assert_eq!(sink.writes, 5);
        assert_eq!(sink.bytes.len(), 144);
    }

    #[test]
    fn test_rejects_foreign_header() {
        assert!(read_wav_header(b"RIFX").is_none());
        assert!(read_wav_header(&[0u8; 44]).is_none());
    }
}
