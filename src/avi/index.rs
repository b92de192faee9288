//! `idx1` index builder
//!
//! One 16 byte record per chunk in the `movi` list, in emission order. The
//! backing buffer is reserved up front for the declared chunk count and
//! starts with the `idx1` header, so it can be streamed out verbatim once the
//! last frame has been seen.

use serde::{Deserialize, Serialize};

use super::{write_chunk_header, CHUNK_HEADER_LEN, INDEX_ENTRY_LEN, INDEX_TAG};
use crate::errors::{ClipError, ClipResult};

/// A decoded `idx1` record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub tag: [u8; 4],
    /// Chunk offset within the `movi` payload
    pub offset: u32,
    /// Chunk payload size, excluding its 8 byte header
    pub size: u32,
}

impl IndexEntry {
    /// Decode a 16 byte record: tag, reserved, offset, size
    pub fn from_bytes(record: &[u8]) -> Option<Self> {
        if record.len() < INDEX_ENTRY_LEN {
            return None;
        }
        let word = |at: usize| u32::from_le_bytes([record[at], record[at + 1], record[at + 2], record[at + 3]]);
        Some(Self {
            tag: [record[0], record[1], record[2], record[3]],
            offset: word(8),
            size: word(12),
        })
    }

    /// Decode every record of a complete `idx1` block, header included
    pub fn parse_block(block: &[u8]) -> Option<Vec<Self>> {
        if block.len() < CHUNK_HEADER_LEN || block[..4] != INDEX_TAG {
            return None;
        }
        let declared = u32::from_le_bytes([block[4], block[5], block[6], block[7]]) as usize;
        let records = block.get(CHUNK_HEADER_LEN..CHUNK_HEADER_LEN + declared)?;
        records
            .chunks_exact(INDEX_ENTRY_LEN)
            .map(Self::from_bytes)
            .collect()
    }
}

/// Accumulates index records for every emitted chunk
#[derive(Debug)]
pub struct IndexBuilder {
    buf: Vec<u8>,
    capacity: usize,
    entries: usize,
    next_offset: u32,
}

impl IndexBuilder {
    /// Reserve an index for exactly `capacity` chunks
    pub fn with_capacity(capacity: usize) -> ClipResult<Self> {
        let records_len = capacity
            .checked_mul(INDEX_ENTRY_LEN)
            .and_then(|len| u32::try_from(len).ok())
            .ok_or_else(|| {
                ClipError::ResourceExhausted(format!("index for {} chunks is too large", capacity))
            })?;
        let total = CHUNK_HEADER_LEN + records_len as usize;

        let mut buf = Vec::new();
        buf.try_reserve_exact(total).map_err(|e| {
            ClipError::ResourceExhausted(format!("cannot allocate {} byte index: {}", total, e))
        })?;
        buf.resize(total, 0);
        write_chunk_header(&mut buf, INDEX_TAG, records_len);

        Ok(Self {
            buf,
            capacity,
            entries: 0,
            next_offset: 0,
        })
    }

    /// Record a chunk of `size` payload bytes
    pub fn append(&mut self, tag: [u8; 4], size: u32) -> ClipResult<()> {
        if self.entries >= self.capacity {
            return Err(ClipError::ResourceExhausted(format!(
                "index capacity of {} chunks exceeded",
                self.capacity
            )));
        }
        let advanced = self
            .next_offset
            .checked_add(size)
            .and_then(|o| o.checked_add(CHUNK_HEADER_LEN as u32))
            .ok_or_else(|| ClipError::ResourceExhausted("movi payload exceeds 4 GiB".to_string()))?;

        let at = CHUNK_HEADER_LEN + self.entries * INDEX_ENTRY_LEN;
        let record = &mut self.buf[at..at + INDEX_ENTRY_LEN];
        record[..4].copy_from_slice(&tag);
        record[4..8].copy_from_slice(&[0; 4]);
        record[8..12].copy_from_slice(&self.next_offset.to_le_bytes());
        record[12..16].copy_from_slice(&size.to_le_bytes());

        self.next_offset = advanced;
        self.entries += 1;
        Ok(())
    }

    /// Number of records appended so far
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once every reserved record has been written
    pub fn is_complete(&self) -> bool {
        self.entries == self.capacity
    }

    /// Offset the next chunk will be recorded at
    pub fn next_offset(&self) -> u32 {
        self.next_offset
    }

    /// The full `idx1` block, header included
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Records written so far
    pub fn entries(&self) -> Vec<IndexEntry> {
        self.buf[CHUNK_HEADER_LEN..CHUNK_HEADER_LEN + self.entries * INDEX_ENTRY_LEN]
            .chunks_exact(INDEX_ENTRY_LEN)
            .filter_map(IndexEntry::from_bytes)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avi::{AUDIO_CHUNK_TAG, VIDEO_CHUNK_TAG};

    #[test]
    fn test_header_declares_full_size() {
        let index = IndexBuilder::with_capacity(3).unwrap();
        let bytes = index.as_bytes();
        assert_eq!(bytes.len(), 8 + 48);
        assert_eq!(&bytes[..4], b"idx1");
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 48);
    }

    #[test]
    fn test_offsets_advance_by_size_plus_header() {
        let mut index = IndexBuilder::with_capacity(3).unwrap();
        index.append(VIDEO_CHUNK_TAG, 1000).unwrap();
        index.append(VIDEO_CHUNK_TAG, 1200).unwrap();
        index.append(VIDEO_CHUNK_TAG, 900).unwrap();
        assert!(index.is_complete());

        let offsets: Vec<u32> = index.entries().iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 1008, 2208]);
        assert_eq!(index.next_offset(), 3124);

        let parsed = IndexEntry::parse_block(index.as_bytes()).unwrap();
        assert_eq!(parsed, index.entries());
    }

    #[test]
    fn test_record_layout() {
        let mut index = IndexBuilder::with_capacity(1).unwrap();
        index.append(AUDIO_CHUNK_TAG, 0x0102_0304).unwrap();
        let record = &index.as_bytes()[8..24];
        assert_eq!(&record[..4], b"01wb");
        assert_eq!(&record[4..8], &[0, 0, 0, 0]);
        assert_eq!(&record[8..12], &[0, 0, 0, 0]);
        assert_eq!(&record[12..16], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut index = IndexBuilder::with_capacity(1).unwrap();
        index.append(VIDEO_CHUNK_TAG, 10).unwrap();
        let err = index.append(VIDEO_CHUNK_TAG, 10).unwrap_err();
        assert!(matches!(err, ClipError::ResourceExhausted(_)));
        assert_eq!(index.len(), 1);
    }
}
