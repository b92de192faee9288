//! Sampler ring buffer
//!
//! Single-producer, single-consumer. The sampler thread is the only writer;
//! the transfer thread only reads the half the write cursor has left behind.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Fixed-capacity ring of 8-bit samples with an atomic write cursor
#[derive(Debug)]
pub struct SampleRing {
    slots: Box<[AtomicU8]>,
    cursor: AtomicUsize,
}

impl SampleRing {
    /// `len` is rounded down to an even number so both halves match
    pub fn new(len: usize) -> Self {
        let len = (len & !1).max(2);
        Self {
            slots: (0..len).map(|_| AtomicU8::new(0)).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn half(&self) -> usize {
        self.slots.len() / 2
    }

    /// Slot the next sample will be written to
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Store one sample and advance the cursor, wrapping at the end
    ///
    /// Never blocks or allocates.
    #[inline]
    pub fn push(&self, sample: u8) {
        let at = self.cursor.load(Ordering::Relaxed);
        self.slots[at].store(sample, Ordering::Relaxed);
        let next = if at + 1 >= self.slots.len() { 0 } else { at + 1 };
        self.cursor.store(next, Ordering::Release);
    }

    /// Copy the bottom (`top == false`) or top half into `dest`
    pub fn copy_half(&self, top: bool, dest: &mut [u8]) {
        let half = self.half();
        let offset = if top { half } else { 0 };
        for (out, slot) in dest.iter_mut().zip(&self.slots[offset..offset + half]) {
            *out = slot.load(Ordering::Relaxed);
        }
    }

    /// Store the 8 most significant bits of a 12-bit reading
    #[inline]
    pub fn push_raw(&self, raw: u16) {
        self.push((raw >> 4) as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_is_even() {
        assert_eq!(SampleRing::new(5512).len(), 5512);
        assert_eq!(SampleRing::new(101).len(), 100);
        assert_eq!(SampleRing::new(101).half(), 50);
    }

    #[test]
    fn test_push_wraps() {
        let ring = SampleRing::new(4);
        for s in 1..=5 {
            ring.push(s);
        }
        assert_eq!(ring.cursor(), 1);

        let mut bottom = [0u8; 2];
        ring.copy_half(false, &mut bottom);
        assert_eq!(bottom, [5, 2]);
        let mut top = [0u8; 2];
        ring.copy_half(true, &mut top);
        assert_eq!(top, [3, 4]);
    }

    #[test]
    fn test_raw_reading_keeps_msbs() {
        let ring = SampleRing::new(2);
        ring.push_raw(0x0FFF);
        ring.push_raw(0x0805);
        let mut out = [0u8; 1];
        ring.copy_half(false, &mut out);
        assert_eq!(out[0], 0xFF);
        ring.copy_half(true, &mut out);
        assert_eq!(out[0], 0x80);
    }
}
