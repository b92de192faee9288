//! Half-buffer transfer from the sampler ring to the capture region

use super::ring::SampleRing;
use crate::errors::{ClipError, ClipResult};

/// Bounded store for one recording's samples
#[derive(Debug, Default)]
pub struct CaptureRegion {
    samples: Vec<u8>,
    capacity: usize,
    halves_dropped: u32,
}

impl CaptureRegion {
    /// Reserve room for `capacity` samples up front
    pub fn with_capacity(capacity: usize) -> ClipResult<Self> {
        let mut samples = Vec::new();
        samples.try_reserve_exact(capacity).map_err(|_| {
            ClipError::ResourceExhausted(format!("cannot reserve {} bytes of audio", capacity))
        })?;
        Ok(Self {
            samples,
            capacity,
            halves_dropped: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self, span: usize) -> bool {
        self.samples.len() + span > self.capacity
    }

    /// Ring halves that arrived after the region filled up
    pub fn halves_dropped(&self) -> u32 {
        self.halves_dropped
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [u8] {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<u8> {
        self.samples
    }

    fn append_half(&mut self, ring: &SampleRing, top: bool) -> bool {
        let half = ring.half();
        if self.is_full(half) {
            self.halves_dropped += 1;
            return false;
        }
        let start = self.samples.len();
        self.samples.resize(start + half, 0);
        ring.copy_half(top, &mut self.samples[start..]);
        true
    }
}

/// Outcome of one transfer poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transferred {
    Nothing,
    Bottom,
    Top,
}

/// Consumer side of the double-buffered ring
///
/// The bottom half is stable once the cursor has moved past the midpoint,
/// the top half once the cursor has wrapped back below it.
#[derive(Debug, Default)]
pub struct HalfBufferTransfer {
    bottom_done: bool,
}

impl HalfBufferTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy whichever half has become stable since the last poll
    pub fn poll(&mut self, ring: &SampleRing, region: &mut CaptureRegion) -> Transferred {
        let cursor = ring.cursor();
        let half = ring.half();

        let top = if !self.bottom_done && cursor > half {
            self.bottom_done = true;
            false
        } else if self.bottom_done && cursor < half {
            self.bottom_done = false;
            true
        } else {
            return Transferred::Nothing;
        };

        if !region.append_half(ring, top) {
            return Transferred::Nothing;
        }
        if top {
            Transferred::Top
        } else {
            Transferred::Bottom
        }
    }
}
