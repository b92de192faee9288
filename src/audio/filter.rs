//! Moving-average noise filter for captured samples

/// Window size; the current sample is counted twice within it
pub const FILTER_BINS: usize = 8;

/// Smooth `samples` in place with a single pass
///
/// Each output is the sum of the last seven inputs plus the current input
/// again, divided by eight. The window starts zeroed.
pub fn noise_filter(samples: &mut [u8]) {
    let mut window = [0u8; FILTER_BINS - 1];
    let mut slot = 0;

    for sample in samples.iter_mut() {
        slot = (slot + 1) % window.len();
        window[slot] = *sample;

        let sum: u16 = u16::from(window[slot]) + window.iter().map(|&v| u16::from(v)).sum::<u16>();
        *sample = (sum / FILTER_BINS as u16) as u8;
    }
}
