//! Microphone capture for CrabClip recordings
//!
//! A fixed-rate sampler fills a small ring, a transfer thread moves each
//! finished half into the capture region, and on stop the samples are
//! smoothed and saved as the clip's companion WAV.
//!
//! Submodules:
//! - `source`: Analog inputs (synthetic tone, optional cpal microphone)
//! - `ring`: Lock-free sampler ring buffer
//! - `transfer`: Half-buffer transfer into the bounded capture region
//! - `filter`: Moving-average noise filter
//! - `wav`: WAV header and burst writer
//! - `capture`: Recording lifecycle

mod capture;
mod filter;
mod ring;
mod source;
mod transfer;
mod wav;

pub use capture::{AudioCaptureSummary, AudioRecorder};
pub use filter::{noise_filter, FILTER_BINS};
pub use ring::SampleRing;
#[cfg(feature = "microphone")]
pub use source::CpalMicrophone;
pub use source::{AnalogSource, SyntheticTone, ADC_MAX};
pub use transfer::{CaptureRegion, HalfBufferTransfer, Transferred};
pub use wav::{read_wav_header, wav_header, write_wav, WavInfo, WAV_HEADER_LEN, WAV_HEADER_TEMPLATE};
