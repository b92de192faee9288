//! Analog microphone sources
//!
//! The sampler reads one 12-bit value per tick from an [`AnalogSource`].
//! `SyntheticTone` is always available; `CpalMicrophone` needs the
//! `microphone` feature and a system audio backend.

use std::sync::atomic::{AtomicU64, Ordering};

/// Largest value a 12-bit converter reports
pub const ADC_MAX: u16 = 0x0FFF;

/// A single analog channel read once per sample tick
///
/// `read_raw` runs on the sampler thread at the sample rate and must not
/// block or allocate.
pub trait AnalogSource: Send + Sync {
    /// Current 12-bit reading
    fn read_raw(&self) -> u16;
}

/// Deterministic triangle wave for tests and demos
#[derive(Debug)]
pub struct SyntheticTone {
    /// Samples per full cycle
    period: u64,
    tick: AtomicU64,
}

impl SyntheticTone {
    pub fn new(period: u64) -> Self {
        Self {
            period: period.max(2),
            tick: AtomicU64::new(0),
        }
    }

    /// Value at position `tick`, independent of how many reads happened
    pub fn value_at(&self, tick: u64) -> u16 {
        let phase = tick % self.period;
        let half = self.period / 2;
        let rising = if phase < half { phase } else { self.period - phase };
        ((rising * u64::from(ADC_MAX)) / half.max(1)).min(u64::from(ADC_MAX)) as u16
    }

    pub fn reads(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }
}

impl AnalogSource for SyntheticTone {
    fn read_raw(&self) -> u16 {
        let tick = self.tick.fetch_add(1, Ordering::Relaxed);
        self.value_at(tick)
    }
}

#[cfg(feature = "microphone")]
pub use self::cpal_input::CpalMicrophone;

#[cfg(feature = "microphone")]
mod cpal_input {
    use std::sync::atomic::{AtomicU16, Ordering};
    use std::sync::Arc;
    use std::thread::JoinHandle;

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use crossbeam_channel::{bounded, Sender};

    use super::{AnalogSource, ADC_MAX};
    use crate::errors::{ClipError, ClipResult};

    /// Default input device sampled as if it were an analog pin
    ///
    /// The cpal stream lives on its own thread since streams are not `Send`
    /// on every host; the latest sample is published through an atomic.
    pub struct CpalMicrophone {
        latest: Arc<AtomicU16>,
        shutdown: Option<Sender<()>>,
        worker: Option<JoinHandle<()>>,
    }

    fn to_raw(sample: f32) -> u16 {
        let unit = (sample.clamp(-1.0, 1.0) + 1.0) / 2.0;
        (unit * f32::from(ADC_MAX)).round() as u16
    }

    impl CpalMicrophone {
        /// Open the system default input device
        pub fn open() -> ClipResult<Self> {
            let latest = Arc::new(AtomicU16::new(ADC_MAX / 2));
            let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
            let (ready_tx, ready_rx) = bounded::<ClipResult<()>>(1);
            let published = latest.clone();

            let worker = std::thread::Builder::new()
                .name("crabclip-mic".to_string())
                .spawn(move || {
                    let stream = (|| -> ClipResult<cpal::Stream> {
                        let host = cpal::default_host();
                        let device = host
                            .default_input_device()
                            .ok_or_else(|| ClipError::Audio("No default audio device".to_string()))?;
                        let config = device
                            .default_input_config()
                            .map_err(|e| ClipError::Audio(format!("No supported config: {}", e)))?;
                        let channels = usize::from(config.channels().max(1));

                        let stream = device
                            .build_input_stream(
                                &config.into(),
                                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                                    if let Some(frame) = data.chunks(channels).last() {
                                        published.store(to_raw(frame[0]), Ordering::Relaxed);
                                    }
                                },
                                move |err| {
                                    log::error!("Audio capture error: {}", err);
                                },
                                None,
                            )
                            .map_err(|e| ClipError::Audio(format!("Failed to build stream: {}", e)))?;
                        stream
                            .play()
                            .map_err(|e| ClipError::Audio(format!("Failed to start stream: {}", e)))?;
                        Ok(stream)
                    })();

                    match stream {
                        Ok(stream) => {
                            let _ = ready_tx.send(Ok(()));
                            let _ = shutdown_rx.recv();
                            drop(stream);
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                        }
                    }
                })?;

            ready_rx
                .recv()
                .map_err(|_| ClipError::Audio("Microphone thread exited early".to_string()))??;

            log::info!("Microphone input opened");
            Ok(Self {
                latest,
                shutdown: Some(shutdown_tx),
                worker: Some(worker),
            })
        }
    }

    impl AnalogSource for CpalMicrophone {
        fn read_raw(&self) -> u16 {
            self.latest.load(Ordering::Relaxed)
        }
    }

    impl Drop for CpalMicrophone {
        fn drop(&mut self) {
            // Dropping the sender also wakes the worker
            self.shutdown.take();
            if let Some(worker) = self.worker.take() {
                let _ = worker.join();
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_sample_scaling() {
            assert_eq!(to_raw(-1.0), 0);
            assert_eq!(to_raw(1.0), ADC_MAX);
            assert_eq!(to_raw(0.0), 2048);
            assert_eq!(to_raw(3.0), ADC_MAX);
        }

        #[test]
        fn test_open_default_device() {
            // Only meaningful where an input device exists
            if let Ok(mic) = CpalMicrophone::open() {
                assert!(mic.read_raw() <= ADC_MAX);
            }
        }
    }
}
