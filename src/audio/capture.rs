//! Microphone recording alongside a video clip
//!
//! # Spell: ClipAudioCapture
//! ^ Intent: record fixed-rate 8-bit mono audio for the length of a clip and store it as WAV
//!
//! @AudioRecorder
//!   : (AnalogSource, AudioConfig) -> companion WAV
//!   ! sampler_never_blocks_or_allocates
//!   ! transfer_copies_only_stable_halves
//!   ! bounded_capture_region
//!   ! start_and_stop_are_idempotent
//!   ! noop_when_microphone_disabled
//!   - locks_on_the_sample_path
//!   - unbounded_memory_growth

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, tick, Sender};
use serde::{Deserialize, Serialize};

use super::filter::noise_filter;
use super::ring::SampleRing;
use super::source::AnalogSource;
use super::transfer::{CaptureRegion, HalfBufferTransfer};
use super::wav::write_wav;
use crate::config::{AudioConfig, CrabClipConfig, StorageConfig};
use crate::errors::{ClipError, ClipResult};
use crate::storage::ClipStorage;
use crate::timing::SampleClock;

/// Outcome of one finished recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioCaptureSummary {
    pub sample_rate: u32,
    /// Samples moved into the capture region
    pub samples_captured: usize,
    /// Ring halves discarded once the region was full
    pub halves_dropped: u32,
    /// Companion file written, `None` for discarded recordings
    pub wav_name: Option<String>,
    pub wav_bytes: usize,
    pub elapsed_ms: u64,
}

struct ActiveCapture {
    running: Arc<AtomicBool>,
    sampler: JoinHandle<u64>,
    stop_transfer: Sender<()>,
    transfer: JoinHandle<CaptureRegion>,
    started: Instant,
}

type Joined<T> = std::thread::Result<T>;

impl ActiveCapture {
    /// Stop and join both threads
    ///
    /// The transfer thread is always stopped, even when the sampler panicked.
    fn shutdown(self) -> (Joined<u64>, Joined<CaptureRegion>) {
        self.running.store(false, Ordering::Relaxed);
        let sampler = self.sampler.join();
        let _ = self.stop_transfer.send(());
        let transfer = self.transfer.join();
        (sampler, transfer)
    }
}

/// Records the microphone while a clip is being recorded
pub struct AudioRecorder {
    audio: AudioConfig,
    storage: StorageConfig,
    source: Arc<dyn AnalogSource>,
    active: Option<ActiveCapture>,
}

fn run_sampler(
    source: Arc<dyn AnalogSource>,
    ring: Arc<SampleRing>,
    clock: SampleClock,
    running: Arc<AtomicBool>,
) -> u64 {
    let mut ticks = 0u64;
    while running.load(Ordering::Relaxed) {
        clock.wait_for(ticks + 1);
        ring.push_raw(source.read_raw());
        ticks += 1;
    }
    ticks
}

fn run_transfer(
    ring: Arc<SampleRing>,
    mut region: CaptureRegion,
    period: Duration,
    stop: crossbeam_channel::Receiver<()>,
) -> CaptureRegion {
    let mut transfer = HalfBufferTransfer::new();
    let ticker = tick(period);
    loop {
        select! {
            recv(stop) -> _ => break,
            recv(ticker) -> _ => {
                transfer.poll(&ring, &mut region);
            }
        }
    }
    region
}

impl AudioRecorder {
    pub fn new(config: &CrabClipConfig, source: Arc<dyn AnalogSource>) -> Self {
        Self {
            audio: config.audio.clone(),
            storage: config.storage.clone(),
            source,
            active: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Begin sampling the microphone
    ///
    /// Does nothing when the microphone is disabled or a recording is
    /// already running.
    pub fn start_audio_capture(&mut self) -> ClipResult<()> {
        if !self.audio.microphone_enabled || self.active.is_some() {
            return Ok(());
        }

        let ring = Arc::new(SampleRing::new(self.audio.ring_len()));
        let region = CaptureRegion::with_capacity(self.audio.capture_capacity())?;
        let running = Arc::new(AtomicBool::new(true));
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let clock = SampleClock::new(self.audio.sample_rate);
        let period = self.audio.transfer_period();

        let transfer = {
            let ring = ring.clone();
            std::thread::Builder::new()
                .name("crabclip-audio-transfer".to_string())
                .spawn(move || run_transfer(ring, region, period, stop_rx))?
        };

        let sampler = {
            let ring = ring.clone();
            let source = self.source.clone();
            let running = running.clone();
            std::thread::Builder::new()
                .name("crabclip-audio-sampler".to_string())
                .spawn(move || run_sampler(source, ring, clock, running))
        };
        let sampler = match sampler {
            Ok(handle) => handle,
            Err(e) => {
                let _ = stop_tx.send(());
                let _ = transfer.join();
                return Err(e.into());
            }
        };

        log::info!(
            "Audio capture started at {} Hz, ring of {} samples",
            self.audio.sample_rate,
            ring.len()
        );
        self.active = Some(ActiveCapture {
            running,
            sampler,
            stop_transfer: stop_tx,
            transfer,
            started: Instant::now(),
        });
        Ok(())
    }

    /// Finish the recording for `clip_name`
    ///
    /// Captured samples are filtered and, when `is_valid`, written as the
    /// clip's companion WAV through `storage`. Returns `None` when no
    /// recording was running.
    pub fn stop_audio_capture<S: ClipStorage>(
        &mut self,
        clip_name: &str,
        is_valid: bool,
        storage: &S,
    ) -> ClipResult<Option<AudioCaptureSummary>> {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };

        let started = active.started;
        let (sampler, transfer) = active.shutdown();
        let ticks = sampler.map_err(|_| ClipError::Audio("sampler thread panicked".to_string()))?;
        let mut region =
            transfer.map_err(|_| ClipError::Audio("transfer thread panicked".to_string()))?;
        log::debug!("Sampler ran {} ticks, captured {} samples", ticks, region.len());

        if region.halves_dropped() > 0 {
            log::warn!(
                "Audio capture limit of {} s reached, {} ring halves dropped",
                self.audio.max_record_secs,
                region.halves_dropped()
            );
        }

        noise_filter(region.samples_mut());

        let mut summary = AudioCaptureSummary {
            sample_rate: self.audio.sample_rate,
            samples_captured: region.len(),
            halves_dropped: region.halves_dropped(),
            wav_name: None,
            wav_bytes: 0,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        if !is_valid {
            log::debug!("Discarding audio for {}", clip_name);
            return Ok(Some(summary));
        }

        let wav_name = self.storage.audio_name_for(clip_name);
        if wav_name == clip_name {
            return Err(ClipError::InvalidArgument(format!(
                "{} has no .{} marker to derive an audio name from",
                clip_name, self.storage.clip_extension
            )));
        }

        let save_started = Instant::now();
        let mut writer = storage.create(&wav_name)?;
        let written = write_wav(
            &mut writer,
            region.samples(),
            self.audio.sample_rate,
            self.audio.ring_len(),
        )?;
        drop(writer);
        log::info!(
            "Saved {} in {} ms for {} kB",
            wav_name,
            save_started.elapsed().as_millis(),
            written / 1024
        );

        summary.wav_name = Some(wav_name);
        summary.wav_bytes = written;
        Ok(Some(summary))
    }
}

impl Drop for AudioRecorder {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            let _ = active.shutdown();
        }
    }
}
