//! Microphone capture feeding the AVI audio track
//!
//! Run with: cargo test --test audio_pipeline_test

use std::sync::Arc;
use std::time::Duration;

use crabclip::audio::{read_wav_header, CaptureRegion, HalfBufferTransfer, SampleRing};
use crabclip::avi::IndexEntry;
use crabclip::clip::FrameSize;
use crabclip::storage::MemoryStorage;
use crabclip::testing::ClipFixture;
use crabclip::{upload_clip, AudioRecorder, CrabClipConfig, SyntheticTone, UploadMode};

fn low_rate_config() -> CrabClipConfig {
    let mut config = CrabClipConfig::default();
    config.audio.microphone_enabled = true;
    config.audio.sample_rate = 1000;
    config.audio.max_record_secs = 30;
    config
}

#[test]
fn test_recorded_audio_becomes_avi_track() {
    let config = low_rate_config();
    let fixture = ClipFixture::new(FrameSize::Qvga, 10, &[800, 900, 850]);
    let storage = MemoryStorage::new();
    storage.insert(fixture.name.clone(), fixture.bytes.clone());

    let mut recorder = AudioRecorder::new(&config, Arc::new(SyntheticTone::new(20)));
    recorder.start_audio_capture().unwrap();
    std::thread::sleep(Duration::from_millis(1200));
    let summary = recorder
        .stop_audio_capture(&fixture.name, true, &storage)
        .unwrap()
        .unwrap();

    let wav_name = summary.wav_name.clone().unwrap();
    let wav = storage.get(&wav_name).unwrap();
    let info = read_wav_header(&wav).unwrap();
    assert_eq!(info.sample_rate, 1000);
    // ring of 500 samples, only whole halves are captured
    assert!(info.data_len >= 250);
    assert_eq!(info.data_len % 250, 0);

    let mut avi = Vec::new();
    let stats = upload_clip(&storage, &fixture.name, &config, &mut avi).unwrap();
    assert_eq!(stats.mode, UploadMode::Avi);
    assert_eq!(stats.audio_bytes, u64::from(info.data_len));

    let entries = IndexEntry::parse_block(&avi[avi.len() - (8 + 16 * 4)..]).unwrap();
    assert_eq!(&entries[0].tag, b"01wb");
    assert_eq!(entries[0].size, info.data_len);
    assert_eq!(&avi[318..318 + info.data_len as usize], &wav[44..]);
}

#[test]
fn test_discarded_clip_leaves_no_audio() {
    let config = low_rate_config();
    let storage = MemoryStorage::new();
    let mut recorder = AudioRecorder::new(&config, Arc::new(SyntheticTone::new(20)));

    recorder.start_audio_capture().unwrap();
    std::thread::sleep(Duration::from_millis(100));
    let summary = recorder
        .stop_audio_capture("20240315_142501_5_10_0_3.mjpeg", false, &storage)
        .unwrap()
        .unwrap();
    assert!(summary.wav_name.is_none());
    assert!(!storage.contains("20240315_142501_5_10_0_3.wav"));
}

#[test]
fn test_concurrent_sampler_and_transfer() {
    let ring = Arc::new(SampleRing::new(64));
    let producer = {
        let ring = ring.clone();
        std::thread::spawn(move || {
            for i in 0..6400u32 {
                ring.push((i % 64) as u8);
                if i % 8 == 0 {
                    std::thread::sleep(Duration::from_micros(50));
                }
            }
        })
    };

    let mut region = CaptureRegion::with_capacity(6400).unwrap();
    let mut transfer = HalfBufferTransfer::new();
    while !producer.is_finished() {
        transfer.poll(&ring, &mut region);
        std::thread::sleep(Duration::from_micros(100));
    }
    producer.join().unwrap();

    // slot k always holds k, so every copied half is one ascending run
    assert!(!region.is_empty());
    for half in region.samples().chunks(32) {
        let start = half[0];
        assert!(start == 0 || start == 32, "half starts at {}", start);
        for (k, &s) in half.iter().enumerate() {
            assert_eq!(s, start + k as u8);
        }
    }
}
