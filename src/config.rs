//! Configuration management for CrabClip
//!
//! Provides configuration loading, saving, and validation for AVI conversion,
//! microphone capture, and clip storage settings.

use crate::errors::ClipError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment variable overrides, e.g. `CRABCLIP__MUX__AVI_ENABLED=false`
pub const ENV_PREFIX: &str = "CRABCLIP";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrabClipConfig {
    pub mux: MuxConfig,
    pub audio: AudioConfig,
    pub storage: StorageConfig,
}

/// AVI conversion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuxConfig {
    /// Convert eligible clips to AVI on upload (false uploads raw MJPEG)
    pub avi_enabled: bool,
    /// Bytes read from storage per transform iteration
    pub cluster_size: usize,
    /// Largest frame count the index may be sized for
    pub max_frames: u32,
}

/// Microphone capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Record from the analog microphone while a clip is recorded
    pub microphone_enabled: bool,
    /// Sampling rate in Hz, 11025 is adequate for voice
    pub sample_rate: u32,
    /// Only the first `max_record_secs` of each clip are captured
    pub max_record_secs: u32,
}

/// Clip storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding recorded clips
    pub clip_directory: String,
    /// Extension (and name marker) of recorded clips
    pub clip_extension: String,
    /// Extension substituted to find the companion audio file
    pub audio_extension: String,
}

impl AudioConfig {
    /// Ring buffer length: half a second of samples, kept even so both halves match
    pub fn ring_len(&self) -> usize {
        (((self.sample_rate as usize) + 1) / 2) & !1
    }

    /// Capture region capacity in samples
    pub fn capture_capacity(&self) -> usize {
        self.sample_rate as usize * self.max_record_secs as usize
    }

    /// Interval at which the transfer task checks the ring
    pub fn transfer_period(&self) -> Duration {
        let micros = 1_000_000u64 * self.ring_len() as u64 / (3 * self.sample_rate.max(1) as u64);
        Duration::from_micros(micros.max(1))
    }
}

impl StorageConfig {
    /// Derive the companion audio name for a clip name
    pub fn audio_name_for(&self, clip_name: &str) -> String {
        clip_name.replace(&self.clip_extension, &self.audio_extension)
    }
}

impl Default for CrabClipConfig {
    fn default() -> Self {
        Self {
            mux: MuxConfig {
                avi_enabled: true,
                cluster_size: 32 * 1024,
                max_frames: 20_000,
            },
            audio: AudioConfig {
                microphone_enabled: false,
                sample_rate: 11_025,
                max_record_secs: 150,
            },
            storage: StorageConfig {
                clip_directory: "./clips".to_string(),
                clip_extension: "mjpeg".to_string(),
                audio_extension: "wav".to_string(),
            },
        }
    }
}

impl CrabClipConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClipError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ClipError::Config(format!("Failed to read config file: {}", e)))?;

        let config: CrabClipConfig = toml::from_str(&contents)
            .map_err(|e| ClipError::Config(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load defaults, then the TOML file if present, then `CRABCLIP__*` environment overrides
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self, ClipError> {
        let defaults = config::Config::try_from(&Self::default())
            .map_err(|e| ClipError::Config(format!("Failed to seed defaults: {}", e)))?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(
                config::File::from(path.as_ref())
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ClipError::Config(format!("Failed to build config: {}", e)))?;

        let config: CrabClipConfig = settings
            .try_deserialize()
            .map_err(|e| ClipError::Config(format!("Failed to deserialize config: {}", e)))?;
        config.validate().map_err(ClipError::Config)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ClipError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ClipError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ClipError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| ClipError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("crabclip.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        // Must hold the AVI header plus the audio chunk header in one buffer
        if self.mux.cluster_size < crate::avi::MIN_CHUNK_BUFFER {
            return Err(format!(
                "Cluster size must be at least {} bytes",
                crate::avi::MIN_CHUNK_BUFFER
            ));
        }
        if self.mux.max_frames == 0 {
            return Err("Max frames must be positive".to_string());
        }

        if self.audio.sample_rate < 1000 || self.audio.sample_rate > 48_000 {
            return Err("Sample rate must be between 1000 and 48000 Hz".to_string());
        }
        if self.audio.max_record_secs == 0 {
            return Err("Max record seconds must be positive".to_string());
        }

        if self.storage.clip_extension.is_empty() || self.storage.audio_extension.is_empty() {
            return Err("Clip and audio extensions must not be empty".to_string());
        }
        if self.storage.clip_extension == self.storage.audio_extension {
            return Err("Clip and audio extensions must differ".to_string());
        }

        Ok(())
    }
}
