//! Codec configuration loaded from a TOML file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FrameMsgError, Result};
use crate::flags::StreamFlags;
use crate::rx::TapDebouncer;
use crate::sprite::DEFAULT_MAX_PIXELS;
use crate::wav::PcmFormat;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Flag bytes of the inbound streams.
    pub flags: StreamFlags,
    pub audio: AudioConfig,
    pub imu: ImuConfig,
    pub photo: PhotoConfig,
    pub tap: TapConfig,
    pub sprite: SpriteConfig,
    pub link: LinkConfig,
    pub logging: LoggingConfig,
}

/// Microphone stream settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Forward chunks as they arrive instead of whole clips.
    pub streaming: bool,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
}

/// IMU stream settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImuConfig {
    /// Sliding-window length; 1 disables smoothing.
    pub smoothing_samples: usize,
}

/// Photo stream settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    /// Rotate completed photos upright before delivery.
    pub upright: bool,
}

/// Tap gesture timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapConfig {
    /// Quiet time that ends a burst.
    pub threshold_ms: u64,
    /// Taps closer than this to the previous one are bounce.
    pub debounce_ms: u64,
}

/// Sprite quantization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteConfig {
    /// Pixel budget images are scaled down to.
    pub max_pixels: u32,
}

/// Outbound framing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Largest packet body the link accepts, not counting the leading data
    /// flag byte.
    pub max_packet_payload: usize,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for AudioConfig {
    fn default() -> Self {
        let pcm = PcmFormat::default();
        Self {
            streaming: false,
            sample_rate: pcm.sample_rate,
            bits_per_sample: pcm.bits_per_sample,
            channels: pcm.channels,
        }
    }
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self { smoothing_samples: 1 }
    }
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self { upright: true }
    }
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            threshold_ms: 300,
            debounce_ms: 40,
        }
    }
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            max_packet_payload: 240,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────

impl AudioConfig {
    pub fn format(&self) -> PcmFormat {
        PcmFormat {
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            channels: self.channels,
        }
    }
}

impl TapConfig {
    pub fn debouncer(&self) -> TapDebouncer {
        TapDebouncer::new(
            Duration::from_millis(self.threshold_ms),
            Duration::from_millis(self.debounce_ms),
        )
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl CodecConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| FrameMsgError::Config(e.to_string()))
    }
}

// ── Tests ────────────────────────────────────────────────────────
