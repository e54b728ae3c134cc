//! Camera settings messages.
//!
//! All layouts are big-endian and fixed-width.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tx::TxMessage;

/// Largest value the 14-bit shutter field can carry.
pub const SHUTTER_MASK: u16 = 0x3FFF;
const COLOR_GAIN_MASK: u16 = 0x03FF;

/// Scale a 0.0–1.0 fraction to a byte, rounding to nearest.
fn unit_byte(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

// ── JpegQuality ──────────────────────────────────────────────────

/// JPEG quality levels supported by the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum JpegQuality {
    VeryLow = 0,
    Low = 1,
    Medium = 2,
    High = 3,
    #[default]
    VeryHigh = 4,
}

impl JpegQuality {
    pub const fn index(self) -> u8 {
        self as u8
    }
}

// ── Auto exposure ────────────────────────────────────────────────

/// Region the auto-exposure loop meters against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Metering {
    Spot = 0,
    CenterWeighted = 1,
    #[default]
    Average = 2,
}

/// Auto exposure and gain settings, packed into 7 bytes:
///
/// ```text
/// metering:            u8
/// exposure:            u8   round(x * 255)
/// exposure_speed:      u8   round(x * 255)
/// shutter_limit:       u16  (14 bits)
/// analog_gain_limit:   u8
/// white_balance_speed: u8   round(x * 255)
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TxAutoExpSettings {
    pub metering: Metering,
    /// Target exposure, 0.0–1.0.
    pub exposure: f32,
    /// Adjustment speed, 0.0–1.0.
    pub exposure_speed: f32,
    /// Shutter ceiling, 4–16383.
    pub shutter_limit: u16,
    /// Analog gain ceiling, 1–248.
    pub analog_gain_limit: u8,
    /// White balance adjustment speed, 0.0–1.0.
    pub white_balance_speed: f32,
}

impl TxAutoExpSettings {
    pub const SIZE: usize = 7;
}

impl Default for TxAutoExpSettings {
    fn default() -> Self {
        Self {
            metering: Metering::Average,
            exposure: 0.18,
            exposure_speed: 0.5,
            shutter_limit: 16383,
            analog_gain_limit: 1,
            white_balance_speed: 0.5,
        }
    }
}

impl TxMessage for TxAutoExpSettings {
    fn pack(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_u8(self.metering as u8);
        buf.put_u8(unit_byte(self.exposure));
        buf.put_u8(unit_byte(self.exposure_speed));
        buf.put_u16(self.shutter_limit & SHUTTER_MASK);
        buf.put_u8(self.analog_gain_limit);
        buf.put_u8(unit_byte(self.white_balance_speed));
        Ok(buf.freeze())
    }
}

// ── Manual exposure ──────────────────────────────────────────────

/// Manual exposure and color gains, packed into 9 bytes:
///
/// ```text
/// shutter low byte:   u8
/// shutter high bits:  u8   (6 bits)
/// analog_gain:        u8
/// red_gain:           u16  (10 bits)
/// green_gain:         u16  (10 bits)
/// blue_gain:          u16  (10 bits)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxManualExpSettings {
    /// 4–16383.
    pub shutter: u16,
    /// 1–248.
    pub analog_gain: u8,
    /// 0–1023.
    pub red_gain: u16,
    pub green_gain: u16,
    pub blue_gain: u16,
}

impl TxManualExpSettings {
    pub const SIZE: usize = 9;
}

impl Default for TxManualExpSettings {
    fn default() -> Self {
        Self {
            shutter: 3072,
            analog_gain: 16,
            red_gain: 121,
            green_gain: 64,
            blue_gain: 140,
        }
    }
}

impl TxMessage for TxManualExpSettings {
    fn pack(&self) -> Result<Bytes> {
        let shutter = self.shutter & SHUTTER_MASK;
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_u8((shutter & 0xFF) as u8);
        buf.put_u8((shutter >> 8) as u8);
        buf.put_u8(self.analog_gain);
        buf.put_u16(self.red_gain & COLOR_GAIN_MASK);
        buf.put_u16(self.green_gain & COLOR_GAIN_MASK);
        buf.put_u16(self.blue_gain & COLOR_GAIN_MASK);
        Ok(buf.freeze())
    }
}

// ── Capture ──────────────────────────────────────────────────────

/// Photo capture request, packed into 6 bytes:
///
/// ```text
/// quality_index:   u8
/// resolution / 2:  u16
/// pan + 140:       u16
/// raw:             u8   (0 or 1)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxCaptureSettings {
    /// Square capture size, 256–720, even.
    pub resolution: u16,
    pub quality: JpegQuality,
    /// Horizontal pan, −140–140.
    pub pan: i16,
    /// Request the JPEG body only; the header is reused from a prior
    /// full capture at the same quality and resolution.
    pub raw: bool,
}

impl TxCaptureSettings {
    pub const SIZE: usize = 6;
    pub const PAN_OFFSET: i16 = 140;
}

impl Default for TxCaptureSettings {
    fn default() -> Self {
        Self {
            resolution: 512,
            quality: JpegQuality::VeryHigh,
            pan: 0,
            raw: false,
        }
    }
}

impl TxMessage for TxCaptureSettings {
    fn pack(&self) -> Result<Bytes> {
        let pan = self
            .pan
            .clamp(-Self::PAN_OFFSET, Self::PAN_OFFSET)
            + Self::PAN_OFFSET;
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_u8(self.quality.index());
        buf.put_u16(self.resolution / 2);
        buf.put_u16(pan as u16);
        buf.put_u8(self.raw as u8);
        Ok(buf.freeze())
    }
}
