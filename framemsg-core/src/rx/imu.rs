//! IMU samples: compass and accelerometer with optional smoothing.
//!
//! ```text
//! flag | reserved | compass x,y,z | accel x,y,z
//!  u8      u8        3 × i16 LE      3 × i16 LE
//! ```

use std::collections::VecDeque;

use tracing::trace;

use crate::error::{FrameMsgError, Result};

/// Shortest packet that carries all six axes.
pub const IMU_PACKET_MIN: usize = 14;
const AXES_OFFSET: usize = 2;

/// One (x, y, z) sensor reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vec3 {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl Vec3 {
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// Degrees of rotation about the x axis, treating `self` as gravity.
    pub fn pitch(&self) -> f64 {
        (self.y as f64).atan2(self.z as f64).to_degrees()
    }

    /// Degrees of rotation about the y axis, treating `self` as gravity.
    pub fn roll(&self) -> f64 {
        (self.x as f64).atan2(self.z as f64).to_degrees()
    }
}

// ── SensorWindow ─────────────────────────────────────────────────

/// Fixed-capacity sliding window of readings.
#[derive(Debug, Clone)]
pub struct SensorWindow {
    capacity: usize,
    samples: VecDeque<Vec3>,
}

impl SensorWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Push a reading, evicting the oldest once full.
    pub fn add(&mut self, sample: Vec3) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Per-axis mean of the window, truncated toward zero. Zero when empty.
    pub fn average(&self) -> Vec3 {
        let n = self.samples.len() as i64;
        if n == 0 {
            return Vec3::default();
        }
        let (sx, sy, sz) = self.samples.iter().fold((0i64, 0i64, 0i64), |acc, s| {
            (acc.0 + s.x as i64, acc.1 + s.y as i64, acc.2 + s.z as i64)
        });
        // The mean of i16 values always fits back in i16.
        Vec3::new((sx / n) as i16, (sy / n) as i16, (sz / n) as i16)
    }
}

// ── ImuData ──────────────────────────────────────────────────────

/// The readings carried by one packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImuRaw {
    pub compass: Vec3,
    pub accel: Vec3,
}

impl ImuRaw {
    pub fn parse(packet: &[u8]) -> Result<Self> {
        if packet.len() < IMU_PACKET_MIN {
            return Err(FrameMsgError::Format {
                stream: "imu",
                expected: IMU_PACKET_MIN,
                actual: packet.len(),
            });
        }
        let axes = &packet[AXES_OFFSET..IMU_PACKET_MIN];
        let v: Vec<i16> = axes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        Ok(Self {
            compass: Vec3::new(v[0], v[1], v[2]),
            accel: Vec3::new(v[3], v[4], v[5]),
        })
    }
}

/// Smoothed readings together with the packet they were derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImuData {
    pub compass: Vec3,
    pub accel: Vec3,
    pub raw: ImuRaw,
}

impl ImuData {
    /// Pitch from the smoothed accelerometer.
    pub fn pitch(&self) -> f64 {
        self.accel.pitch()
    }

    /// Roll from the smoothed accelerometer.
    pub fn roll(&self) -> f64 {
        self.accel.roll()
    }
}

// ── RxImu ────────────────────────────────────────────────────────

/// Receives IMU packets and smooths each sensor independently.
#[derive(Debug, Clone)]
pub struct RxImu {
    flag: u8,
    compass: SensorWindow,
    accel: SensorWindow,
}

impl RxImu {
    /// `smoothing_samples` of 1 passes readings through unchanged.
    pub fn new(flag: u8, smoothing_samples: usize) -> Self {
        Self {
            flag,
            compass: SensorWindow::new(smoothing_samples),
            accel: SensorWindow::new(smoothing_samples),
        }
    }

    pub fn flag(&self) -> u8 {
        self.flag
    }

    /// Returns `None` for packets belonging to other streams.
    pub fn on_packet(&mut self, packet: &[u8]) -> Result<Option<ImuData>> {
        if packet.first() != Some(&self.flag) {
            return Ok(None);
        }
        let raw = ImuRaw::parse(packet)?;
        self.compass.add(raw.compass);
        self.accel.add(raw.accel);
        trace!(?raw, "imu sample");
        Ok(Some(ImuData {
            compass: self.compass.average(),
            accel: self.accel.average(),
            raw,
        }))
    }
}
