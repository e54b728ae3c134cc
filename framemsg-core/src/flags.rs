//! Flag-byte assignments for the shared notification channel.
//!
//! Every inbound notification starts with one byte naming the stream it
//! belongs to and, for chunked streams, whether it is the last fragment.

use serde::{Deserialize, Serialize};

/// Prefix byte of every outbound data packet.
pub const DATA_FLAG: u8 = 0x01;

/// Flag bytes used to route inbound notifications to stream handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamFlags {
    pub audio_non_final: u8,
    pub audio_final: u8,
    pub imu: u8,
    pub photo_non_final: u8,
    pub photo_final: u8,
    pub tap: u8,
}

impl Default for StreamFlags {
    fn default() -> Self {
        Self {
            audio_non_final: 0x05,
            audio_final: 0x06,
            imu: 0x0A,
            photo_non_final: 0x07,
            photo_final: 0x08,
            tap: 0x09,
        }
    }
}

/// A pair of flags framing one chunked stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkFlags {
    pub non_final: u8,
    pub final_chunk: u8,
}

impl ChunkFlags {
    pub const fn new(non_final: u8, final_chunk: u8) -> Self {
        Self {
            non_final,
            final_chunk,
        }
    }

    /// Whether `flag` belongs to this stream at all.
    pub fn owns(&self, flag: u8) -> bool {
        flag == self.non_final || flag == self.final_chunk
    }
}

impl StreamFlags {
    pub fn audio(&self) -> ChunkFlags {
        ChunkFlags::new(self.audio_non_final, self.audio_final)
    }

    pub fn photo(&self) -> ChunkFlags {
        ChunkFlags::new(self.photo_non_final, self.photo_final)
    }
}
