//! Variable bit-depth packing of palette indices.
//!
//! Indices are packed MSB-first: the first pixel of each byte lands in
//! the highest bits. A trailing partial byte is zero-padded in its low
//! bits.

use crate::error::{FrameMsgError, Result};

/// Bits used per palette index on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BitDepth {
    One = 1,
    Two = 2,
    Four = 4,
}

impl BitDepth {
    /// Smallest depth able to address `num_colors` palette entries.
    pub fn for_colors(num_colors: usize) -> Self {
        match num_colors {
            0..=2 => BitDepth::One,
            3..=4 => BitDepth::Two,
            _ => BitDepth::Four,
        }
    }

    pub fn from_bits(bits: u8) -> Result<Self> {
        match bits {
            1 => Ok(BitDepth::One),
            2 => Ok(BitDepth::Two),
            4 => Ok(BitDepth::Four),
            other => Err(FrameMsgError::InvalidSprite(format!(
                "unsupported bit depth {other}"
            ))),
        }
    }

    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Indices stored in one byte.
    pub const fn per_byte(self) -> usize {
        8 / self as usize
    }

    const fn mask(self) -> u8 {
        (1u8 << self as u8) - 1
    }

    /// Bytes needed to hold `count` indices.
    pub const fn packed_len(self, count: usize) -> usize {
        count.div_ceil(self.per_byte())
    }

    /// Pack `indices` at this depth. Bits above the depth are discarded.
    pub fn pack(self, indices: &[u8]) -> Vec<u8> {
        let per_byte = self.per_byte();
        let bits = self.bits() as usize;
        let mut packed = vec![0u8; self.packed_len(indices.len())];

        for (i, &index) in indices.iter().enumerate() {
            let shift = (per_byte - 1 - i % per_byte) * bits;
            packed[i / per_byte] |= (index & self.mask()) << shift;
        }

        packed
    }

    /// Unpack exactly `count` indices; padding bits past `count` are ignored.
    pub fn unpack(self, packed: &[u8], count: usize) -> Result<Vec<u8>> {
        let needed = self.packed_len(count);
        if packed.len() < needed {
            return Err(FrameMsgError::InvalidSprite(format!(
                "pixel data truncated: need {needed} bytes, got {}",
                packed.len()
            )));
        }

        let per_byte = self.per_byte();
        let bits = self.bits() as usize;
        Ok((0..count)
            .map(|i| {
                let shift = (per_byte - 1 - i % per_byte) * bits;
                (packed[i / per_byte] >> shift) & self.mask()
            })
            .collect())
    }
}
