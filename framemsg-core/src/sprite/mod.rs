//! Indexed-color sprites and their wire format.
//!
//! ## Wire format
//!
//! ```text
//! width:       u16 BE
//! height:      u16 BE
//! bpp:         u8      (1, 2 or 4)
//! num_colors:  u8      (2, 4 or 16)
//! palette:     [u8; 3 * num_colors]   (r, g, b)
//! pixels:      packed indices, MSB-first, see [`BitDepth`]
//! ```

pub mod bits;
pub mod quantize;

use bytes::{BufMut, Bytes, BytesMut};
use image::Rgb;

use crate::error::{FrameMsgError, Result};
use crate::tx::TxMessage;

pub use bits::BitDepth;
pub use quantize::{DEFAULT_MAX_PIXELS, MAX_HEIGHT, MAX_WIDTH};

/// Size of the fixed sprite header preceding the palette.
pub const SPRITE_HEADER_SIZE: usize = 6;

/// An immutable indexed-color image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    width: u16,
    height: u16,
    palette: Vec<Rgb<u8>>,
    pixels: Vec<u8>,
}

impl Sprite {
    /// Build a sprite, checking every invariant of the format.
    ///
    /// The palette length is the color count and must be 2, 4 or 16;
    /// `pixels` holds one palette index per pixel in row-major order.
    pub fn new(width: u16, height: u16, palette: Vec<Rgb<u8>>, pixels: Vec<u8>) -> Result<Self> {
        if !matches!(palette.len(), 2 | 4 | 16) {
            return Err(FrameMsgError::InvalidSprite(format!(
                "palette must have 2, 4 or 16 colors, got {}",
                palette.len()
            )));
        }

        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(FrameMsgError::InvalidSprite(format!(
                "{width}x{height} sprite needs {expected} pixels, got {}",
                pixels.len()
            )));
        }

        if let Some(&bad) = pixels.iter().find(|&&p| p as usize >= palette.len()) {
            return Err(FrameMsgError::InvalidSprite(format!(
                "pixel index {bad} out of range for {} colors",
                palette.len()
            )));
        }

        Ok(Self {
            width,
            height,
            palette,
            pixels,
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn num_colors(&self) -> usize {
        self.palette.len()
    }

    pub fn palette(&self) -> &[Rgb<u8>] {
        &self.palette
    }

    /// Palette indices, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn bit_depth(&self) -> BitDepth {
        BitDepth::for_colors(self.num_colors())
    }

    /// Rows `start..start + rows` as a new sprite sharing this palette.
    pub fn rows(&self, start: u16, rows: u16) -> Result<Sprite> {
        if start as usize + rows as usize > self.height as usize {
            return Err(FrameMsgError::InvalidArgument("row range exceeds sprite height"));
        }
        let w = self.width as usize;
        let from = start as usize * w;
        let to = from + rows as usize * w;
        Sprite::new(
            self.width,
            rows,
            self.palette.clone(),
            self.pixels[from..to].to_vec(),
        )
    }

    /// Serialize to the wire format.
    pub fn pack(&self) -> Bytes {
        let depth = self.bit_depth();
        let packed = depth.pack(&self.pixels);

        let mut buf =
            BytesMut::with_capacity(SPRITE_HEADER_SIZE + self.palette.len() * 3 + packed.len());
        buf.put_u16(self.width);
        buf.put_u16(self.height);
        buf.put_u8(depth.bits());
        buf.put_u8(self.palette.len() as u8);
        for color in &self.palette {
            buf.put_slice(&color.0);
        }
        buf.put_slice(&packed);
        buf.freeze()
    }

    /// Parse the wire format produced by [`pack`](Self::pack).
    pub fn unpack(data: &[u8]) -> Result<Self> {
        if data.len() < SPRITE_HEADER_SIZE {
            return Err(FrameMsgError::Format {
                stream: "sprite",
                expected: SPRITE_HEADER_SIZE,
                actual: data.len(),
            });
        }

        let width = u16::from_be_bytes([data[0], data[1]]);
        let height = u16::from_be_bytes([data[2], data[3]]);
        let depth = BitDepth::from_bits(data[4])?;
        let num_colors = data[5] as usize;

        if BitDepth::for_colors(num_colors) != depth {
            return Err(FrameMsgError::InvalidSprite(format!(
                "{} bpp does not match {num_colors} colors",
                depth.bits()
            )));
        }

        let palette_end = SPRITE_HEADER_SIZE + num_colors * 3;
        if data.len() < palette_end {
            return Err(FrameMsgError::Format {
                stream: "sprite",
                expected: palette_end,
                actual: data.len(),
            });
        }

        let palette = data[SPRITE_HEADER_SIZE..palette_end]
            .chunks_exact(3)
            .map(|c| Rgb([c[0], c[1], c[2]]))
            .collect();

        let count = width as usize * height as usize;
        let pixels = depth.unpack(&data[palette_end..], count)?;

        Sprite::new(width, height, palette, pixels)
    }
}

impl TxMessage for Sprite {
    fn pack(&self) -> Result<Bytes> {
        Ok(Sprite::pack(self))
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn palette(n: usize) -> Vec<Rgb<u8>> {
        (0..n).map(|i| Rgb([i as u8 * 10, 255 - i as u8, i as u8])).collect()
    }

    fn sprite(width: u16, height: u16, colors: usize) -> Sprite {
        let pixels = (0..width as usize * height as usize)
            .map(|i| ((i * 7 + i / 3) % colors) as u8)
            .collect();
        Sprite::new(width, height, palette(colors), pixels).unwrap()
    }

    #[test]
    fn header_layout() {
        let s = sprite(300, 2, 4);
        let bytes = s.pack();
        assert_eq!(&bytes[0..2], &300u16.to_be_bytes());
        assert_eq!(&bytes[2..4], &2u16.to_be_bytes());
        assert_eq!(bytes[4], 2);
        assert_eq!(bytes[5], 4);
        assert_eq!(&bytes[6..9], &[0, 255, 0]);
        assert_eq!(bytes.len(), 6 + 4 * 3 + 600 / 4);
    }

    #[test]
    fn roundtrip_all_color_counts() {
        for colors in [2, 4, 16] {
            // Odd pixel counts exercise the padded trailing byte.
            let s = sprite(7, 3, colors);
            let back = Sprite::unpack(&s.pack()).unwrap();
            assert_eq!(back, s, "{colors} colors");
        }
    }

    #[test]
    fn rejects_bad_color_count() {
        let err = Sprite::new(1, 1, palette(3), vec![0]).unwrap_err();
        assert!(matches!(err, FrameMsgError::InvalidSprite(_)));
    }

    #[test]
    fn rejects_out_of_range_index() {
        assert!(Sprite::new(2, 1, palette(2), vec![0, 2]).is_err());
    }

    #[test]
    fn rejects_pixel_count_mismatch() {
        assert!(Sprite::new(2, 2, palette(2), vec![0, 1, 1]).is_err());
    }

    #[test]
    fn unpack_rejects_truncated_palette() {
        let bytes = sprite(4, 4, 16).pack();
        let err = Sprite::unpack(&bytes[..20]).unwrap_err();
        assert!(matches!(err, FrameMsgError::Format { stream: "sprite", .. }));
    }

    #[test]
    fn unpack_rejects_depth_mismatch() {
        let mut bytes = sprite(4, 1, 16).pack().to_vec();
        bytes[4] = 1;
        assert!(Sprite::unpack(&bytes).is_err());
    }

    #[test]
    fn rows_slices_contiguously() {
        let s = sprite(3, 4, 4);
        let middle = s.rows(1, 2).unwrap();
        assert_eq!(middle.height(), 2);
        assert_eq!(middle.pixels(), &s.pixels()[3..9]);
        assert_eq!(middle.palette(), s.palette());
        assert!(s.rows(3, 2).is_err());
    }
}
