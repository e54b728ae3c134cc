//! Horizontal strip splitting for progressive image transfer.
//!
//! ## Block header (9 bytes)
//! ```text
//! marker:         u8   (0xFF)
//! width:          u16 BE
//! height:         u16 BE
//! strip_height:   u16 BE
//! progressive:    u8
//! updatable:      u8
//! ```
//!
//! The header is followed on the wire by each strip as its own sprite
//! message, top to bottom.

use bytes::{BufMut, Bytes, BytesMut};

use crate::block::BLOCK_MARKER;
use crate::error::{FrameMsgError, Result};
use crate::sprite::Sprite;
use crate::tx::TxMessage;

/// A sprite split into strips of `strip_height` rows.
#[derive(Debug, Clone)]
pub struct ImageSpriteBlock {
    image: Sprite,
    strip_height: u16,
    progressive: bool,
    updatable: bool,
    strips: Vec<Sprite>,
}

impl ImageSpriteBlock {
    pub const HEADER_SIZE: usize = 9;

    /// Split `image` into strips, rendered progressively and updatable.
    pub fn new(image: Sprite, strip_height: u16) -> Result<Self> {
        Self::with_options(image, strip_height, true, true)
    }

    pub fn with_options(
        image: Sprite,
        strip_height: u16,
        progressive: bool,
        updatable: bool,
    ) -> Result<Self> {
        if strip_height == 0 {
            return Err(FrameMsgError::InvalidArgument("strip height must be non-zero"));
        }

        let full = image.height() / strip_height;
        let remainder = image.height() % strip_height;

        let mut strips = Vec::with_capacity(full as usize + usize::from(remainder > 0));
        for i in 0..full {
            strips.push(image.rows(i * strip_height, strip_height)?);
        }
        if remainder > 0 {
            strips.push(image.rows(image.height() - remainder, remainder)?);
        }

        Ok(Self {
            image,
            strip_height,
            progressive,
            updatable,
            strips,
        })
    }

    pub fn image(&self) -> &Sprite {
        &self.image
    }

    pub fn strip_height(&self) -> u16 {
        self.strip_height
    }

    /// Strips in top-to-bottom order.
    pub fn strips(&self) -> &[Sprite] {
        &self.strips
    }
}

impl TxMessage for ImageSpriteBlock {
    fn pack(&self) -> Result<Bytes> {
        if self.strips.is_empty() {
            return Err(FrameMsgError::EmptyPack("image sprite block"));
        }

        let mut buf = BytesMut::with_capacity(Self::HEADER_SIZE);
        buf.put_u8(BLOCK_MARKER);
        buf.put_u16(self.image.width());
        buf.put_u16(self.image.height());
        buf.put_u16(self.strip_height);
        buf.put_u8(self.progressive as u8);
        buf.put_u8(self.updatable as u8);
        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn numbered(width: u16, height: u16) -> Sprite {
        let palette = (0..16).map(|i| Rgb([i * 16, i, 0])).collect();
        let pixels = (0..width as usize * height as usize)
            .map(|i| (i / width as usize % 16) as u8)
            .collect();
        Sprite::new(width, height, palette, pixels).unwrap()
    }

    #[test]
    fn strips_cover_every_row_once() {
        let image = numbered(5, 23);
        let block = ImageSpriteBlock::new(image.clone(), 10).unwrap();

        let heights: Vec<u16> = block.strips().iter().map(Sprite::height).collect();
        assert_eq!(heights, vec![10, 10, 3]);

        let rebuilt: Vec<u8> = block
            .strips()
            .iter()
            .flat_map(|s| s.pixels().iter().copied())
            .collect();
        assert_eq!(rebuilt, image.pixels());

        for strip in block.strips() {
            assert_eq!(strip.width(), 5);
            assert_eq!(strip.palette(), image.palette());
        }
    }

    #[test]
    fn exact_multiple_has_no_remainder_strip() {
        let block = ImageSpriteBlock::new(numbered(4, 20), 5).unwrap();
        assert_eq!(block.strips().len(), 4);
    }

    #[test]
    fn header_layout() {
        let block = ImageSpriteBlock::with_options(numbered(320, 200), 20, true, false).unwrap();
        let header = block.pack().unwrap();
        assert_eq!(
            &header[..],
            &[0xFF, 0x01, 0x40, 0x00, 0xC8, 0x00, 0x14, 1, 0]
        );
    }

    #[test]
    fn empty_image_cannot_be_packed() {
        let empty = Sprite::new(4, 0, vec![Rgb([0, 0, 0]), Rgb([1, 1, 1])], vec![]).unwrap();
        let block = ImageSpriteBlock::new(empty, 8).unwrap();
        assert!(matches!(block.pack(), Err(FrameMsgError::EmptyPack(_))));
    }

    #[test]
    fn zero_strip_height_rejected() {
        assert!(ImageSpriteBlock::new(numbered(2, 2), 0).is_err());
    }
}
