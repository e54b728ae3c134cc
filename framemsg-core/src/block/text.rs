//! Text rendered host-side into one 2-color sprite per line.
//!
//! ## Block header
//! ```text
//! marker:            u8   (0xFF)
//! width:             u16 BE
//! max_display_rows:  u8
//! line_count:        u8
//! per line:          x: u16 BE (always 0), y: u16 BE
//! ```
//!
//! `y` is the running sum of the heights of the sprites before it. The
//! header is followed on the wire by each line sprite in order.

use bytes::{BufMut, Bytes, BytesMut};
use image::{GrayImage, Rgb};
use tracing::debug;

use crate::block::BLOCK_MARKER;
use crate::block::font::{BitmapFont, Bounds, GlyphRenderer};
use crate::error::{FrameMsgError, Result};
use crate::sprite::Sprite;
use crate::tx::TxMessage;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const INK_THRESHOLD: u8 = 127;

/// Layout parameters for a text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLayout {
    /// Canvas width in pixels.
    pub width: u16,
    /// Line pitch in pixels.
    pub font_size: u16,
    /// Canvas height in lines.
    pub max_display_rows: u8,
}

/// One rendered line and where the device should place it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedLine {
    pub sprite: Sprite,
    pub y: u16,
}

/// Multi-line text split into per-line sprites.
#[derive(Debug, Clone)]
pub struct TextSpriteBlock {
    text: String,
    layout: TextLayout,
    lines: Vec<PlacedLine>,
}

impl TextSpriteBlock {
    /// Render with the built-in bitmap font.
    pub fn new(text: impl Into<String>, layout: TextLayout) -> Result<Self> {
        Self::with_renderer(text, layout, &BitmapFont)
    }

    pub fn with_renderer(
        text: impl Into<String>,
        layout: TextLayout,
        renderer: &dyn GlyphRenderer,
    ) -> Result<Self> {
        let text = text.into();
        let canvas_height = layout.font_size as u32 * layout.max_display_rows as u32;
        let mut canvas = GrayImage::new(layout.width as u32, canvas_height);

        // Draw every line first; blank lines still advance the pitch.
        let mut inked: Vec<Bounds> = Vec::new();
        let mut y = 0i32;
        for line in text.split('\n') {
            let bounds = renderer.line_bounds(line, 0, y, layout.font_size as u32);
            if bounds.height() > 0 {
                renderer.draw_line(&mut canvas, line, 0, y, layout.font_size as u32);
                inked.push(bounds);
            }
            y += layout.font_size as i32;
        }

        let mut lines = Vec::with_capacity(inked.len());
        let mut offset: u32 = 0;
        for bounds in &inked {
            let sprite = binarize(&canvas, bounds)?;
            let y = u16::try_from(offset)
                .map_err(|_| FrameMsgError::InvalidArgument("text block taller than u16"))?;
            offset += sprite.height() as u32;
            lines.push(PlacedLine { sprite, y });
        }

        debug!(lines = lines.len(), "rendered text block");
        Ok(Self {
            text,
            layout,
            lines,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn layout(&self) -> TextLayout {
        self.layout
    }

    /// Rendered lines in source order, blank lines omitted.
    pub fn lines(&self) -> &[PlacedLine] {
        &self.lines
    }

    pub fn sprites(&self) -> impl Iterator<Item = &Sprite> {
        self.lines.iter().map(|l| &l.sprite)
    }
}

/// Crop `bounds` out of `canvas` into a black/white sprite. Pixels outside
/// the canvas read as black.
fn binarize(canvas: &GrayImage, bounds: &Bounds) -> Result<Sprite> {
    let width = u16::try_from(bounds.width())
        .map_err(|_| FrameMsgError::InvalidArgument("text line wider than u16"))?;
    let height = u16::try_from(bounds.height())
        .map_err(|_| FrameMsgError::InvalidArgument("text line taller than u16"))?;

    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for y in bounds.top..bounds.bottom {
        for x in bounds.left..bounds.right {
            let luma = if x >= 0 && y >= 0 {
                canvas.get_pixel_checked(x as u32, y as u32).map_or(0, |p| p.0[0])
            } else {
                0
            };
            pixels.push(u8::from(luma > INK_THRESHOLD));
        }
    }

    Sprite::new(width, height, vec![BLACK, WHITE], pixels)
}

impl TxMessage for TextSpriteBlock {
    fn pack(&self) -> Result<Bytes> {
        if self.lines.is_empty() {
            return Err(FrameMsgError::EmptyPack("text sprite block"));
        }

        let line_count = u8::try_from(self.lines.len())
            .map_err(|_| FrameMsgError::InvalidArgument("text block has more than 255 lines"))?;

        let mut buf = BytesMut::with_capacity(5 + self.lines.len() * 4);
        buf.put_u8(BLOCK_MARKER);
        buf.put_u16(self.layout.width);
        buf.put_u8(self.layout.max_display_rows);
        buf.put_u8(line_count);
        for line in &self.lines {
            buf.put_u16(0);
            buf.put_u16(line.y);
        }
        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: TextLayout = TextLayout {
        width: 200,
        font_size: 16,
        max_display_rows: 4,
    };

    /// Inks a solid `len × 3` bar per character, 2 rows below the origin.
    struct BarRenderer;

    impl GlyphRenderer for BarRenderer {
        fn line_bounds(&self, line: &str, x: i32, y: i32, _size: u32) -> Bounds {
            let len = line.trim_end().chars().count() as i32;
            if len == 0 {
                return Bounds { left: x, top: y, right: x, bottom: y };
            }
            Bounds { left: x, top: y + 2, right: x + len, bottom: y + 5 }
        }

        fn draw_line(&self, canvas: &mut GrayImage, line: &str, x: i32, y: i32, size: u32) {
            let b = self.line_bounds(line, x, y, size);
            for py in b.top..b.bottom {
                for px in b.left..b.right {
                    if let Some(p) = canvas.get_pixel_mut_checked(px as u32, py as u32) {
                        *p = image::Luma([255]);
                    }
                }
            }
        }
    }

    #[test]
    fn blank_lines_are_skipped_but_advance_pitch() {
        let block = TextSpriteBlock::with_renderer("abc\n\n  \nde", LAYOUT, &BarRenderer).unwrap();
        assert_eq!(block.lines().len(), 2);

        let first = &block.lines()[0].sprite;
        assert_eq!((first.width(), first.height()), (3, 3));
        assert!(first.pixels().iter().all(|&p| p == 1));
        assert_eq!(first.palette(), &[BLACK, WHITE]);

        // Placement offsets accumulate emitted heights, not source pitch.
        assert_eq!(block.lines()[0].y, 0);
        assert_eq!(block.lines()[1].y, 3);
        assert_eq!(block.lines()[1].sprite.width(), 2);
    }

    #[test]
    fn header_layout() {
        let block = TextSpriteBlock::with_renderer("ab\ncd", LAYOUT, &BarRenderer).unwrap();
        let header = block.pack().unwrap();
        assert_eq!(
            &header[..],
            &[0xFF, 0x00, 0xC8, 4, 2, 0, 0, 0, 0, 0, 0, 0, 3]
        );
    }

    #[test]
    fn only_blank_text_cannot_be_packed() {
        let block = TextSpriteBlock::new(" \n\n", LAYOUT).unwrap();
        assert!(block.lines().is_empty());
        assert!(matches!(block.pack(), Err(FrameMsgError::EmptyPack(_))));
    }

    #[test]
    fn line_count_must_fit_the_header() {
        let text = vec!["a"; 256].join("\n");
        let block = TextSpriteBlock::with_renderer(text, LAYOUT, &BarRenderer).unwrap();
        assert_eq!(block.lines().len(), 256);
        assert!(matches!(block.pack(), Err(FrameMsgError::InvalidArgument(_))));

        let text = vec!["a"; 255].join("\n");
        let block = TextSpriteBlock::with_renderer(text, LAYOUT, &BarRenderer).unwrap();
        assert_eq!(block.pack().unwrap()[4], 255);
    }

    #[test]
    fn bitmap_font_renders_binary_sprites() {
        let block = TextSpriteBlock::new("Hello\nWorld", LAYOUT).unwrap();
        assert_eq!(block.lines().len(), 2);
        for line in block.lines() {
            let sprite = &line.sprite;
            assert_eq!(sprite.num_colors(), 2);
            assert!(sprite.pixels().contains(&1));
            assert!(sprite.pixels().iter().all(|&p| p <= 1));
        }
    }

    #[test]
    fn lines_past_the_canvas_are_black() {
        // Third line starts below a two-row canvas.
        let layout = TextLayout { max_display_rows: 2, ..LAYOUT };
        let block = TextSpriteBlock::with_renderer("a\nb\nc", layout, &BarRenderer).unwrap();
        assert_eq!(block.lines().len(), 3);
        assert!(block.lines()[2].sprite.pixels().iter().all(|&p| p == 0));
    }
}
