//! Glyph rendering seam for [`TextSpriteBlock`](crate::block::TextSpriteBlock).
//!
//! Font loading is left to the host: anything implementing
//! [`GlyphRenderer`] can be plugged in. [`BitmapFont`] is a built-in 5×7
//! ASCII face for when no font is supplied.

use image::{GrayImage, Luma};

/// Ink rectangle in canvas coordinates; `right`/`bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }
}

/// Renders one line of text at a given pixel size.
pub trait GlyphRenderer {
    /// Tight ink bounds of `line` drawn with its top-left at `(x, y)`.
    /// A line with no ink has zero height.
    fn line_bounds(&self, line: &str, x: i32, y: i32, size: u32) -> Bounds;

    /// Draw `line` in white onto `canvas`, clipping at its edges.
    fn draw_line(&self, canvas: &mut GrayImage, line: &str, x: i32, y: i32, size: u32);
}

// ── BitmapFont ───────────────────────────────────────────────────

const GLYPH_COLUMNS: usize = 5;
const CELL_WIDTH: i32 = 6;
const CELL_HEIGHT: u32 = 8;
const FIRST_CHAR: u8 = 0x20;

/// Column-major 5×7 glyphs for 0x20..=0x7E; bit 0 is the top row.
#[rustfmt::skip]
const GLYPHS: [[u8; GLYPH_COLUMNS]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], [0x00, 0x00, 0x5F, 0x00, 0x00], // ' ' !
    [0x00, 0x07, 0x00, 0x07, 0x00], [0x14, 0x7F, 0x14, 0x7F, 0x14], // " #
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], [0x23, 0x13, 0x08, 0x64, 0x62], // $ %
    [0x36, 0x49, 0x55, 0x22, 0x50], [0x00, 0x05, 0x03, 0x00, 0x00], // & '
    [0x00, 0x1C, 0x22, 0x41, 0x00], [0x00, 0x41, 0x22, 0x1C, 0x00], // ( )
    [0x08, 0x2A, 0x1C, 0x2A, 0x08], [0x08, 0x08, 0x3E, 0x08, 0x08], // * +
    [0x00, 0x50, 0x30, 0x00, 0x00], [0x08, 0x08, 0x08, 0x08, 0x08], // , -
    [0x00, 0x60, 0x60, 0x00, 0x00], [0x20, 0x10, 0x08, 0x04, 0x02], // . /
    [0x3E, 0x51, 0x49, 0x45, 0x3E], [0x00, 0x42, 0x7F, 0x40, 0x00], // 0 1
    [0x42, 0x61, 0x51, 0x49, 0x46], [0x21, 0x41, 0x45, 0x4B, 0x31], // 2 3
    [0x18, 0x14, 0x12, 0x7F, 0x10], [0x27, 0x45, 0x45, 0x45, 0x39], // 4 5
    [0x3C, 0x4A, 0x49, 0x49, 0x30], [0x01, 0x71, 0x09, 0x05, 0x03], // 6 7
    [0x36, 0x49, 0x49, 0x49, 0x36], [0x06, 0x49, 0x49, 0x29, 0x1E], // 8 9
    [0x00, 0x36, 0x36, 0x00, 0x00], [0x00, 0x56, 0x36, 0x00, 0x00], // : ;
    [0x08, 0x14, 0x22, 0x41, 0x00], [0x14, 0x14, 0x14, 0x14, 0x14], // < =
    [0x00, 0x41, 0x22, 0x14, 0x08], [0x02, 0x01, 0x51, 0x09, 0x06], // > ?
    [0x32, 0x49, 0x79, 0x41, 0x3E], [0x7E, 0x11, 0x11, 0x11, 0x7E], // @ A
    [0x7F, 0x49, 0x49, 0x49, 0x36], [0x3E, 0x41, 0x41, 0x41, 0x22], // B C
    [0x7F, 0x41, 0x41, 0x22, 0x1C], [0x7F, 0x49, 0x49, 0x49, 0x41], // D E
    [0x7F, 0x09, 0x09, 0x09, 0x01], [0x3E, 0x41, 0x49, 0x49, 0x7A], // F G
    [0x7F, 0x08, 0x08, 0x08, 0x7F], [0x00, 0x41, 0x7F, 0x41, 0x00], // H I
    [0x20, 0x40, 0x41, 0x3F, 0x01], [0x7F, 0x08, 0x14, 0x22, 0x41], // J K
    [0x7F, 0x40, 0x40, 0x40, 0x40], [0x7F, 0x02, 0x0C, 0x02, 0x7F], // L M
    [0x7F, 0x04, 0x08, 0x10, 0x7F], [0x3E, 0x41, 0x41, 0x41, 0x3E], // N O
    [0x7F, 0x09, 0x09, 0x09, 0x06], [0x3E, 0x41, 0x51, 0x21, 0x5E], // P Q
    [0x7F, 0x09, 0x19, 0x29, 0x46], [0x46, 0x49, 0x49, 0x49, 0x31], // R S
    [0x01, 0x01, 0x7F, 0x01, 0x01], [0x3F, 0x40, 0x40, 0x40, 0x3F], // T U
    [0x1F, 0x20, 0x40, 0x20, 0x1F], [0x3F, 0x40, 0x38, 0x40, 0x3F], // V W
    [0x63, 0x14, 0x08, 0x14, 0x63], [0x07, 0x08, 0x70, 0x08, 0x07], // X Y
    [0x61, 0x51, 0x49, 0x45, 0x43], [0x00, 0x7F, 0x41, 0x41, 0x00], // Z [
    [0x02, 0x04, 0x08, 0x10, 0x20], [0x00, 0x41, 0x41, 0x7F, 0x00], // \ ]
    [0x04, 0x02, 0x01, 0x02, 0x04], [0x40, 0x40, 0x40, 0x40, 0x40], // ^ _
    [0x00, 0x01, 0x02, 0x04, 0x00], [0x20, 0x54, 0x54, 0x54, 0x78], // ` a
    [0x7F, 0x48, 0x44, 0x44, 0x38], [0x38, 0x44, 0x44, 0x44, 0x20], // b c
    [0x38, 0x44, 0x44, 0x48, 0x7F], [0x38, 0x54, 0x54, 0x54, 0x18], // d e
    [0x08, 0x7E, 0x09, 0x01, 0x02], [0x0C, 0x52, 0x52, 0x52, 0x3E], // f g
    [0x7F, 0x08, 0x04, 0x04, 0x78], [0x00, 0x44, 0x7D, 0x40, 0x00], // h i
    [0x20, 0x40, 0x44, 0x3D, 0x00], [0x7F, 0x10, 0x28, 0x44, 0x00], // j k
    [0x00, 0x41, 0x7F, 0x40, 0x00], [0x7C, 0x04, 0x18, 0x04, 0x78], // l m
    [0x7C, 0x08, 0x04, 0x04, 0x78], [0x38, 0x44, 0x44, 0x44, 0x38], // n o
    [0x7C, 0x14, 0x14, 0x14, 0x08], [0x08, 0x14, 0x14, 0x18, 0x7C], // p q
    [0x7C, 0x08, 0x04, 0x04, 0x08], [0x48, 0x54, 0x54, 0x54, 0x20], // r s
    [0x04, 0x3F, 0x44, 0x40, 0x20], [0x3C, 0x40, 0x40, 0x20, 0x7C], // t u
    [0x1C, 0x20, 0x40, 0x20, 0x1C], [0x3C, 0x40, 0x30, 0x40, 0x3C], // v w
    [0x44, 0x28, 0x10, 0x28, 0x44], [0x0C, 0x50, 0x50, 0x50, 0x3C], // x y
    [0x44, 0x64, 0x54, 0x4C, 0x44], [0x00, 0x08, 0x36, 0x41, 0x00], // z {
    [0x00, 0x00, 0x7F, 0x00, 0x00], [0x00, 0x41, 0x36, 0x08, 0x00], // | }
    [0x08, 0x04, 0x08, 0x10, 0x08],                                 // ~
];

/// Built-in monospace 5×7 face in a 6×8 cell, scaled by whole pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapFont;

impl BitmapFont {
    fn glyph(c: char) -> &'static [u8; GLYPH_COLUMNS] {
        let index = u32::from(c)
            .checked_sub(FIRST_CHAR as u32)
            .filter(|&i| (i as usize) < GLYPHS.len())
            .unwrap_or(u32::from('?') - FIRST_CHAR as u32);
        &GLYPHS[index as usize]
    }

    fn scale(size: u32) -> i32 {
        (size / CELL_HEIGHT).max(1) as i32
    }

    /// Visit the top-left corner of every inked block of `line`.
    fn for_each_ink(line: &str, x: i32, y: i32, size: u32, mut f: impl FnMut(i32, i32, i32)) {
        let scale = Self::scale(size);
        for (n, c) in line.chars().enumerate() {
            let cell_x = x + n as i32 * CELL_WIDTH * scale;
            for (col, bits) in Self::glyph(c).iter().enumerate() {
                for row in 0..7 {
                    if bits & (1 << row) != 0 {
                        f(cell_x + col as i32 * scale, y + row * scale, scale);
                    }
                }
            }
        }
    }
}

impl GlyphRenderer for BitmapFont {
    fn line_bounds(&self, line: &str, x: i32, y: i32, size: u32) -> Bounds {
        let mut bounds: Option<Bounds> = None;
        Self::for_each_ink(line, x, y, size, |px, py, scale| {
            let b = bounds.get_or_insert(Bounds {
                left: px,
                top: py,
                right: px + scale,
                bottom: py + scale,
            });
            b.left = b.left.min(px);
            b.top = b.top.min(py);
            b.right = b.right.max(px + scale);
            b.bottom = b.bottom.max(py + scale);
        });
        bounds.unwrap_or(Bounds {
            left: x,
            top: y,
            right: x,
            bottom: y,
        })
    }

    fn draw_line(&self, canvas: &mut GrayImage, line: &str, x: i32, y: i32, size: u32) {
        let (w, h) = (canvas.width() as i32, canvas.height() as i32);
        Self::for_each_ink(line, x, y, size, |px, py, scale| {
            for dy in 0..scale {
                for dx in 0..scale {
                    let (cx, cy) = (px + dx, py + dy);
                    if (0..w).contains(&cx) && (0..h).contains(&cy) {
                        canvas.put_pixel(cx as u32, cy as u32, Luma([255]));
                    }
                }
            }
        });
    }
}
