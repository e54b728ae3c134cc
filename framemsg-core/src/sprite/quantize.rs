//! Full-color image → 16-color sprite.
//!
//! 1. Convert to RGB.
//! 2. Downscale to at most `max_pixels` (Lanczos), keeping aspect ratio.
//! 3. Clamp to the 640×400 display (nearest neighbour).
//! 4. Median-cut to ≤16 colors unless the image already has that few.
//! 5. Move the darkest entry to index 0 and force it to black: index 0
//!    is the display's transparent background.

use std::collections::HashMap;

use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use tracing::debug;

use crate::error::{FrameMsgError, Result};
use crate::sprite::Sprite;

/// Default pixel budget for a quantized sprite.
pub const DEFAULT_MAX_PIXELS: u32 = 48_000;
/// Display width.
pub const MAX_WIDTH: u32 = 640;
/// Display height.
pub const MAX_HEIGHT: u32 = 400;

const PALETTE_SIZE: usize = 16;
const TRANSPARENT: Rgb<u8> = Rgb([0, 0, 0]);

impl Sprite {
    /// Decode any supported image format and quantize it.
    pub fn from_image_bytes(bytes: &[u8], max_pixels: u32) -> Result<Sprite> {
        let img = image::load_from_memory(bytes)?;
        Sprite::from_image(img, max_pixels)
    }

    /// Scale and quantize `img` into a 16-color sprite.
    pub fn from_image(img: DynamicImage, max_pixels: u32) -> Result<Sprite> {
        let rgb = fit_to_display(img.into_rgb8(), max_pixels);
        let (width, height) = rgb.dimensions();
        let (palette, pixels) = quantize(&rgb);

        debug!(width, height, "quantized image to {} colors", palette.len());

        let width = u16::try_from(width)
            .map_err(|_| FrameMsgError::InvalidArgument("image width exceeds u16"))?;
        let height = u16::try_from(height)
            .map_err(|_| FrameMsgError::InvalidArgument("image height exceeds u16"))?;
        Sprite::new(width, height, palette, pixels)
    }
}

/// Steps 2 and 3: pixel budget, then display bounds.
fn fit_to_display(mut img: RgbImage, max_pixels: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    let pixel_count = w as u64 * h as u64;

    if pixel_count > max_pixels as u64 {
        let scale = (max_pixels as f64 / pixel_count as f64).sqrt();
        let new_w = ((w as f64 * scale) as u32).max(1);
        let new_h = ((h as f64 * scale) as u32).max(1);
        img = image::imageops::resize(&img, new_w, new_h, FilterType::Lanczos3);
    }

    let (w, h) = img.dimensions();
    if w > MAX_WIDTH || h > MAX_HEIGHT {
        // Shrink to fit inside the display, preserving aspect ratio.
        let ratio = f64::min(MAX_WIDTH as f64 / w as f64, MAX_HEIGHT as f64 / h as f64);
        let new_w = ((w as f64 * ratio).round() as u32).clamp(1, MAX_WIDTH);
        let new_h = ((h as f64 * ratio).round() as u32).clamp(1, MAX_HEIGHT);
        img = image::imageops::resize(&img, new_w, new_h, FilterType::Nearest);
    }

    img
}

/// Steps 4 and 5: returns a 16-entry palette and one index per pixel.
fn quantize(img: &RgbImage) -> (Vec<Rgb<u8>>, Vec<u8>) {
    let mut palette = distinct_colors(img, PALETTE_SIZE).unwrap_or_else(|| median_cut(img, PALETTE_SIZE));

    // Lightest first, as a median-cut quantizer hands its palette back.
    palette.sort_by_key(|c| std::cmp::Reverse(luma(*c)));
    palette.resize(PALETTE_SIZE, TRANSPARENT);

    let mut lookup: HashMap<[u8; 3], u8> = HashMap::new();
    let mut pixels: Vec<u8> = img
        .pixels()
        .map(|p| *lookup.entry(p.0).or_insert_with(|| nearest(&palette, *p)))
        .collect();

    // Darkest to slot 0.
    palette.swap(0, PALETTE_SIZE - 1);
    for index in pixels.iter_mut() {
        *index = swap_index(*index);
    }
    palette[0] = TRANSPARENT;

    (palette, pixels)
}

/// Exchange indices 0 and 15, leaving every other index untouched.
fn swap_index(index: u8) -> u8 {
    const LAST: u8 = PALETTE_SIZE as u8 - 1;
    match index {
        0 => LAST,
        LAST => 0,
        other => other,
    }
}

/// The exact color set, if the image uses no more than `limit` colors.
fn distinct_colors(img: &RgbImage, limit: usize) -> Option<Vec<Rgb<u8>>> {
    let mut seen: Vec<Rgb<u8>> = Vec::with_capacity(limit);
    for p in img.pixels() {
        if !seen.contains(p) {
            if seen.len() == limit {
                return None;
            }
            seen.push(*p);
        }
    }
    Some(seen)
}

/// Integer Rec. 601 luma, scaled by 1000.
fn luma(c: Rgb<u8>) -> u32 {
    let [r, g, b] = c.0;
    r as u32 * 299 + g as u32 * 587 + b as u32 * 114
}

fn nearest(palette: &[Rgb<u8>], color: Rgb<u8>) -> u8 {
    let distance = |p: &Rgb<u8>| -> i32 {
        p.0.iter()
            .zip(color.0.iter())
            .map(|(&a, &b)| {
                let d = a as i32 - b as i32;
                d * d
            })
            .sum()
    };

    palette
        .iter()
        .enumerate()
        .min_by_key(|(_, p)| distance(p))
        .map(|(i, _)| i as u8)
        .unwrap_or(0)
}

// ── Median cut ───────────────────────────────────────────────────

struct ColorBox {
    colors: Vec<[u8; 3]>,
}

impl ColorBox {
    /// Widest channel and its extent.
    fn widest_channel(&self) -> (usize, u8) {
        (0..3)
            .map(|ch| {
                let (lo, hi) = self
                    .colors
                    .iter()
                    .fold((u8::MAX, u8::MIN), |(lo, hi), c| (lo.min(c[ch]), hi.max(c[ch])));
                (ch, hi.saturating_sub(lo))
            })
            .max_by_key(|&(_, range)| range)
            .unwrap_or((0, 0))
    }

    fn average(&self) -> Rgb<u8> {
        let n = self.colors.len().max(1) as u64;
        let mut sum = [0u64; 3];
        for c in &self.colors {
            for ch in 0..3 {
                sum[ch] += c[ch] as u64;
            }
        }
        Rgb([(sum[0] / n) as u8, (sum[1] / n) as u8, (sum[2] / n) as u8])
    }

    fn split(mut self) -> (ColorBox, ColorBox) {
        let (ch, _) = self.widest_channel();
        self.colors.sort_unstable_by_key(|c| c[ch]);
        let upper = self.colors.split_off(self.colors.len() / 2);
        (ColorBox { colors: self.colors }, ColorBox { colors: upper })
    }
}

fn median_cut(img: &RgbImage, max_colors: usize) -> Vec<Rgb<u8>> {
    let mut boxes = vec![ColorBox {
        colors: img.pixels().map(|p| p.0).collect(),
    }];

    while boxes.len() < max_colors {
        // Widest channel extent first; ties go to the box with more pixels.
        let candidate = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.colors.len() > 1 && b.widest_channel().1 > 0)
            .max_by_key(|(_, b)| (b.widest_channel().1 as u64, b.colors.len()))
            .map(|(i, _)| i);

        let Some(index) = candidate else { break };
        let (low, high) = boxes.swap_remove(index).split();
        boxes.push(low);
        boxes.push(high);
    }

    boxes.iter().map(ColorBox::average).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 255 / w.max(1)) as u8, (y * 255 / h.max(1)) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn palette_zero_is_black() {
        let sprite = Sprite::from_image(DynamicImage::ImageRgb8(gradient(64, 48)), DEFAULT_MAX_PIXELS).unwrap();
        assert_eq!(sprite.num_colors(), 16);
        assert_eq!(sprite.palette()[0], Rgb([0, 0, 0]));
    }

    #[test]
    fn darkest_color_moves_to_index_zero() {
        // Two colors: white (lightest, slot 0 before the swap) and dark red.
        let img = RgbImage::from_fn(4, 1, |x, _| {
            if x < 2 { Rgb([255, 255, 255]) } else { Rgb([90, 10, 10]) }
        });
        let sprite = Sprite::from_image(DynamicImage::ImageRgb8(img), DEFAULT_MAX_PIXELS).unwrap();

        // White was at slot 0 and is now at slot 15; dark red stays at 1.
        assert_eq!(sprite.pixels(), &[15, 15, 1, 1]);
        assert_eq!(sprite.palette()[15], Rgb([255, 255, 255]));
        assert_eq!(sprite.palette()[1], Rgb([90, 10, 10]));
        // Slot 0 held the black padding entry, forced black either way.
        assert_eq!(sprite.palette()[0], Rgb([0, 0, 0]));
    }

    #[test]
    fn full_palette_swap_keeps_other_indices() {
        let before: Vec<u8> = (0..16).collect();
        let after: Vec<u8> = before.iter().map(|&i| swap_index(i)).collect();
        assert_eq!(after[0], 15);
        assert_eq!(after[15], 0);
        assert_eq!(&after[1..15], &before[1..15]);
    }

    #[test]
    fn respects_pixel_budget() {
        let sprite = Sprite::from_image(DynamicImage::ImageRgb8(gradient(400, 300)), 12_000).unwrap();
        let pixels = sprite.width() as u32 * sprite.height() as u32;
        assert!(pixels <= 12_000, "{pixels} pixels");
        assert_eq!(sprite.width(), 126);
        assert_eq!(sprite.height(), 94);
    }

    #[test]
    fn clamps_to_display() {
        // A very wide strip fits the budget but not the display width.
        let sprite = Sprite::from_image(DynamicImage::ImageRgb8(gradient(2000, 10)), DEFAULT_MAX_PIXELS).unwrap();
        assert!(sprite.width() as u32 <= MAX_WIDTH);
        assert!(sprite.height() as u32 <= MAX_HEIGHT);
    }

    #[test]
    fn median_cut_caps_palette() {
        let palette = median_cut(&gradient(50, 50), 16);
        assert_eq!(palette.len(), 16);
    }

    #[test]
    fn decodes_png_bytes() {
        let mut png = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(gradient(20, 10))
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();
        let sprite = Sprite::from_image_bytes(png.get_ref(), DEFAULT_MAX_PIXELS).unwrap();
        assert_eq!((sprite.width(), sprite.height()), (20, 10));
    }
}
