//! Composite blocks built from sprites: image strips and rendered text.

pub mod font;
pub mod strip;
pub mod text;

/// First byte of every block header.
pub const BLOCK_MARKER: u8 = 0xFF;

pub use font::{BitmapFont, Bounds, GlyphRenderer};
pub use strip::ImageSpriteBlock;
pub use text::{PlacedLine, TextLayout, TextSpriteBlock};
