//! # framemsg-core
//!
//! Message codec for a BLE link between a host and a wearable display.
//!
//! This crate contains:
//! - **Receive streams**: flag-byte chunk reassembly for audio, photo, IMU
//!   and tap notifications (`rx`)
//! - **Sprites**: palette quantization and bit-packed indexed-color images
//!   (`sprite`)
//! - **Blocks**: image strip and text-line sprite blocks (`block`)
//! - **Transmit messages**: exposure/capture settings, text, codes and
//!   packet framing (`tx`)
//! - **WAV**: PCM container wrapping (`wav`)
//! - **Link**: transport trait, receive dispatcher and framed sender
//! - **Config/Logging**: TOML configuration and tracing setup
//! - **Error**: `FrameMsgError`, a `thiserror`-based error enum

pub mod block;
pub mod config;
pub mod error;
pub mod flags;
pub mod link;
pub mod logging;
pub mod rx;
pub mod sprite;
pub mod transport;
pub mod tx;
pub mod wav;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use block::{BitmapFont, GlyphRenderer, ImageSpriteBlock, TextLayout, TextSpriteBlock};
pub use config::CodecConfig;
pub use error::{FrameMsgError, Result};
pub use flags::{ChunkFlags, StreamFlags};
pub use link::{FrameLink, RxDispatcher, RxHandle};
pub use rx::{ChunkEvent, ImuData, PhotoRequest, RxEvent, RxStream};
pub use sprite::{BitDepth, Sprite};
pub use transport::{ChannelTransport, DeviceEnd, Transport};
pub use tx::{MessageFramer, TxMessage};
pub use wav::{PcmFormat, to_wav_bytes};
