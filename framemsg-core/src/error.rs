//! Domain-specific error types for the frame message codec.
//!
//! All fallible operations return `Result<T, FrameMsgError>`.
//! Malformed packets never panic; every error is typed and recoverable.

use thiserror::Error;

use crate::tx::settings::JpegQuality;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FrameMsgError>;

/// The canonical error type for the codec.
#[derive(Debug, Error)]
pub enum FrameMsgError {
    // ── Receive Errors ───────────────────────────────────────────
    /// A raw photo was requested before any full photo with the same
    /// quality and resolution completed, so there is no header to reuse.
    #[error("no cached JPEG header for quality {quality:?} at resolution {resolution}")]
    MissingHeader {
        quality: JpegQuality,
        resolution: u16,
    },

    /// A packet was shorter than its stream requires.
    #[error("{stream} packet too short: expected at least {expected} bytes, got {actual}")]
    Format {
        stream: &'static str,
        expected: usize,
        actual: usize,
    },

    // ── Transmit Errors ──────────────────────────────────────────
    /// A block had no child sprites to send.
    #[error("nothing to pack: {0} has no sprites")]
    EmptyPack(&'static str),

    /// A sprite violated one of its construction invariants or its wire
    /// form could not be decoded.
    #[error("invalid sprite: {0}")]
    InvalidSprite(String),

    /// A caller-supplied parameter is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The message exceeds what the 16-bit length prefix can describe.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    // ── Collaborator Errors ──────────────────────────────────────
    /// Image decoding, resampling or encoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// The configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// The I/O layer reported an error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for FrameMsgError {
    fn from(s: String) -> Self {
        FrameMsgError::Other(s)
    }
}

impl From<&str> for FrameMsgError {
    fn from(s: &str) -> Self {
        FrameMsgError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for FrameMsgError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        FrameMsgError::ChannelClosed
    }
}

impl From<toml::de::Error> for FrameMsgError {
    fn from(e: toml::de::Error) -> Self {
        FrameMsgError::Config(e.to_string())
    }
}
