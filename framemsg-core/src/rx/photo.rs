//! Camera photos, including "raw" captures that omit the JPEG header.
//!
//! A raw capture sends only the JPEG body. The header is the first
//! [`JPEG_HEADER_SIZE`] bytes of a full capture taken earlier at the same
//! quality and resolution, so the first full capture for each setting is
//! cached and spliced in front of later raw ones.

use std::collections::HashMap;
use std::io::Cursor;

use bytes::Bytes;
use image::ImageFormat;
use tracing::debug;

use crate::error::{FrameMsgError, Result};
use crate::flags::ChunkFlags;
use crate::rx::reassembler::{ChunkEvent, ChunkReassembler, ReassemblyMode};
use crate::tx::settings::{JpegQuality, TxCaptureSettings};

/// Bytes of a full capture reused as the header of raw captures.
pub const JPEG_HEADER_SIZE: usize = 623;

// ── HeaderCache ──────────────────────────────────────────────────

/// Cache key: one header per capture setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeaderKey {
    pub quality: JpegQuality,
    pub resolution: u16,
}

/// JPEG headers captured from full transfers. Entries are written once
/// and never replaced.
#[derive(Debug, Default)]
pub struct HeaderCache {
    headers: HashMap<HeaderKey, Bytes>,
}

impl HeaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &HeaderKey) -> Option<&Bytes> {
        self.headers.get(key)
    }

    /// Store the leading bytes of `jpeg` under `key` unless an entry
    /// already exists. Returns whether the cache changed.
    pub fn remember(&mut self, key: HeaderKey, jpeg: &Bytes) -> bool {
        if self.headers.contains_key(&key) {
            return false;
        }
        let header = jpeg.slice(..jpeg.len().min(JPEG_HEADER_SIZE));
        debug!(?key, len = header.len(), "cached JPEG header");
        self.headers.insert(key, header);
        true
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

// ── PhotoRequest ─────────────────────────────────────────────────

/// Parameters of the capture whose chunks are about to arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoRequest {
    pub quality: JpegQuality,
    pub resolution: u16,
    pub raw: bool,
}

impl PhotoRequest {
    pub fn key(&self) -> HeaderKey {
        HeaderKey {
            quality: self.quality,
            resolution: self.resolution,
        }
    }
}

impl Default for PhotoRequest {
    fn default() -> Self {
        Self::from(&TxCaptureSettings::default())
    }
}

impl From<&TxCaptureSettings> for PhotoRequest {
    fn from(settings: &TxCaptureSettings) -> Self {
        Self {
            quality: settings.quality,
            resolution: settings.resolution,
            raw: settings.raw,
        }
    }
}

// ── RxPhoto ──────────────────────────────────────────────────────

/// Receives photo chunks and assembles JPEG files.
#[derive(Debug)]
pub struct RxPhoto {
    reassembler: ChunkReassembler,
    headers: HeaderCache,
    request: PhotoRequest,
    upright: bool,
}

impl RxPhoto {
    pub fn new(flags: ChunkFlags) -> Self {
        Self {
            reassembler: ChunkReassembler::new(flags, ReassemblyMode::Accumulate),
            headers: HeaderCache::new(),
            request: PhotoRequest::default(),
            upright: true,
        }
    }

    /// Whether completed photos should be rotated upright before delivery.
    pub fn with_upright(mut self, upright: bool) -> Self {
        self.upright = upright;
        self
    }

    pub fn upright(&self) -> bool {
        self.upright
    }

    pub fn request(&self) -> PhotoRequest {
        self.request
    }

    pub fn headers(&self) -> &HeaderCache {
        &self.headers
    }

    /// Prepare for the chunks of `request`.
    ///
    /// Raw requests need a header from an earlier full capture with the
    /// same quality and resolution.
    pub fn begin(&mut self, request: PhotoRequest) -> Result<()> {
        self.reassembler.reset();
        if request.raw {
            let header = self
                .headers
                .get(&request.key())
                .ok_or(FrameMsgError::MissingHeader {
                    quality: request.quality,
                    resolution: request.resolution,
                })?;
            self.reassembler.seed(header);
        }
        self.request = request;
        Ok(())
    }

    /// Handle one notification; returns the assembled JPEG on the final
    /// chunk.
    pub fn on_packet(&mut self, packet: &[u8]) -> Option<Bytes> {
        let mut photo = None;
        for event in self.reassembler.on_packet(packet) {
            if let ChunkEvent::Data(jpeg) = event {
                photo = Some(jpeg);
            }
        }
        let jpeg = photo?;

        if !self.request.raw {
            self.headers.remember(self.request.key(), &jpeg);
        } else if let Some(header) = self.headers.get(&self.request.key()) {
            // Raw transfers repeat, each needing the header again.
            self.reassembler.seed(header);
        }
        Some(jpeg)
    }
}

/// Rotate a JPEG a quarter-turn clockwise and re-encode it.
///
/// The sensor is mounted on its side; this puts the image upright.
pub fn make_upright(jpeg: &[u8]) -> Result<Bytes> {
    let img = image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg)?;
    let rotated = img.rotate90();
    let mut out = Cursor::new(Vec::with_capacity(jpeg.len()));
    rotated.write_to(&mut out, ImageFormat::Jpeg)?;
    Ok(Bytes::from(out.into_inner()))
}
