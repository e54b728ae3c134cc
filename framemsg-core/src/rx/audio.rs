//! Microphone audio: single clips or a live PCM stream.

use bytes::Bytes;

use crate::error::Result;
use crate::flags::ChunkFlags;
use crate::rx::reassembler::{ChunkEvent, ChunkReassembler, ReassemblyMode};
use crate::wav::{self, PcmFormat};

/// Receives audio chunks.
///
/// In clip mode a whole recording is delivered at once; in streaming
/// mode each chunk of whole 16-bit samples is forwarded as it arrives.
/// Either way [`ChunkEvent::EndOfStream`] follows the final chunk.
#[derive(Debug)]
pub struct RxAudio {
    reassembler: ChunkReassembler,
    format: PcmFormat,
}

impl RxAudio {
    pub fn new(flags: ChunkFlags, streaming: bool) -> Self {
        let mode = if streaming {
            ReassemblyMode::Stream
        } else {
            ReassemblyMode::Accumulate
        };
        Self {
            reassembler: ChunkReassembler::new(flags, mode),
            format: PcmFormat::default(),
        }
    }

    pub fn with_format(mut self, format: PcmFormat) -> Self {
        self.format = format;
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.reassembler.mode() == ReassemblyMode::Stream
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn on_packet(&mut self, packet: &[u8]) -> Vec<ChunkEvent> {
        self.reassembler.on_packet(packet)
    }

    /// Wrap received PCM in a WAV container using this stream's format.
    pub fn to_wav(&self, pcm: &[u8]) -> Result<Bytes> {
        wav::to_wav_bytes(pcm, self.format)
    }
}
