//! Flag-byte framed chunk reassembly.
//!
//! Each notification is `flag | chunk`. Two flag values belong to a
//! stream: one for non-final chunks and one for the last chunk of a
//! message. Anything else on the shared channel belongs to another
//! stream and is skipped without complaint.
//!
//! Packets are assumed to arrive in order and without loss; a dropped
//! packet silently corrupts the message it belonged to.

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use crate::flags::ChunkFlags;

/// Output of the reassembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkEvent {
    /// A complete message (accumulate mode) or a forwarded chunk
    /// (stream mode).
    Data(Bytes),
    /// No more data belongs to the current message.
    EndOfStream,
}

/// How chunks are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReassemblyMode {
    /// Buffer chunks and deliver the whole message on the final chunk.
    Accumulate,
    /// Deliver each even-length chunk as it arrives; odd-length chunks
    /// are dropped to keep 16-bit samples aligned.
    Stream,
}

/// Per-stream reassembly state.
#[derive(Debug)]
pub struct ChunkReassembler {
    flags: ChunkFlags,
    mode: ReassemblyMode,
    buffer: BytesMut,
}

impl ChunkReassembler {
    pub fn new(flags: ChunkFlags, mode: ReassemblyMode) -> Self {
        Self {
            flags,
            mode,
            buffer: BytesMut::new(),
        }
    }

    pub fn flags(&self) -> ChunkFlags {
        self.flags
    }

    pub fn mode(&self) -> ReassemblyMode {
        self.mode
    }

    /// Bytes buffered for the message in progress.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Prefill the buffer ahead of the first chunk (accumulate mode only).
    pub fn seed(&mut self, prefix: &[u8]) {
        if self.mode == ReassemblyMode::Accumulate {
            self.buffer.clear();
            self.buffer.extend_from_slice(prefix);
        }
    }

    /// Drop any partially assembled message.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Handle one notification. Returns the events it completes, in
    /// delivery order; empty when the packet is foreign or buffered.
    pub fn on_packet(&mut self, packet: &[u8]) -> Vec<ChunkEvent> {
        let Some((&flag, chunk)) = packet.split_first() else {
            return Vec::new();
        };
        if !self.flags.owns(flag) {
            trace!(flag, "ignoring foreign flag");
            return Vec::new();
        }
        let is_final = flag == self.flags.final_chunk;

        let mut events = Vec::new();
        match self.mode {
            ReassemblyMode::Accumulate => {
                self.buffer.extend_from_slice(chunk);
                trace!(len = chunk.len(), total = self.buffer.len(), "appended chunk");
                if is_final {
                    let payload = self.buffer.split().freeze();
                    debug!(len = payload.len(), "message complete");
                    events.push(ChunkEvent::Data(payload));
                }
            }
            ReassemblyMode::Stream => {
                if chunk.len() % 2 == 0 {
                    events.push(ChunkEvent::Data(Bytes::copy_from_slice(chunk)));
                } else {
                    debug!(len = chunk.len(), "dropping odd-length chunk");
                }
            }
        }

        if is_final {
            events.push(ChunkEvent::EndOfStream);
        }
        events
    }
}
