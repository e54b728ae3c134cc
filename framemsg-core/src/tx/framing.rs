//! Packet framing for outbound messages.
//!
//! A message is split into packets no larger than the link allows.
//!
//! ## Wire format
//!
//! **First packet**:
//! ```text
//! data_flag:   u8   (0x01)
//! msg_code:    u8
//! total_len:   u16 BE
//! data:        [u8] (≤ max_packet_payload − 3)
//! ```
//!
//! **Subsequent packets**:
//! ```text
//! data_flag:   u8   (0x01)
//! msg_code:    u8
//! data:        [u8] (≤ max_packet_payload − 1)
//! ```
//!
//! `max_packet_payload` counts everything after the data flag.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{FrameMsgError, Result};
use crate::flags::DATA_FLAG;

/// Largest message the 16-bit length prefix can describe.
pub const MAX_MESSAGE_SIZE: usize = u16::MAX as usize;

const FIRST_HEADER: usize = 3; // msg_code + total_len
const NEXT_HEADER: usize = 1; // msg_code

/// Splits messages into link-sized packets.
#[derive(Debug, Clone, Copy)]
pub struct MessageFramer {
    max_packet_payload: usize,
}

impl MessageFramer {
    /// `max_packet_payload` must leave room for at least one data byte
    /// after the first-packet header.
    pub fn new(max_packet_payload: usize) -> Result<Self> {
        if max_packet_payload <= FIRST_HEADER {
            return Err(FrameMsgError::InvalidArgument(
                "max packet payload must exceed the 3-byte message header",
            ));
        }
        Ok(Self { max_packet_payload })
    }

    pub fn max_packet_payload(&self) -> usize {
        self.max_packet_payload
    }

    /// Split `payload` into packets, in send order.
    pub fn frame(&self, msg_code: u8, payload: &[u8]) -> Result<Vec<Bytes>> {
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(FrameMsgError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }

        let first_len = payload.len().min(self.max_packet_payload - FIRST_HEADER);
        let (first, rest) = payload.split_at(first_len);

        let mut packets = Vec::with_capacity(1 + rest.len().div_ceil(self.max_packet_payload - NEXT_HEADER));

        let mut pkt = BytesMut::with_capacity(1 + FIRST_HEADER + first.len());
        pkt.put_u8(DATA_FLAG);
        pkt.put_u8(msg_code);
        pkt.put_u16(payload.len() as u16);
        pkt.put_slice(first);
        packets.push(pkt.freeze());

        for chunk in rest.chunks(self.max_packet_payload - NEXT_HEADER) {
            let mut pkt = BytesMut::with_capacity(1 + NEXT_HEADER + chunk.len());
            pkt.put_u8(DATA_FLAG);
            pkt.put_u8(msg_code);
            pkt.put_slice(chunk);
            packets.push(pkt.freeze());
        }

        trace!(msg_code, len = payload.len(), packets = packets.len(), "framed message");
        Ok(packets)
    }
}

// ── MessageAssembler ─────────────────────────────────────────────

/// Device-side inverse of [`MessageFramer`]: collects packets back into
/// whole messages.
#[derive(Debug, Default)]
pub struct MessageAssembler {
    current: Option<Pending>,
}

#[derive(Debug)]
struct Pending {
    msg_code: u8,
    expected: usize,
    data: BytesMut,
}

impl MessageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one packet; returns `(msg_code, payload)` once a message is
    /// complete. Packets without the data flag are ignored.
    pub fn push(&mut self, packet: &[u8]) -> Result<Option<(u8, Bytes)>> {
        if packet.first() != Some(&DATA_FLAG) {
            return Ok(None);
        }

        match self.current.as_mut() {
            None => {
                if packet.len() < 1 + FIRST_HEADER {
                    return Err(FrameMsgError::Format {
                        stream: "message",
                        expected: 1 + FIRST_HEADER,
                        actual: packet.len(),
                    });
                }
                let expected = u16::from_be_bytes([packet[2], packet[3]]) as usize;
                let mut data = BytesMut::with_capacity(expected);
                data.put_slice(&packet[1 + FIRST_HEADER..]);
                self.current = Some(Pending {
                    msg_code: packet[1],
                    expected,
                    data,
                });
            }
            Some(pending) => {
                if packet.len() < 1 + NEXT_HEADER {
                    return Err(FrameMsgError::Format {
                        stream: "message",
                        expected: 1 + NEXT_HEADER,
                        actual: packet.len(),
                    });
                }
                pending.data.put_slice(&packet[1 + NEXT_HEADER..]);
            }
        }

        match self.current.take() {
            Some(pending) if pending.data.len() >= pending.expected => {
                Ok(Some((pending.msg_code, pending.data.freeze())))
            }
            still_pending => {
                self.current = still_pending;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_message_is_one_packet() {
        let framer = MessageFramer::new(20).unwrap();
        let packets = framer.frame(0x20, b"hi").unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(&packets[0][..], &[0x01, 0x20, 0x00, 0x02, b'h', b'i']);
    }

    #[test]
    fn empty_message_carries_zero_length() {
        let framer = MessageFramer::new(20).unwrap();
        let packets = framer.frame(0x11, &[]).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(&packets[0][..], &[0x01, 0x11, 0x00, 0x00]);
    }

    #[test]
    fn splits_and_reassembles() {
        let framer = MessageFramer::new(8).unwrap();
        let payload: Vec<u8> = (0..30).collect();
        let packets = framer.frame(0x30, &payload).unwrap();

        // 5 bytes in the first packet, then 7 per packet: 5 + 7 + 7 + 7 + 4.
        assert_eq!(packets.len(), 5);
        assert!(packets.iter().all(|p| p.len() <= 9));
        assert_eq!(&packets[1][..3], &[0x01, 0x30, 5]);

        let mut assembler = MessageAssembler::new();
        let mut out = None;
        for p in &packets {
            out = assembler.push(p).unwrap();
        }
        let (code, body) = out.unwrap();
        assert_eq!(code, 0x30);
        assert_eq!(&body[..], &payload[..]);
    }

    #[test]
    fn rejects_oversized_payload() {
        let framer = MessageFramer::new(240).unwrap();
        let payload = vec![0u8; MAX_MESSAGE_SIZE + 1];
        assert!(matches!(
            framer.frame(1, &payload),
            Err(FrameMsgError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn rejects_tiny_packet_size() {
        assert!(MessageFramer::new(3).is_err());
    }
}
