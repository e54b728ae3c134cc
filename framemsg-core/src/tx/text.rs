//! Small fixed-layout messages: bare codes and plain text.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::Result;
use crate::tx::TxMessage;

/// A single-byte command value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxCode {
    pub value: u8,
}

impl TxCode {
    pub fn new(value: u8) -> Self {
        Self { value }
    }
}

impl TxMessage for TxCode {
    fn pack(&self) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(&[self.value]))
    }
}

/// Text drawn by the device's own font renderer.
///
/// ```text
/// x:               u16
/// y:               u16
/// palette_offset:  u8   (low 4 bits)
/// spacing:         u8
/// text:            UTF-8
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxPlainText {
    pub text: String,
    pub x: u16,
    pub y: u16,
    pub palette_offset: u8,
    pub spacing: u8,
}

impl TxPlainText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            x: 1,
            y: 1,
            palette_offset: 0,
            spacing: 4,
        }
    }

    pub fn at(mut self, x: u16, y: u16) -> Self {
        self.x = x;
        self.y = y;
        self
    }
}

impl TxMessage for TxPlainText {
    fn pack(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(6 + self.text.len());
        buf.put_u16(self.x);
        buf.put_u16(self.y);
        buf.put_u8(self.palette_offset & 0x0F);
        buf.put_u8(self.spacing);
        buf.put_slice(self.text.as_bytes());
        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_one_byte() {
        assert_eq!(&TxCode::new(0x42).pack().unwrap()[..], &[0x42]);
    }

    #[test]
    fn plain_text_layout() {
        let mut msg = TxPlainText::new("hé").at(300, 2);
        msg.palette_offset = 0x13;
        let bytes = msg.pack().unwrap();
        assert_eq!(&bytes[..6], &[0x01, 0x2C, 0x00, 0x02, 0x03, 4]);
        assert_eq!(&bytes[6..], "hé".as_bytes());
    }
}
