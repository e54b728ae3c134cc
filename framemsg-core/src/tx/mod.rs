//! Host → device messages.
//!
//! Every message implements [`TxMessage`]; [`MessageFramer`] splits the
//! packed bytes into transport-sized packets.

pub mod framing;
pub mod settings;
pub mod text;

use bytes::Bytes;

use crate::error::Result;

pub use framing::{MessageAssembler, MessageFramer};
pub use settings::{JpegQuality, Metering, TxAutoExpSettings, TxCaptureSettings, TxManualExpSettings};
pub use text::{TxCode, TxPlainText};

/// A message body that can be serialized for transmission.
pub trait TxMessage {
    /// Serialize to the message's wire layout.
    fn pack(&self) -> Result<Bytes>;
}
