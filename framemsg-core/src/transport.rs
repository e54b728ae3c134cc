//! Link abstraction the codec sits on.
//!
//! The link is packet oriented: each `send` is one write to the device and
//! each item from `subscribe` is one notification, in arrival order.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{Mutex, mpsc};
use tracing::trace;

use crate::error::{FrameMsgError, Result};

/// Packet link to the device.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write one packet.
    async fn send(&self, packet: Bytes) -> Result<()>;

    /// Stream of inbound notifications.
    async fn subscribe(&self) -> Result<mpsc::Receiver<Bytes>>;
}

// ── ChannelTransport ─────────────────────────────────────────────

/// In-memory transport backed by two mpsc channels.
///
/// The other end of the channels is a [`DeviceEnd`], which can inject
/// notifications and observe what the host sent.
#[derive(Debug)]
pub struct ChannelTransport {
    outbound: mpsc::Sender<Bytes>,
    inbound: Mutex<Option<mpsc::Receiver<Bytes>>>,
}

/// Device side of a [`ChannelTransport`].
#[derive(Debug)]
pub struct DeviceEnd {
    notify: mpsc::Sender<Bytes>,
    sent: mpsc::Receiver<Bytes>,
}

impl ChannelTransport {
    /// Create a connected pair. `capacity` bounds each direction.
    pub fn pair(capacity: usize) -> (ChannelTransport, DeviceEnd) {
        let (outbound, sent) = mpsc::channel(capacity);
        let (notify, inbound) = mpsc::channel(capacity);
        (
            ChannelTransport {
                outbound,
                inbound: Mutex::new(Some(inbound)),
            },
            DeviceEnd { notify, sent },
        )
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, packet: Bytes) -> Result<()> {
        trace!(len = packet.len(), "send packet");
        self.outbound.send(packet).await?;
        Ok(())
    }

    /// Only one subscriber is supported; a second call fails.
    async fn subscribe(&self) -> Result<mpsc::Receiver<Bytes>> {
        self.inbound
            .lock()
            .await
            .take()
            .ok_or_else(|| FrameMsgError::Other("transport already subscribed".into()))
    }
}

impl DeviceEnd {
    /// Deliver a notification to the host.
    pub async fn notify(&self, packet: impl Into<Bytes>) -> Result<()> {
        self.notify.send(packet.into()).await?;
        Ok(())
    }

    /// Next packet the host sent, or `None` once the transport is dropped.
    pub async fn recv_sent(&mut self) -> Option<Bytes> {
        self.sent.recv().await
    }

    /// Next packet the host sent, if one is already queued.
    pub fn try_recv_sent(&mut self) -> Option<Bytes> {
        self.sent.try_recv().ok()
    }

    /// Stop delivering notifications; the host's stream ends.
    pub fn close(self) -> mpsc::Receiver<Bytes> {
        self.sent
    }
}
