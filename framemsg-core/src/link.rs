//! Host-side driver: receive dispatch and framed transmission.
//!
//! [`RxDispatcher`] runs the receive streams on one task. Packets are
//! handled in arrival order; only photo post-processing leaves the task.
//! Each upright photo stream gets its own worker that rotates photos on
//! the blocking pool one at a time, so a slow decode never stalls audio or
//! IMU delivery and photos still arrive in the order they were received.
//!
//! [`FrameLink`] packs messages and blocks and writes them through a
//! [`Transport`].

use std::future::poll_fn;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::block::{ImageSpriteBlock, TextSpriteBlock};
use crate::config::{CodecConfig, LinkConfig};
use crate::error::{FrameMsgError, Result};
use crate::rx::{PhotoRequest, RxEvent, RxStream, make_upright};
use crate::transport::Transport;
use crate::tx::{MessageFramer, TxMessage};

const COMMAND_CAPACITY: usize = 16;

// ── RxDispatcher ─────────────────────────────────────────────────

/// Requests a running dispatcher accepts.
#[derive(Debug)]
pub enum RxCommand {
    /// Select the parameters of the next photo transfer.
    BeginPhoto {
        request: PhotoRequest,
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Cloneable handle for controlling a running [`RxDispatcher`].
#[derive(Debug, Clone)]
pub struct RxHandle {
    commands: mpsc::Sender<RxCommand>,
}

impl RxHandle {
    /// Prepare the photo stream for the transfer described by `request`.
    ///
    /// Fails with `MissingHeader` for a raw request when no full photo
    /// with the same settings has been received.
    pub async fn begin_photo(&self, request: PhotoRequest) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(RxCommand::BeginPhoto { request, reply })
            .await?;
        response.await.map_err(|_| FrameMsgError::ChannelClosed)?
    }
}

enum Step {
    Packet(Option<Bytes>),
    Burst(u32),
    Command(Option<RxCommand>),
    EventsClosed,
}

/// Owns the receive streams and feeds them inbound packets.
#[derive(Debug)]
pub struct RxDispatcher {
    streams: Vec<RxStream>,
    commands: mpsc::Receiver<RxCommand>,
}

impl RxDispatcher {
    pub fn new(streams: Vec<RxStream>) -> (Self, RxHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        (
            Self {
                streams,
                commands: rx,
            },
            RxHandle { commands: tx },
        )
    }

    /// Dispatcher over the standard audio, IMU, photo and tap streams.
    pub fn from_config(config: &CodecConfig) -> (Self, RxHandle) {
        Self::new(RxStream::standard_set(config))
    }

    pub fn streams(&self) -> &[RxStream] {
        &self.streams
    }

    pub fn streams_mut(&mut self) -> &mut Vec<RxStream> {
        &mut self.streams
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn spawn(
        self,
        packets: mpsc::Receiver<Bytes>,
        events: mpsc::Sender<RxEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(packets, events))
    }

    /// Serve until the packet stream ends or `events` is dropped.
    ///
    /// Returns once every photo handed to a post-processing worker has
    /// been delivered or the event receiver is gone.
    pub async fn run(mut self, mut packets: mpsc::Receiver<Bytes>, events: mpsc::Sender<RxEvent>) {
        info!(streams = self.streams.len(), "rx dispatcher started");
        let mut commands_open = true;

        // One post-processing queue per stream; `None` where photos are
        // forwarded as received.
        let mut workers = Vec::new();
        let mut upright = Vec::with_capacity(self.streams.len());
        for stream in &self.streams {
            match stream {
                RxStream::Photo(photo) if photo.upright() => {
                    let (tx, rx) = mpsc::unbounded_channel();
                    workers.push(tokio::spawn(upright_worker(rx, events.clone())));
                    upright.push(Some(tx));
                }
                _ => upright.push(None),
            }
        }

        loop {
            let step = tokio::select! {
                packet = packets.recv() => Step::Packet(packet),
                count = poll_fn(|cx| poll_taps(&mut self.streams, cx)) => Step::Burst(count),
                command = self.commands.recv(), if commands_open => Step::Command(command),
                _ = events.closed() => Step::EventsClosed,
            };

            match step {
                Step::Packet(Some(packet)) => {
                    if !self.dispatch(&packet, &events, &upright).await {
                        break;
                    }
                }
                Step::Packet(None) => {
                    debug!("packet stream ended");
                    break;
                }
                Step::Burst(count) => {
                    if events.send(RxEvent::Tap(count)).await.is_err() {
                        break;
                    }
                }
                Step::Command(Some(command)) => self.handle_command(command),
                Step::Command(None) => commands_open = false,
                Step::EventsClosed => {
                    debug!("event receiver dropped");
                    break;
                }
            }
        }

        drop(upright);
        for worker in workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "photo worker failed");
            }
        }
        info!("rx dispatcher stopped");
    }

    /// Offer `packet` to every stream. Returns false once `events` closes.
    async fn dispatch(
        &mut self,
        packet: &[u8],
        events: &mpsc::Sender<RxEvent>,
        upright: &[Option<mpsc::UnboundedSender<Bytes>>],
    ) -> bool {
        for (stream, worker) in self.streams.iter_mut().zip(upright) {
            let produced = match stream.on_packet(packet) {
                Ok(produced) => produced,
                Err(e) => {
                    warn!(stream = ?stream.kind(), error = %e, "dropping packet");
                    continue;
                }
            };
            for event in produced {
                match (event, worker) {
                    (RxEvent::Photo(jpeg), Some(worker)) => {
                        if worker.send(jpeg).is_err() {
                            debug!("photo worker stopped");
                            return false;
                        }
                    }
                    (event, _) => {
                        if events.send(event).await.is_err() {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }

    fn handle_command(&mut self, command: RxCommand) {
        match command {
            RxCommand::BeginPhoto { request, reply } => {
                let result = self
                    .streams
                    .iter_mut()
                    .find_map(|s| match s {
                        RxStream::Photo(photo) => Some(photo),
                        _ => None,
                    })
                    .ok_or(FrameMsgError::InvalidArgument("no photo stream registered"))
                    .and_then(|photo| photo.begin(request));
                if let Err(e) = &result {
                    debug!(error = %e, "photo request rejected");
                }
                let _ = reply.send(result);
            }
        }
    }
}

/// Ready with the first finished tap burst among `streams`.
fn poll_taps(streams: &mut [RxStream], cx: &mut Context<'_>) -> Poll<u32> {
    for stream in streams {
        if let RxStream::Tap(tap) = stream {
            if let Poll::Ready(count) = tap.poll_burst(cx) {
                return Poll::Ready(count);
            }
        }
    }
    Poll::Pending
}

/// Rotate finished photos upright one at a time and deliver them in the
/// order they were queued. A photo that fails to decode is delivered as
/// received. Stops when the queue closes or `events` is dropped.
async fn upright_worker(mut photos: mpsc::UnboundedReceiver<Bytes>, events: mpsc::Sender<RxEvent>) {
    while let Some(jpeg) = photos.recv().await {
        let raw = jpeg.clone();
        let photo = match tokio::task::spawn_blocking(move || make_upright(&jpeg)).await {
            Ok(Ok(rotated)) => rotated,
            Ok(Err(e)) => {
                warn!(error = %e, "photo post-processing failed, delivering unrotated");
                raw
            }
            Err(e) => {
                warn!(error = %e, "photo post-processing task failed, delivering unrotated");
                raw
            }
        };
        if events.send(RxEvent::Photo(photo)).await.is_err() {
            debug!("event receiver dropped, photo worker stopping");
            break;
        }
    }
}

// ── FrameLink ────────────────────────────────────────────────────

/// Sends framed messages over a transport.
#[derive(Debug)]
pub struct FrameLink<T> {
    transport: T,
    framer: MessageFramer,
}

impl<T: Transport> FrameLink<T> {
    pub fn new(transport: T, framer: MessageFramer) -> Self {
        Self { transport, framer }
    }

    pub fn from_config(transport: T, config: &LinkConfig) -> Result<Self> {
        Ok(Self::new(transport, MessageFramer::new(config.max_packet_payload)?))
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn framer(&self) -> MessageFramer {
        self.framer
    }

    /// Pack `message` and send it as message `code`.
    pub async fn send_message<M: TxMessage + ?Sized>(&self, code: u8, message: &M) -> Result<()> {
        let payload = message.pack()?;
        self.send_payload(code, &payload).await
    }

    /// Send an already packed payload as message `code`.
    pub async fn send_payload(&self, code: u8, payload: &[u8]) -> Result<()> {
        for packet in self.framer.frame(code, payload)? {
            self.transport.send(packet).await?;
        }
        Ok(())
    }

    /// Send the block header, then each strip in order.
    pub async fn send_image_block(&self, code: u8, block: &ImageSpriteBlock) -> Result<()> {
        self.send_message(code, block).await?;
        for strip in block.strips() {
            self.send_message(code, strip).await?;
        }
        debug!(strips = block.strips().len(), "sent image block");
        Ok(())
    }

    /// Send the block header, then each line sprite in order.
    pub async fn send_text_block(&self, code: u8, block: &TextSpriteBlock) -> Result<()> {
        self.send_message(code, block).await?;
        for sprite in block.sprites() {
            self.send_message(code, sprite).await?;
        }
        debug!(lines = block.lines().len(), "sent text block");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::StreamFlags;
    use crate::rx::{RxImu, RxPhoto, RxTap, TapDebouncer};
    use crate::transport::ChannelTransport;
    use crate::tx::TxCode;
    use crate::tx::framing::MessageAssembler;

    #[tokio::test]
    async fn bad_packets_do_not_stop_the_loop() {
        let (dispatcher, _handle) = RxDispatcher::new(vec![RxStream::Imu(RxImu::new(0x0A, 1))]);
        let (packets_tx, packets) = mpsc::channel(8);
        let (events, mut events_rx) = mpsc::channel(8);
        let task = dispatcher.spawn(packets, events);

        packets_tx.send(Bytes::from_static(&[0x0A, 0])).await.unwrap();
        let mut good = vec![0x0A, 0];
        good.extend_from_slice(&[0; 12]);
        packets_tx.send(Bytes::from(good)).await.unwrap();

        match events_rx.recv().await.unwrap() {
            RxEvent::Imu(data) => assert_eq!(data.accel, Default::default()),
            other => panic!("unexpected event {other:?}"),
        }

        drop(packets_tx);
        task.await.unwrap();
    }

    fn photo_packets(body: &[u8]) -> Vec<Bytes> {
        let chunks: Vec<&[u8]> = body.chunks(200).collect();
        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let mut packet = vec![if i + 1 == chunks.len() { 0x08 } else { 0x07 }];
                packet.extend_from_slice(chunk);
                Bytes::from(packet)
            })
            .collect()
    }

    #[tokio::test]
    async fn upright_photos_keep_arrival_order() {
        let photo = RxPhoto::new(StreamFlags::default().photo()).with_upright(true);
        let (dispatcher, _handle) = RxDispatcher::new(vec![RxStream::Photo(photo)]);
        let (packets_tx, packets) = mpsc::channel(64);
        let (events, mut events_rx) = mpsc::channel(8);
        let task = dispatcher.spawn(packets, events);

        // A decodable photo, then one that fails fast and passes through.
        let img = image::RgbImage::from_fn(320, 240, |x, y| image::Rgb([x as u8, y as u8, 7]));
        let mut jpeg = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut jpeg, image::ImageFormat::Jpeg)
            .unwrap();
        let not_jpeg = Bytes::from_static(b"not a jpeg");
        for packet in photo_packets(jpeg.get_ref()).into_iter().chain(photo_packets(&not_jpeg)) {
            packets_tx.send(packet).await.unwrap();
        }
        drop(packets_tx);

        let Some(RxEvent::Photo(first)) = events_rx.recv().await else {
            panic!("expected photo");
        };
        let decoded = image::load_from_memory(&first).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (240, 320));
        assert_eq!(events_rx.recv().await, Some(RxEvent::Photo(not_jpeg)));

        // The dispatcher waits for its worker before stopping.
        task.await.unwrap();
        assert_eq!(events_rx.recv().await, None);
    }

    #[tokio::test]
    async fn begin_photo_without_stream_fails() {
        let (dispatcher, handle) = RxDispatcher::new(vec![]);
        let (_packets_tx, packets) = mpsc::channel(1);
        let (events, _events_rx) = mpsc::channel(1);
        dispatcher.spawn(packets, events);

        let err = handle.begin_photo(PhotoRequest::default()).await.unwrap_err();
        assert!(matches!(err, FrameMsgError::InvalidArgument(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn tap_bursts_are_emitted() {
        let (dispatcher, _handle) =
            RxDispatcher::new(vec![RxStream::Tap(RxTap::new(0x09, TapDebouncer::default()))]);
        let (packets_tx, packets) = mpsc::channel(8);
        let (events, mut events_rx) = mpsc::channel(8);
        dispatcher.spawn(packets, events);

        packets_tx.send(Bytes::from_static(&[0x09])).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        packets_tx.send(Bytes::from_static(&[0x09])).await.unwrap();

        assert_eq!(events_rx.recv().await, Some(RxEvent::Tap(2)));
    }

    #[tokio::test]
    async fn frame_link_splits_messages() {
        let (transport, mut device) = ChannelTransport::pair(16);
        let link = FrameLink::new(transport, MessageFramer::new(8).unwrap());

        link.send_payload(0x20, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]).await.unwrap();
        link.send_message(0x21, &TxCode::new(0x42)).await.unwrap();

        let mut assembler = MessageAssembler::new();
        let mut messages = Vec::new();
        while let Some(packet) = device.try_recv_sent() {
            if let Some(msg) = assembler.push(&packet).unwrap() {
                messages.push(msg);
            }
        }
        assert_eq!(
            messages,
            vec![
                (0x20, Bytes::from_static(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10])),
                (0x21, Bytes::from_static(&[0x42])),
            ]
        );
    }
}
