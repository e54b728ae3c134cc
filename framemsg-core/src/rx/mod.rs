//! Receive side: flag-byte demultiplexing and per-stream reassembly.
//!
//! Every notification from the device is offered to each registered
//! stream. A stream acts only on its own flag bytes, so the set of
//! streams can share one notification channel.

pub mod audio;
pub mod imu;
pub mod photo;
pub mod reassembler;
pub mod tap;

pub use audio::RxAudio;
pub use imu::{ImuData, ImuRaw, RxImu, SensorWindow, Vec3};
pub use photo::{HeaderCache, HeaderKey, JPEG_HEADER_SIZE, PhotoRequest, RxPhoto, make_upright};
pub use reassembler::{ChunkEvent, ChunkReassembler, ReassemblyMode};
pub use tap::{RxTap, TapDebouncer};

use bytes::Bytes;

use crate::config::CodecConfig;
use crate::error::Result;

/// A value produced by a receive stream.
#[derive(Debug, Clone, PartialEq)]
pub enum RxEvent {
    Audio(ChunkEvent),
    Imu(ImuData),
    /// A complete JPEG.
    Photo(Bytes),
    /// Number of taps in a finished burst.
    Tap(u32),
}

/// Short name of the stream kind, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Audio,
    Imu,
    Photo,
    Tap,
}

/// One receive stream and its state.
#[derive(Debug)]
pub enum RxStream {
    Audio(RxAudio),
    Imu(RxImu),
    Photo(RxPhoto),
    Tap(RxTap),
}

impl RxStream {
    /// The four standard streams configured from `config`.
    pub fn standard_set(config: &CodecConfig) -> Vec<RxStream> {
        let flags = &config.flags;
        vec![
            RxStream::Audio(
                RxAudio::new(flags.audio(), config.audio.streaming).with_format(config.audio.format()),
            ),
            RxStream::Imu(RxImu::new(flags.imu, config.imu.smoothing_samples)),
            RxStream::Photo(RxPhoto::new(flags.photo()).with_upright(config.photo.upright)),
            RxStream::Tap(RxTap::new(flags.tap, config.tap.debouncer())),
        ]
    }

    pub fn kind(&self) -> StreamKind {
        match self {
            RxStream::Audio(_) => StreamKind::Audio,
            RxStream::Imu(_) => StreamKind::Imu,
            RxStream::Photo(_) => StreamKind::Photo,
            RxStream::Tap(_) => StreamKind::Tap,
        }
    }

    /// Handle one notification.
    ///
    /// Tap bursts are not returned here; they come from the tap timer
    /// (see [`RxTap::poll_burst`]).
    pub fn on_packet(&mut self, packet: &[u8]) -> Result<Vec<RxEvent>> {
        let events = match self {
            RxStream::Audio(audio) => audio
                .on_packet(packet)
                .into_iter()
                .map(RxEvent::Audio)
                .collect(),
            RxStream::Imu(imu) => imu.on_packet(packet)?.map(RxEvent::Imu).into_iter().collect(),
            RxStream::Photo(photo) => photo.on_packet(packet).map(RxEvent::Photo).into_iter().collect(),
            RxStream::Tap(tap) => {
                tap.on_packet(packet);
                Vec::new()
            }
        };
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_set_uses_configured_flags() {
        let mut streams = RxStream::standard_set(&CodecConfig::default());
        let kinds: Vec<_> = streams.iter().map(RxStream::kind).collect();
        assert_eq!(
            kinds,
            vec![StreamKind::Audio, StreamKind::Imu, StreamKind::Photo, StreamKind::Tap]
        );

        // An audio packet is claimed by the audio stream only.
        let packet = [0x06, 1, 2];
        let events: Vec<Vec<RxEvent>> = streams
            .iter_mut()
            .map(|s| s.on_packet(&packet).unwrap())
            .collect();
        assert_eq!(
            events[0],
            vec![
                RxEvent::Audio(ChunkEvent::Data(Bytes::from_static(&[1, 2]))),
                RxEvent::Audio(ChunkEvent::EndOfStream)
            ]
        );
        assert!(events[1..].iter().all(Vec::is_empty));
    }

    #[test]
    fn imu_errors_surface() {
        let mut stream = RxStream::Imu(RxImu::new(0x0A, 1));
        assert!(stream.on_packet(&[0x0A, 0, 0]).is_err());
    }

    #[test]
    fn photo_completion_becomes_event() {
        let mut stream = RxStream::Photo(RxPhoto::new(crate::flags::StreamFlags::default().photo()));
        assert!(stream.on_packet(&[0x07, 0xFF]).unwrap().is_empty());
        assert_eq!(
            stream.on_packet(&[0x08, 0xD8]).unwrap(),
            vec![RxEvent::Photo(Bytes::from_static(&[0xFF, 0xD8]))]
        );
    }
}
