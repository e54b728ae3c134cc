//! RIFF/WAVE container for raw PCM captured from the microphone.
//!
//! ```text
//! "RIFF"  file_size (36 + data_len)  "WAVE"
//! "fmt "  16  format=1 (PCM)  channels  sample_rate  byte_rate  block_align  bits
//! "data"  data_len  <samples>
//! ```
//! All integers little-endian.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{FrameMsgError, Result};

/// Size of the canonical PCM header.
pub const WAV_HEADER_SIZE: usize = 44;

const PCM_FORMAT: u16 = 1;
const FMT_CHUNK_SIZE: u32 = 16;

/// Largest PCM body whose RIFF size field (`36 + len`) still fits in u32.
pub const MAX_PCM_SIZE: usize = (u32::MAX - 36) as usize;

/// Sample layout of a PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: 8000,
            bits_per_sample: 16,
            channels: 1,
        }
    }
}

impl PcmFormat {
    /// Bytes per sample frame across all channels.
    pub fn block_align(&self) -> Result<u16> {
        let bits = self.channels as u32 * self.bits_per_sample as u32;
        u16::try_from(bits / 8)
            .map_err(|_| FrameMsgError::InvalidArgument("wav block align does not fit in u16"))
    }

    pub fn byte_rate(&self) -> Result<u32> {
        let rate = self.sample_rate as u64 * self.channels as u64 * self.bits_per_sample as u64 / 8;
        u32::try_from(rate)
            .map_err(|_| FrameMsgError::InvalidArgument("wav byte rate does not fit in u32"))
    }
}

/// Wrap `pcm` in a 44-byte WAV header.
///
/// Fails when the format's derived fields or the data length overflow
/// their header fields.
pub fn to_wav_bytes(pcm: &[u8], format: PcmFormat) -> Result<Bytes> {
    if pcm.len() > MAX_PCM_SIZE {
        return Err(FrameMsgError::PayloadTooLarge {
            size: pcm.len(),
            max: MAX_PCM_SIZE,
        });
    }
    let data_len = pcm.len() as u32;
    let byte_rate = format.byte_rate()?;
    let block_align = format.block_align()?;

    let mut buf = BytesMut::with_capacity(WAV_HEADER_SIZE + pcm.len());

    buf.put_slice(b"RIFF");
    buf.put_u32_le(36 + data_len);
    buf.put_slice(b"WAVE");

    buf.put_slice(b"fmt ");
    buf.put_u32_le(FMT_CHUNK_SIZE);
    buf.put_u16_le(PCM_FORMAT);
    buf.put_u16_le(format.channels);
    buf.put_u32_le(format.sample_rate);
    buf.put_u32_le(byte_rate);
    buf.put_u16_le(block_align);
    buf.put_u16_le(format.bits_per_sample);

    buf.put_slice(b"data");
    buf.put_u32_le(data_len);
    buf.put_slice(pcm);

    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(b: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(b[at..at + 4].try_into().unwrap())
    }

    fn u16_at(b: &[u8], at: usize) -> u16 {
        u16::from_le_bytes(b[at..at + 2].try_into().unwrap())
    }

    #[test]
    fn header_fields() {
        let pcm = vec![0x11u8; 100];
        let wav = to_wav_bytes(&pcm, PcmFormat::default()).unwrap();

        assert_eq!(wav.len(), WAV_HEADER_SIZE + 100);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32_at(&wav, 4), 136);
        assert_eq!(&wav[8..16], b"WAVEfmt ");
        assert_eq!(u32_at(&wav, 16), 16);
        assert_eq!(u16_at(&wav, 20), 1);
        assert_eq!(u16_at(&wav, 22), 1);
        assert_eq!(u32_at(&wav, 24), 8000);
        assert_eq!(u32_at(&wav, 28), 16000);
        assert_eq!(u16_at(&wav, 32), 2);
        assert_eq!(u16_at(&wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40), 100);
        assert_eq!(&wav[44..], &pcm[..]);
    }

    #[test]
    fn stereo_alignment() {
        let format = PcmFormat {
            sample_rate: 16000,
            bits_per_sample: 8,
            channels: 2,
        };
        let wav = to_wav_bytes(&[], format).unwrap();
        assert_eq!(u32_at(&wav, 28), 32000);
        assert_eq!(u16_at(&wav, 32), 2);
        assert_eq!(u32_at(&wav, 4), 36);
    }

    #[test]
    fn oversized_format_is_rejected_not_wrapped() {
        let wide = PcmFormat {
            sample_rate: u32::MAX,
            bits_per_sample: 32,
            channels: 8,
        };
        assert!(matches!(
            to_wav_bytes(&[0; 4], wide),
            Err(FrameMsgError::InvalidArgument(_))
        ));

        let many_channels = PcmFormat {
            sample_rate: 8000,
            bits_per_sample: u16::MAX,
            channels: u16::MAX,
        };
        assert!(many_channels.block_align().is_err());
        assert!(to_wav_bytes(&[], many_channels).is_err());
    }
}
