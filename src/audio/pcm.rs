use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

/// Sample rate the synthesis provider uses for headerless PCM.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Headerless PCM is always mono.
pub const PCM_CHANNELS: u16 = 1;

const BYTES_PER_SAMPLE: usize = 2;

/// Decoded, normalized audio ready for an output device.
///
/// Samples are interleaved `f32`. The buffer is immutable once built and
/// cheap to clone (the sample storage is shared).
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudioBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl DecodedAudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            channels: channels.max(1),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of sample frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Converts one signed 16-bit sample to `f32`.
///
/// Divides by 32768 without clamping: `i16::MIN` maps to exactly -1.0 while
/// `i16::MAX` maps just below 1.0.
pub fn sample_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Decoder for headerless little-endian 16-bit mono PCM.
#[derive(Debug, Clone, Copy)]
pub struct PcmDecoder {
    sample_rate: u32,
}

impl Default for PcmDecoder {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl PcmDecoder {
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Decode raw PCM bytes into a mono buffer.
    ///
    /// Frame count is `data.len() / 2`; a trailing odd byte is dropped.
    pub fn decode(&self, data: &[u8]) -> DecodedAudioBuffer {
        let chunks = data.chunks_exact(BYTES_PER_SAMPLE);
        if !chunks.remainder().is_empty() {
            debug!(
                "Dropping trailing odd byte from {}-byte PCM payload",
                data.len()
            );
        }

        let samples: Vec<f32> = chunks
            .map(|pair| sample_to_f32(i16::from_le_bytes([pair[0], pair[1]])))
            .collect();

        debug!(
            "Decoded {} PCM samples at {}Hz",
            samples.len(),
            self.sample_rate
        );

        DecodedAudioBuffer::new(samples, self.sample_rate, PCM_CHANNELS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_conversion_bounds() {
        assert_eq!(sample_to_f32(i16::MIN), -1.0);
        assert_eq!(sample_to_f32(0), 0.0);
        let max = sample_to_f32(i16::MAX);
        assert!(max > 0.999 && max < 1.0);
    }

    #[test]
    fn test_decode_little_endian() {
        // 0x0100 = 256, 0xFF7F = 32767, 0x0080 = -32768
        let decoded = PcmDecoder::default().decode(&[0x00, 0x01, 0xFF, 0x7F, 0x00, 0x80]);
        assert_eq!(decoded.frame_count(), 3);
        assert_eq!(decoded.samples()[0], 256.0 / 32768.0);
        assert_eq!(decoded.samples()[1], 32767.0 / 32768.0);
        assert_eq!(decoded.samples()[2], -1.0);
    }

    #[test]
    fn test_odd_length_drops_trailing_byte() {
        let decoded = PcmDecoder::default().decode(&[0x10, 0x00, 0x20]);
        assert_eq!(decoded.frame_count(), 1);
    }

    #[test]
    fn test_sample_rate_override() {
        let decoded = PcmDecoder::with_sample_rate(16000).decode(&[0u8; 32000]);
        assert_eq!(decoded.sample_rate(), 16000);
        assert_eq!(decoded.channels(), 1);
        assert_eq!(decoded.duration(), Duration::from_secs(1));
    }
}
