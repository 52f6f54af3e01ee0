use std::io::{Cursor, ErrorKind};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};

use crate::error::DecodeError;

use super::pcm::{DecodedAudioBuffer, DEFAULT_SAMPLE_RATE};

/// Decoder for self-describing container payloads.
///
/// The data-URI playback path hands the whole container to this decoder and
/// treats it as opaque: codec, channel layout and rate come from the stream.
pub trait NativeDecoder: Send + Sync {
    fn decode(&self, mime_type: &str, bytes: &[u8]) -> Result<DecodedAudioBuffer, DecodeError>;
}

/// Container decoding backed by symphonia's probe and codec registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl NativeDecoder for SymphoniaDecoder {
    fn decode(&self, mime_type: &str, bytes: &[u8]) -> Result<DecodedAudioBuffer, DecodeError> {
        debug!("Probing {} byte {} payload", bytes.len(), mime_type);

        let source = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

        // Hint on the bare type, codec parameters are not part of the registry key
        let mut hint = Hint::new();
        hint.mime_type(mime_type.split(';').next().unwrap_or(mime_type).trim());

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                source,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| DecodeError::Container(format!("unrecognized container: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoAudioTrack)?;

        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);
        let mut channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(1);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::Container(format!("unsupported codec: {}", e)))?;

        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(DecodeError::Container(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate = spec.rate;
                    channels = spec.channels.count() as u16;

                    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buffer.samples());
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt packet, keep going
                    warn!("Skipping undecodable packet: {}", e);
                }
                Err(e) => return Err(DecodeError::Container(e.to_string())),
            }
        }

        let buffer = DecodedAudioBuffer::new(samples, sample_rate, channels);

        info!(
            "Decoded {} payload: {} frames, {}Hz, {} channels",
            mime_type,
            buffer.frame_count(),
            buffer.sample_rate(),
            buffer.channels()
        );

        Ok(buffer)
    }
}
