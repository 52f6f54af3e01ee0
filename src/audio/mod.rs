pub mod codec;
pub mod container;
pub mod payload;
pub mod pcm;
pub mod playback;
pub mod sink;

pub use container::{NativeDecoder, SymphoniaDecoder};
pub use payload::{strip_data_uri_header, to_data_uri, DataUri, PayloadKind, DATA_URI_AUDIO_PREFIX};
pub use pcm::{DecodedAudioBuffer, PcmDecoder, DEFAULT_SAMPLE_RATE};
pub use playback::{PlaybackBackend, PlaybackContext, PlaybackEngine, PlaybackHandle};
pub use sink::{MemoryBackend, MemoryPlayback, WavFileBackend};
