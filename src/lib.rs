pub mod audio;
pub mod capture;
pub mod config;
pub mod error;
pub mod practice;
pub mod remote;

pub use audio::{
    DecodedAudioBuffer, MemoryBackend, PayloadKind, PcmDecoder, PlaybackBackend, PlaybackEngine,
    PlaybackHandle, WavFileBackend,
};
pub use capture::{
    AudioChunk, CaptureConfig, CaptureDevice, CaptureSession, CaptureState, FileDevice,
    RecordedAudio, ScriptedDevice,
};
pub use config::Config;
pub use error::{CaptureError, DecodeError, PlaybackError, RemoteCallError};
pub use practice::{PracticeSession, PracticeTarget};
pub use remote::{EvaluationClient, GeminiClient, SpeechEvaluation, SynthesisClient};
