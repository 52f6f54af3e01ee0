//! Microphone capture
//!
//! A `CaptureSession` owns one `CaptureDevice`, collects the encoded chunks it
//! emits during a recording, and concatenates them into a single
//! `RecordedAudio` when the recording stops.

mod device;
mod session;

pub use device::{AudioChunk, CaptureDevice, FileDevice, ScriptedDevice, DEFAULT_CHUNK_BYTES};
pub use session::{
    CaptureConfig, CaptureSession, CaptureState, FinalizedHook, RecordedAudio,
    DEFAULT_CONTAINER_MIME,
};
