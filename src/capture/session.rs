use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::audio::payload::to_data_uri;
use crate::error::CaptureError;

use super::device::{AudioChunk, CaptureDevice};

/// Container mime type attached to finalized recordings.
pub const DEFAULT_CONTAINER_MIME: &str = "audio/webm";

/// Configuration for a capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Mime type the device's native container is tagged with
    pub container_mime: String,

    /// Upper bound on waiting for the device to flush after stop
    pub flush_timeout: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            container_mime: DEFAULT_CONTAINER_MIME.to_string(),
            flush_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureState {
    Idle,
    Recording,
    Finalizing,
}

/// A finalized recording: every captured chunk concatenated in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAudio {
    pub session_id: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub chunk_count: usize,
    pub captured_at: DateTime<Utc>,
}

impl RecordedAudio {
    /// Self-describing base64 payload (`data:<mime>;base64,...`)
    pub fn to_payload(&self) -> String {
        to_data_uri(&self.mime_type, &self.bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Observer notified with each finalized recording.
pub type FinalizedHook = Box<dyn FnMut(&RecordedAudio) + Send>;

/// Owns one microphone device and turns start/stop cycles into recordings.
///
/// Only one recording is active at a time. Dropping the session releases a
/// device that is still held.
pub struct CaptureSession<D: CaptureDevice> {
    session_id: String,
    device: D,
    config: CaptureConfig,
    state: CaptureState,
    collector: Option<JoinHandle<Vec<AudioChunk>>>,
    on_finalized: Option<FinalizedHook>,
}

impl<D: CaptureDevice> CaptureSession<D> {
    pub fn new(device: D, config: CaptureConfig) -> Self {
        Self {
            session_id: format!("recording-{}", uuid::Uuid::new_v4()),
            device,
            config,
            state: CaptureState::Idle,
            collector: None,
            on_finalized: None,
        }
    }

    pub fn on_finalized(mut self, hook: impl FnMut(&RecordedAudio) + Send + 'static) -> Self {
        self.on_finalized = Some(Box::new(hook));
        self
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == CaptureState::Recording
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Acquire the device and begin collecting chunks.
    ///
    /// A refused device leaves the session idle.
    pub async fn start(&mut self) -> Result<(), CaptureError> {
        if self.state != CaptureState::Idle {
            warn!("Recording already started: {}", self.session_id);
            return Err(CaptureError::AlreadyRecording);
        }

        let mut chunk_rx = match self.device.acquire().await {
            Ok(rx) => rx,
            Err(e) => {
                error!("Failed to acquire {} device: {}", self.device.name(), e);
                return Err(e);
            }
        };

        self.session_id = format!("recording-{}", uuid::Uuid::new_v4());
        let session_id = self.session_id.clone();

        let collector = tokio::spawn(async move {
            let mut chunks = Vec::new();

            while let Some(chunk) = chunk_rx.recv().await {
                if chunk.data.is_empty() {
                    debug!("Ignoring empty chunk {}", chunk.sequence);
                    continue;
                }
                debug!(
                    "Collected chunk {} ({} bytes) for {}",
                    chunk.sequence,
                    chunk.data.len(),
                    session_id
                );
                chunks.push(chunk);
            }

            chunks
        });

        self.collector = Some(collector);
        self.state = CaptureState::Recording;

        info!(
            "Recording started: {} on {} device",
            self.session_id,
            self.device.name()
        );

        Ok(())
    }

    /// Stop the active recording and finalize it.
    ///
    /// Returns `Ok(None)` without side effects when nothing is recording.
    /// The device flush and the last chunk together get at most
    /// `flush_timeout`. The device is released and the session is idle again
    /// on every exit, including when this future is dropped before it
    /// completes.
    pub async fn stop(&mut self) -> Result<Option<RecordedAudio>, CaptureError> {
        if self.state != CaptureState::Recording {
            debug!("Stop ignored, not recording");
            return Ok(None);
        }

        info!("Stopping recording: {}", self.session_id);
        self.state = CaptureState::Finalizing;

        let collected = {
            let mut guard = StopGuard { session: &mut *self };
            let collected = guard.session.flush().await;
            drop(guard);
            collected
        };

        let chunks = collected?;
        let recording = self.finalize(chunks);

        if let Some(hook) = self.on_finalized.as_mut() {
            hook(&recording);
        }

        Ok(Some(recording))
    }

    /// Ask the device to flush and wait for the collector to drain the channel.
    async fn flush(&mut self) -> Result<Vec<AudioChunk>, CaptureError> {
        let flush_timeout = self.config.flush_timeout;

        let flushed = tokio::time::timeout(flush_timeout, self.drain()).await;

        match flushed {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "{} device did not flush within {:?}",
                    self.device.name(),
                    flush_timeout
                );
                Err(CaptureError::Finalization(format!(
                    "device did not flush within {:?}",
                    flush_timeout
                )))
            }
        }
    }

    async fn drain(&mut self) -> Result<Vec<AudioChunk>, CaptureError> {
        if let Err(e) = self.device.request_stop().await {
            error!("Device flush failed: {}", e);
            return Err(e);
        }

        let Some(collector) = self.collector.as_mut() else {
            return Ok(Vec::new());
        };

        let chunks = collector
            .await
            .map_err(|e| CaptureError::Finalization(format!("chunk collector failed: {}", e)))?;
        self.collector = None;

        Ok(chunks)
    }

    /// Abandon any pending chunks, free the hardware and go back to idle.
    fn teardown(&mut self) {
        if let Some(collector) = self.collector.take() {
            collector.abort();
        }
        self.device.release();
        self.state = CaptureState::Idle;
    }

    fn finalize(&self, chunks: Vec<AudioChunk>) -> RecordedAudio {
        let chunk_count = chunks.len();
        let total: usize = chunks.iter().map(|c| c.data.len()).sum();

        let mut bytes = Vec::with_capacity(total);
        for chunk in chunks {
            bytes.extend_from_slice(&chunk.data);
        }

        info!(
            "Recording finalized: {} ({} chunks, {} bytes, {})",
            self.session_id, chunk_count, total, self.config.container_mime
        );

        RecordedAudio {
            session_id: self.session_id.clone(),
            mime_type: self.config.container_mime.clone(),
            bytes,
            chunk_count,
            captured_at: Utc::now(),
        }
    }
}

impl<D: CaptureDevice> Drop for CaptureSession<D> {
    fn drop(&mut self) {
        if self.collector.is_some() || self.device.is_acquired() {
            warn!("Capture session {} dropped while recording", self.session_id);
            self.teardown();
        }
    }
}

/// Tears the session down when `stop` finishes or is cancelled mid-flush.
struct StopGuard<'a, D: CaptureDevice> {
    session: &'a mut CaptureSession<D>,
}

impl<D: CaptureDevice> Drop for StopGuard<'_, D> {
    fn drop(&mut self) {
        self.session.teardown();
    }
}
