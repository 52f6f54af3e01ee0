use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::PlaybackError;

use super::codec;
use super::container::{NativeDecoder, SymphoniaDecoder};
use super::payload::{DataUri, PayloadKind};
use super::pcm::{DecodedAudioBuffer, PcmDecoder};

/// One output chain, owned by a single `play` call.
///
/// A context is opened per playback and must be closed on every exit path.
#[async_trait::async_trait]
pub trait PlaybackContext: Send {
    /// Attach the buffer to the output and start rendering
    async fn start(&mut self, buffer: DecodedAudioBuffer) -> Result<(), PlaybackError>;

    /// Resolves once the started buffer has drained
    async fn finished(&mut self);

    /// Release the output resources
    async fn close(&mut self) -> Result<(), PlaybackError>;
}

/// Audio output backend
///
/// Implementations:
/// - `WavFileBackend`: render each playback to a WAV file
/// - `MemoryBackend`: keep rendered buffers in memory (tests, dry runs)
#[async_trait::async_trait]
pub trait PlaybackBackend: Send + Sync {
    /// Open a fresh, unshared context for one playback
    async fn open(
        &self,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Box<dyn PlaybackContext>, PlaybackError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Default extra time allowed past a buffer's duration before a context is
/// force-closed.
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_millis(500);

/// Dispatches base64 payloads to the container or raw-PCM path and plays them.
#[derive(Clone)]
pub struct PlaybackEngine {
    backend: Arc<dyn PlaybackBackend>,
    native: Arc<dyn NativeDecoder>,
    pcm: PcmDecoder,
    close_grace: Duration,
}

impl PlaybackEngine {
    pub fn new(backend: Arc<dyn PlaybackBackend>) -> Self {
        Self {
            backend,
            native: Arc::new(SymphoniaDecoder),
            pcm: PcmDecoder::default(),
            close_grace: DEFAULT_CLOSE_GRACE,
        }
    }

    pub fn with_native_decoder(mut self, native: Arc<dyn NativeDecoder>) -> Self {
        self.native = native;
        self
    }

    pub fn with_pcm_decoder(mut self, pcm: PcmDecoder) -> Self {
        self.pcm = pcm;
        self
    }

    pub fn with_close_grace(mut self, close_grace: Duration) -> Self {
        self.close_grace = close_grace;
        self
    }

    /// Decode a payload into a buffer without playing it.
    pub fn decode(&self, payload: &str) -> Result<DecodedAudioBuffer, PlaybackError> {
        match PayloadKind::classify(payload) {
            PayloadKind::DataUri => {
                let uri = DataUri::parse(payload)?;
                let bytes = uri.decode()?;
                Ok(self.native.decode(uri.mime_type, &bytes)?)
            }
            PayloadKind::RawPcm => {
                let bytes = codec::decode(payload)?;
                Ok(self.pcm.decode(&bytes))
            }
        }
    }

    /// Play a base64 payload.
    ///
    /// Returns once playback has started. The context is closed in the
    /// background after the buffer drains, or after `duration + close_grace`
    /// if the backend never reports completion.
    pub async fn play(&self, payload: &str) -> Result<PlaybackHandle, PlaybackError> {
        let kind = PayloadKind::classify(payload);
        let buffer = self.decode(payload)?;

        let frame_count = buffer.frame_count();
        let duration = buffer.duration();

        let mut context = self
            .backend
            .open(buffer.sample_rate(), buffer.channels())
            .await?;

        if let Err(e) = context.start(buffer).await {
            if let Err(close_err) = context.close().await {
                warn!("Failed to close playback context after start error: {}", close_err);
            }
            return Err(e);
        }

        info!(
            "Playback started on {} ({:?}, {} frames, {:.2}s)",
            self.backend.name(),
            kind,
            frame_count,
            duration.as_secs_f64()
        );

        let guard = duration + self.close_grace;
        let release = tokio::spawn(async move {
            if tokio::time::timeout(guard, context.finished()).await.is_err() {
                warn!(
                    "Playback did not report completion within {:?}, closing context",
                    guard
                );
            }

            let result = context.close().await;
            match &result {
                Ok(()) => debug!("Playback context closed"),
                Err(e) => error!("Failed to close playback context: {}", e),
            }
            result
        });

        Ok(PlaybackHandle {
            frame_count,
            duration,
            release,
        })
    }
}

/// Handle to a started playback.
pub struct PlaybackHandle {
    frame_count: usize,
    duration: Duration,
    release: JoinHandle<Result<(), PlaybackError>>,
}

impl PlaybackHandle {
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Wait until the playback context has been released.
    pub async fn wait_closed(self) -> Result<(), PlaybackError> {
        self.release
            .await
            .map_err(|e| PlaybackError::Output(format!("release task failed: {}", e)))?
    }
}
