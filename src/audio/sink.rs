use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::PlaybackError;

use super::pcm::DecodedAudioBuffer;
use super::playback::{PlaybackBackend, PlaybackContext};

/// Renders every playback into its own WAV file.
///
/// Useful on headless hosts: `<output_dir>/playback-<uuid>.wav`, 32-bit float.
#[derive(Debug, Clone)]
pub struct WavFileBackend {
    output_dir: PathBuf,
}

impl WavFileBackend {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, PlaybackError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|e| {
            PlaybackError::Output(format!(
                "Failed to create playback directory {:?}: {}",
                output_dir, e
            ))
        })?;

        info!("WAV playback sink writing to {}", output_dir.display());

        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait::async_trait]
impl PlaybackBackend for WavFileBackend {
    async fn open(
        &self,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Box<dyn PlaybackContext>, PlaybackError> {
        let path = self
            .output_dir
            .join(format!("playback-{}.wav", uuid::Uuid::new_v4()));

        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };

        let writer = hound::WavWriter::create(&path, spec).map_err(|e| {
            PlaybackError::Output(format!("Failed to create WAV file {:?}: {}", path, e))
        })?;

        Ok(Box::new(WavFileContext {
            writer: Some(writer),
            path,
        }))
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}

struct WavFileContext {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    path: PathBuf,
}

#[async_trait::async_trait]
impl PlaybackContext for WavFileContext {
    async fn start(&mut self, buffer: DecodedAudioBuffer) -> Result<(), PlaybackError> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| PlaybackError::Output("context already closed".into()))?;

        // hound writes synchronously; keep long clips off the async workers
        let (writer, written) = tokio::task::spawn_blocking(move || {
            let written = buffer
                .samples()
                .iter()
                .try_for_each(|&sample| writer.write_sample(sample));
            (writer, written)
        })
        .await
        .map_err(|e| PlaybackError::Output(format!("WAV writer task failed: {}", e)))?;

        self.writer = Some(writer);
        written.map_err(|e| PlaybackError::Output(format!("Failed to write sample: {}", e)))
    }

    async fn finished(&mut self) {
        // Samples are flushed synchronously in start
    }

    async fn close(&mut self) -> Result<(), PlaybackError> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| PlaybackError::Output(format!("Failed to finalize WAV: {}", e)))?;
            info!("Rendered playback to {}", self.path.display());
        }
        Ok(())
    }
}

impl Drop for WavFileContext {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}

/// How a `MemoryBackend` context behaves once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryPlayback {
    /// Report completion immediately
    Instant,
    /// Report completion after the buffer's duration
    Realtime,
    /// Never report completion
    Stall,
    /// Fail in `start`
    FailStart,
}

/// Counters and rendered buffers shared by all contexts of a `MemoryBackend`.
#[derive(Debug, Default)]
pub struct MemoryLog {
    pub opened: usize,
    pub closed: usize,
    pub rendered: Vec<DecodedAudioBuffer>,
}

/// In-memory output backend.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    mode: MemoryPlayback,
    log: Arc<Mutex<MemoryLog>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(MemoryPlayback::Instant)
    }
}

impl MemoryBackend {
    pub fn new(mode: MemoryPlayback) -> Self {
        Self {
            mode,
            log: Arc::new(Mutex::new(MemoryLog::default())),
        }
    }

    pub async fn opened(&self) -> usize {
        self.log.lock().await.opened
    }

    pub async fn closed(&self) -> usize {
        self.log.lock().await.closed
    }

    pub async fn rendered(&self) -> Vec<DecodedAudioBuffer> {
        self.log.lock().await.rendered.clone()
    }
}

#[async_trait::async_trait]
impl PlaybackBackend for MemoryBackend {
    async fn open(
        &self,
        _sample_rate: u32,
        _channels: u16,
    ) -> Result<Box<dyn PlaybackContext>, PlaybackError> {
        self.log.lock().await.opened += 1;

        Ok(Box::new(MemoryContext {
            mode: self.mode,
            log: Arc::clone(&self.log),
            playing: None,
            closed: false,
        }))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

struct MemoryContext {
    mode: MemoryPlayback,
    log: Arc<Mutex<MemoryLog>>,
    playing: Option<Duration>,
    closed: bool,
}

#[async_trait::async_trait]
impl PlaybackContext for MemoryContext {
    async fn start(&mut self, buffer: DecodedAudioBuffer) -> Result<(), PlaybackError> {
        if self.mode == MemoryPlayback::FailStart {
            return Err(PlaybackError::Output("output device rejected buffer".into()));
        }

        self.playing = Some(buffer.duration());
        self.log.lock().await.rendered.push(buffer);
        Ok(())
    }

    async fn finished(&mut self) {
        match (self.mode, self.playing) {
            (MemoryPlayback::Realtime, Some(duration)) => tokio::time::sleep(duration).await,
            (MemoryPlayback::Stall, _) => std::future::pending::<()>().await,
            _ => {}
        }
    }

    async fn close(&mut self) -> Result<(), PlaybackError> {
        if !self.closed {
            self.closed = true;
            self.log.lock().await.closed += 1;
        }
        Ok(())
    }
}
