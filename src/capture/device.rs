use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::CaptureError;

/// A slice of encoded audio as emitted by the capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    /// Position in capture order, starting at 0
    pub sequence: u64,
    /// Opaque encoded bytes
    pub data: Vec<u8>,
}

/// Microphone capture device
///
/// The device owns the hardware handle. Chunks are delivered in capture
/// order over the channel returned by `acquire`; the device closes that
/// channel once it has flushed its last chunk after `request_stop`.
#[async_trait::async_trait]
pub trait CaptureDevice: Send {
    /// Acquire the microphone and begin capturing
    async fn acquire(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError>;

    /// Ask the device to flush remaining data and close the chunk channel
    async fn request_stop(&mut self) -> Result<(), CaptureError>;

    /// Stop all tracks and free the hardware. Must be idempotent.
    fn release(&mut self);

    /// Whether the hardware is currently held
    fn is_acquired(&self) -> bool;

    /// Device name for logging
    fn name(&self) -> &str;
}

/// Device that replays a fixed list of chunks.
///
/// All chunks are queued as soon as the device is acquired, and the channel
/// closes on `request_stop`. Handy for tests and for replaying a recording
/// that was captured elsewhere.
#[derive(Debug)]
pub struct ScriptedDevice {
    chunks: Vec<Vec<u8>>,
    deny_permission: bool,
    fail_stop: bool,
    sender: Option<mpsc::Sender<AudioChunk>>,
    released: Arc<AtomicBool>,
    acquired: bool,
}

impl ScriptedDevice {
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            deny_permission: false,
            fail_stop: false,
            sender: None,
            released: Arc::new(AtomicBool::new(false)),
            acquired: false,
        }
    }

    /// A device whose acquisition is always refused
    pub fn denied() -> Self {
        Self {
            deny_permission: true,
            ..Self::new(Vec::new())
        }
    }

    /// Make `request_stop` fail after the device was acquired
    pub fn with_failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// Flag set whenever the hardware is released
    pub fn release_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }
}

#[async_trait::async_trait]
impl CaptureDevice for ScriptedDevice {
    async fn acquire(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        if self.deny_permission {
            return Err(CaptureError::PermissionDenied);
        }
        if self.acquired {
            return Err(CaptureError::Device("device busy".into()));
        }

        let (tx, rx) = mpsc::channel(self.chunks.len().max(1));
        for (sequence, data) in self.chunks.iter().enumerate() {
            tx.send(AudioChunk {
                sequence: sequence as u64,
                data: data.clone(),
            })
            .await
            .map_err(|e| CaptureError::Device(e.to_string()))?;
        }

        self.sender = Some(tx);
        self.acquired = true;
        self.released.store(false, Ordering::SeqCst);

        debug!("Scripted device acquired ({} chunks queued)", self.chunks.len());

        Ok(rx)
    }

    async fn request_stop(&mut self) -> Result<(), CaptureError> {
        if self.fail_stop {
            return Err(CaptureError::Device("flush failed".into()));
        }
        // Dropping the sender closes the channel after the queued chunks
        self.sender = None;
        Ok(())
    }

    fn release(&mut self) {
        self.sender = None;
        self.acquired = false;
        self.released.store(true, Ordering::SeqCst);
    }

    fn is_acquired(&self) -> bool {
        self.acquired
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Default slice size for `FileDevice`.
pub const DEFAULT_CHUNK_BYTES: usize = 4096;

/// Streams an already-encoded recording from disk as if it were being
/// captured live.
///
/// Chunks are emitted in order. `request_stop` flushes whatever is left of
/// the file before the channel closes; `release` abandons the rest.
#[derive(Debug)]
pub struct FileDevice {
    path: PathBuf,
    chunk_bytes: usize,
    stop_tx: Option<oneshot::Sender<()>>,
    producer: Option<JoinHandle<()>>,
}

impl FileDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            stop_tx: None,
            producer: None,
        }
    }

    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self
    }
}

#[async_trait::async_trait]
impl CaptureDevice for FileDevice {
    async fn acquire(&mut self) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        if self.is_acquired() {
            return Err(CaptureError::Device("device busy".into()));
        }

        let bytes = tokio::fs::read(&self.path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied,
            _ => CaptureError::DeviceUnavailable(format!("{}: {}", self.path.display(), e)),
        })?;

        info!(
            "Capturing from {} ({} bytes, {} byte chunks)",
            self.path.display(),
            bytes.len(),
            self.chunk_bytes
        );

        let (tx, rx) = mpsc::channel(16);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let chunk_bytes = self.chunk_bytes;

        let producer = tokio::spawn(async move {
            for (sequence, data) in bytes.chunks(chunk_bytes).enumerate() {
                let chunk = AudioChunk {
                    sequence: sequence as u64,
                    data: data.to_vec(),
                };
                if tx.send(chunk).await.is_err() {
                    warn!("Chunk receiver dropped, stopping file capture");
                    return;
                }
            }

            // End of file: keep the channel open until stop is requested
            let _ = stop_rx.await;
            debug!("File capture flushed");
        });

        self.stop_tx = Some(stop_tx);
        self.producer = Some(producer);

        Ok(rx)
    }

    async fn request_stop(&mut self) -> Result<(), CaptureError> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        Ok(())
    }

    fn release(&mut self) {
        self.stop_tx = None;
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }

    fn is_acquired(&self) -> bool {
        self.producer.is_some()
    }

    fn name(&self) -> &str {
        "file"
    }
}
