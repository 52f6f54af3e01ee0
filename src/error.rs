use thiserror::Error;

/// Errors raised while acquiring or driving a capture device.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("capture device not available: {0}")]
    DeviceUnavailable(String),

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("capture device error: {0}")]
    Device(String),

    #[error("finalization failed: {0}")]
    Finalization(String),
}

impl CaptureError {
    /// True for the errors that mean the microphone could not be acquired at all.
    pub fn is_permission_error(&self) -> bool {
        matches!(
            self,
            CaptureError::PermissionDenied | CaptureError::DeviceUnavailable(_)
        )
    }
}

/// Malformed base64, data-URI or container payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("malformed data URI: {0}")]
    MalformedDataUri(String),

    #[error("container decode failed: {0}")]
    Container(String),

    #[error("payload has no decodable audio track")]
    NoAudioTrack,
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("audio output error: {0}")]
    Output(String),
}

/// Failures talking to the synthesis / evaluation provider.
#[derive(Debug, Error)]
pub enum RemoteCallError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no API key configured")]
    MissingApiKey,
}

impl From<serde_json::Error> for RemoteCallError {
    fn from(e: serde_json::Error) -> Self {
        RemoteCallError::InvalidResponse(e.to_string())
    }
}
