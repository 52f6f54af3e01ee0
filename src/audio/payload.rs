//! Classification of base64 audio payloads.
//!
//! A payload is either a self-describing data URI (`data:audio/...;base64,...`)
//! or a headerless base64 string carrying raw 24kHz mono PCM. The two are told
//! apart by their leading characters only.

use crate::error::DecodeError;

use super::codec;

/// Prefix that marks a self-describing audio payload.
pub const DATA_URI_AUDIO_PREFIX: &str = "data:audio";

const DATA_SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Container audio with an embedded mime type
    DataUri,
    /// Headerless raw PCM
    RawPcm,
}

impl PayloadKind {
    pub fn classify(payload: &str) -> Self {
        if payload.starts_with(DATA_URI_AUDIO_PREFIX) {
            PayloadKind::DataUri
        } else {
            PayloadKind::RawPcm
        }
    }
}

/// A parsed `data:<mime>;base64,<body>` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri<'a> {
    /// Mime type including any parameters, e.g. `audio/webm;codecs=opus`
    pub mime_type: &'a str,
    /// Base64 body
    pub data: &'a str,
}

impl<'a> DataUri<'a> {
    pub fn parse(payload: &'a str) -> Result<Self, DecodeError> {
        let rest = payload
            .strip_prefix(DATA_SCHEME)
            .ok_or_else(|| DecodeError::MalformedDataUri("missing data: scheme".into()))?;

        let (mime_type, data) = rest
            .split_once(BASE64_MARKER)
            .ok_or_else(|| DecodeError::MalformedDataUri("missing ;base64, marker".into()))?;

        if mime_type.is_empty() {
            return Err(DecodeError::MalformedDataUri("empty mime type".into()));
        }

        Ok(Self { mime_type, data })
    }

    /// Mime type without parameters (`audio/webm;codecs=opus` -> `audio/webm`).
    pub fn essence(&self) -> &'a str {
        self.mime_type
            .split(';')
            .next()
            .unwrap_or(self.mime_type)
            .trim()
    }

    pub fn decode(&self) -> Result<Vec<u8>, DecodeError> {
        codec::decode(self.data)
    }
}

/// Wrap encoded bytes in a self-describing data URI.
pub fn to_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("{DATA_SCHEME}{mime_type}{BASE64_MARKER}{}", codec::encode(bytes))
}

/// Drop a leading `data:...;base64,` header, leaving the bare base64 body.
///
/// Strings without a header come back unchanged.
pub fn strip_data_uri_header(payload: &str) -> &str {
    match DataUri::parse(payload) {
        Ok(uri) => uri.data,
        Err(_) => payload,
    }
}
