//! Base64 transport encoding (standard alphabet, padded, no line wrapping).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::DecodeError;

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode base64 text. Malformed input fails as a whole, never partially.
pub fn decode(text: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(STANDARD.decode(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_vector() {
        assert_eq!(encode(b"ABC"), "QUJD");
        assert_eq!(encode(b"AB"), "QUI=");
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("not base64!"), Err(DecodeError::Base64(_))));
        assert!(decode("QUJ").is_err()); // missing padding
    }
}
