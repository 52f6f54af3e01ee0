// Tests for the base64 transport codec
//
// Recorded audio and synthesized audio both cross the wire as base64 text;
// these tests pin down lossless round-trips and whole-input failure.

use vocab_tutor::audio::codec;
use vocab_tutor::DecodeError;

#[test]
fn test_round_trip_empty() {
    let encoded = codec::encode(&[]);
    assert_eq!(encoded, "");
    assert_eq!(codec::decode(&encoded).unwrap(), Vec::<u8>::new());
}

#[test]
fn test_round_trip_single_byte() {
    let encoded = codec::encode(&[0xFF]);
    assert_eq!(encoded, "/w==");
    assert_eq!(codec::decode(&encoded).unwrap(), vec![0xFF]);
}

#[test]
fn test_round_trip_multi_kilobyte() {
    // 8 KiB covering every byte value
    let original: Vec<u8> = (0..8192u32).map(|i| (i * 31 % 256) as u8).collect();

    let encoded = codec::encode(&original);
    assert!(!encoded.contains('\n'), "Encoding must not wrap lines");

    let decoded = codec::decode(&encoded).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_decode_malformed_fails_whole_input() {
    // Valid prefix followed by an illegal character
    let result = codec::decode("QUJDREVG*");
    assert!(matches!(result, Err(DecodeError::Base64(_))));
}

#[test]
fn test_decode_rejects_url_safe_alphabet() {
    // '-' and '_' belong to the URL-safe alphabet, not the standard one
    assert!(codec::decode("-_-_").is_err());
}
