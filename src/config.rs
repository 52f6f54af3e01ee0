use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::audio::pcm::DEFAULT_SAMPLE_RATE;
use crate::capture::{CaptureConfig, DEFAULT_CHUNK_BYTES, DEFAULT_CONTAINER_MIME};

/// Environment variables override file settings, e.g. `VOCAB_TUTOR__GEMINI__VOICE=Kore`.
const ENV_PREFIX: &str = "VOCAB_TUTOR";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub gemini: GeminiConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "vocab-tutor".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Rate of headerless PCM from the synthesis provider
    pub sample_rate: u32,
    /// Where the WAV playback sink renders audio
    pub playback_dir: PathBuf,
    /// Extra time past a buffer's duration before its context is force-closed
    pub close_grace_ms: u64,
    pub container_mime: String,
    pub flush_timeout_ms: u64,
    /// Slice size used when streaming a recording from disk
    pub chunk_bytes: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            playback_dir: PathBuf::from("playback"),
            close_grace_ms: 500,
            container_mime: DEFAULT_CONTAINER_MIME.to_string(),
            flush_timeout_ms: 5000,
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        }
    }
}

impl AudioConfig {
    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            container_mime: self.container_mime.clone(),
            flush_timeout: Duration::from_millis(self.flush_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    /// Falls back to the `API_KEY` environment variable
    pub api_key: Option<String>,
    pub text_model: String,
    pub tts_model: String,
    pub voice: String,
    /// Codec tag sent alongside uploaded recordings
    pub recording_mime: String,
    pub request_timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            text_model: "gemini-3-flash-preview".to_string(),
            tts_model: "gemini-2.5-flash-preview-tts".to_string(),
            voice: "Puck".to_string(),
            recording_mime: "audio/webm; codecs=opus".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl GeminiConfig {
    /// Configured key, else the `API_KEY` environment variable
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key_or(std::env::var("API_KEY").ok())
    }

    /// Configured key, else `fallback`. Empty keys count as missing.
    pub fn api_key_or(&self, fallback: Option<String>) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| fallback.filter(|k| !k.is_empty()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let cfg = Config::load("does/not/exist/vocab-tutor").unwrap();
        assert_eq!(cfg.service.name, "vocab-tutor");
        assert_eq!(cfg.audio.sample_rate, 24000);
        assert_eq!(cfg.audio.container_mime, "audio/webm");
        assert_eq!(cfg.gemini.voice, "Puck");
        assert_eq!(cfg.gemini.recording_mime, "audio/webm; codecs=opus");
    }

    #[test]
    fn test_partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutor.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[audio]\nclose_grace_ms = 50\n\n[gemini]\nvoice = \"Kore\"").unwrap();

        let cfg = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.audio.close_grace(), Duration::from_millis(50));
        assert_eq!(cfg.audio.flush_timeout_ms, 5000);
        assert_eq!(cfg.gemini.voice, "Kore");
        assert_eq!(cfg.gemini.tts_model, "gemini-2.5-flash-preview-tts");
    }

    #[test]
    fn test_api_key_fallback() {
        let configured = GeminiConfig {
            api_key: Some("from-file".to_string()),
            ..Default::default()
        };
        assert_eq!(
            configured.api_key_or(Some("from-env".to_string())).as_deref(),
            Some("from-file")
        );

        let blank = GeminiConfig {
            api_key: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            blank.api_key_or(Some("from-env".to_string())).as_deref(),
            Some("from-env")
        );
        assert_eq!(blank.api_key_or(Some(String::new())), None);
        assert_eq!(blank.api_key_or(None), None);
    }
}
