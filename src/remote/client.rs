use serde_json::json;
use tracing::{debug, info, warn};

use crate::audio::payload::strip_data_uri_header;
use crate::config::GeminiConfig;
use crate::error::RemoteCallError;

use super::messages::{
    ApiErrorBody, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
    SpeechEvaluation,
};

/// Turns text into headerless base64 PCM (24kHz, mono, 16-bit).
#[async_trait::async_trait]
pub trait SynthesisClient: Send + Sync {
    /// `Ok(None)` when the provider answered without audio
    async fn synthesize(&self, text: &str) -> Result<Option<String>, RemoteCallError>;
}

/// Grades a recorded attempt at a target phrase.
#[async_trait::async_trait]
pub trait EvaluationClient: Send + Sync {
    /// `audio` may carry a data-URI header; it is stripped before upload.
    async fn evaluate(&self, target: &str, audio: &str) -> Result<SpeechEvaluation, RemoteCallError>;
}

const TUTOR_INSTRUCTION: &str = "You are a helpful language tutor. Output strictly valid JSON.";

fn evaluation_prompt(target: &str) -> String {
    format!(
        "Analyze the user's pronunciation of the word/phrase: \"{}\".\n\
         Focus on clarity, intonation, and phoneme accuracy.\n\
         Provide a score (0-100), identify any mispronounced sounds, and give a helpful tip.\n\
         Be encouraging but precise.",
        target
    )
}

fn evaluation_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "score": { "type": "NUMBER" },
            "feedback": { "type": "STRING" },
            "mispronouncedPhonemes": { "type": "ARRAY", "items": { "type": "STRING" } },
            "improvementTip": { "type": "STRING" }
        },
        "required": ["score", "feedback", "mispronouncedPhonemes", "improvementTip"]
    })
}

/// Client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
    api_key: String,
}

impl GeminiClient {
    /// Key from the config, falling back to the `API_KEY` environment variable.
    pub fn new(config: GeminiConfig) -> Result<Self, RemoteCallError> {
        let api_key = config.resolved_api_key();
        Self::with_api_key(config, api_key)
    }

    fn with_api_key(config: GeminiConfig, api_key: Option<String>) -> Result<Self, RemoteCallError> {
        let api_key = api_key.ok_or(RemoteCallError::MissingApiKey)?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        info!(
            "Gemini client ready ({}, tts={}, text={})",
            config.base_url, config.tts_model, config.text_model
        );

        Ok(Self {
            http,
            config,
            api_key,
        })
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, RemoteCallError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            warn!("{} returned {}: {}", model, status, message);
            return Err(RemoteCallError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<GenerateContentResponse>().await?)
    }
}

#[async_trait::async_trait]
impl SynthesisClient for GeminiClient {
    async fn synthesize(&self, text: &str) -> Result<Option<String>, RemoteCallError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: None,
                parts: vec![Part::text(text)],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(json!({
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": self.config.voice }
                    }
                })),
                ..Default::default()
            }),
        };

        let response = self.generate(&self.config.tts_model, &request).await?;
        let audio = response.first_inline_data().map(str::to_string);

        match &audio {
            Some(data) => info!("Synthesized {} chars into {} base64 bytes", text.len(), data.len()),
            None => warn!("Synthesis returned no audio for {:?}", text),
        }

        Ok(audio)
    }
}

#[async_trait::async_trait]
impl EvaluationClient for GeminiClient {
    async fn evaluate(&self, target: &str, audio: &str) -> Result<SpeechEvaluation, RemoteCallError> {
        let body = strip_data_uri_header(audio);

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::inline(self.config.recording_mime.clone(), body),
                    Part::text(format!("{}\n{}", TUTOR_INSTRUCTION, evaluation_prompt(target))),
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(evaluation_schema()),
                ..Default::default()
            }),
        };

        let response = self.generate(&self.config.text_model, &request).await?;
        let text = response.text().unwrap_or_else(|| "{}".to_string());

        let evaluation = serde_json::from_str::<SpeechEvaluation>(&text)?.validated()?;

        info!(
            "Evaluated {:?}: score {} ({} flagged phonemes)",
            target,
            evaluation.score,
            evaluation.mispronounced_phonemes.len()
        );

        Ok(evaluation)
    }
}
