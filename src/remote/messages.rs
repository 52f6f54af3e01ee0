use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::RemoteCallError;

/// Score at or above which an attempt counts as well pronounced.
pub const PASSING_SCORE: f64 = 80.0;

/// Score above which the learner may move on to the next word.
pub const ADVANCE_SCORE: f64 = 70.0;

/// Pronunciation grade returned by the evaluation provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechEvaluation {
    /// 0 to 100
    pub score: f64,
    pub feedback: String,
    /// Phoneme labels the provider flagged, in the order it reported them
    pub mispronounced_phonemes: Vec<String>,
    pub improvement_tip: String,
}

impl SpeechEvaluation {
    pub fn is_passing(&self) -> bool {
        self.score >= PASSING_SCORE
    }

    pub fn can_advance(&self) -> bool {
        self.score > ADVANCE_SCORE
    }

    /// Reject non-finite scores and pull out-of-range ones back into [0, 100].
    pub fn validated(mut self) -> Result<Self, RemoteCallError> {
        if !self.score.is_finite() {
            return Err(RemoteCallError::InvalidResponse(format!(
                "non-finite score: {}",
                self.score
            )));
        }
        if !(0.0..=100.0).contains(&self.score) {
            warn!("Evaluation score {} out of range, clamping", self.score);
            self.score = self.score.clamp(0.0, 100.0);
        }
        Ok(self)
    }
}

// ============================================================================
// generateContent wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 body without any data-URI header
    pub data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    fn first_part(&self) -> Option<&Part> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()
    }

    /// Inline data of the first candidate's first part
    pub fn first_inline_data(&self) -> Option<&str> {
        self.first_part()?
            .inline_data
            .as_ref()
            .map(|d| d.data.as_str())
            .filter(|d| !d.is_empty())
    }

    /// Concatenated text parts of the first candidate
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_deserializes_camel_case() {
        let json = r#"{
            "score": 85,
            "feedback": "Clear",
            "mispronouncedPhonemes": ["θ", "r"],
            "improvementTip": "Soften the r"
        }"#;
        let eval: SpeechEvaluation = serde_json::from_str(json).unwrap();
        assert_eq!(eval.score, 85.0);
        assert_eq!(eval.mispronounced_phonemes, vec!["θ", "r"]);
        assert!(eval.is_passing());
        assert!(eval.can_advance());
    }

    #[test]
    fn test_evaluation_thresholds() {
        let mut eval = SpeechEvaluation {
            score: 75.0,
            feedback: String::new(),
            mispronounced_phonemes: vec![],
            improvement_tip: String::new(),
        };
        assert!(!eval.is_passing());
        assert!(eval.can_advance());

        eval.score = 70.0;
        assert!(!eval.can_advance());
    }

    #[test]
    fn test_validated_clamps_and_rejects() {
        let eval = SpeechEvaluation {
            score: 140.0,
            feedback: String::new(),
            mispronounced_phonemes: vec![],
            improvement_tip: String::new(),
        };
        assert_eq!(eval.clone().validated().unwrap().score, 100.0);

        let nan = SpeechEvaluation {
            score: f64::NAN,
            ..eval
        };
        assert!(matches!(nan.validated(), Err(RemoteCallError::InvalidResponse(_))));
    }

    #[test]
    fn test_response_accessors() {
        let json = r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"audio/pcm","data":"AAAA"}}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.first_inline_data(), Some("AAAA"));
        assert_eq!(response.text(), None);

        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.first_inline_data(), None);
    }

    #[test]
    fn test_inline_part_serializes_camel_case() {
        let value = serde_json::to_value(Part::inline("audio/webm", "QUJD")).unwrap();
        assert_eq!(value["inlineData"]["mimeType"], "audio/webm");
        assert!(value.get("text").is_none());
    }
}
