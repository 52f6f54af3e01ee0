//! Pronunciation practice loop
//!
//! Ties the pieces together for one target phrase:
//! - `listen`: synthesize the phrase (plus example sentence) and play it
//! - `start_recording` / `stop_and_evaluate`: capture an attempt and grade it
//!
//! Synthesis, playback and evaluation failures are logged and contained; the
//! caller only ever sees "no audio" or "no evaluation". Microphone permission
//! errors are returned so the caller can tell the user.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::audio::{PlaybackEngine, PlaybackHandle};
use crate::capture::{CaptureDevice, CaptureSession, RecordedAudio};
use crate::error::CaptureError;
use crate::remote::{EvaluationClient, SpeechEvaluation, SynthesisClient};

/// The phrase being practised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeTarget {
    pub phrase: String,
    pub example_sentence: Option<String>,
}

impl PracticeTarget {
    pub fn new(phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            example_sentence: None,
        }
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example_sentence = Some(example.into());
        self
    }

    /// Text sent to the synthesizer: "phrase. example"
    pub fn spoken_text(&self) -> String {
        match &self.example_sentence {
            Some(example) if !example.is_empty() => format!("{}. {}", self.phrase, example),
            _ => self.phrase.clone(),
        }
    }
}

pub struct PracticeSession<D: CaptureDevice> {
    target: PracticeTarget,
    capture: CaptureSession<D>,
    playback: PlaybackEngine,
    synthesizer: Arc<dyn SynthesisClient>,
    evaluator: Arc<dyn EvaluationClient>,
    last_evaluation: Option<SpeechEvaluation>,
}

impl<D: CaptureDevice> PracticeSession<D> {
    pub fn new(
        target: PracticeTarget,
        capture: CaptureSession<D>,
        playback: PlaybackEngine,
        synthesizer: Arc<dyn SynthesisClient>,
        evaluator: Arc<dyn EvaluationClient>,
    ) -> Self {
        Self {
            target,
            capture,
            playback,
            synthesizer,
            evaluator,
            last_evaluation: None,
        }
    }

    pub fn target(&self) -> &PracticeTarget {
        &self.target
    }

    pub fn is_recording(&self) -> bool {
        self.capture.is_recording()
    }

    pub fn last_evaluation(&self) -> Option<&SpeechEvaluation> {
        self.last_evaluation.as_ref()
    }

    /// Switch to a new phrase, dropping the previous evaluation.
    pub fn set_target(&mut self, target: PracticeTarget) {
        self.target = target;
        self.last_evaluation = None;
    }

    /// Play the reference pronunciation. `None` means nothing was played.
    pub async fn listen(&self) -> Option<PlaybackHandle> {
        let text = self.target.spoken_text();

        let audio = match self.synthesizer.synthesize(&text).await {
            Ok(Some(audio)) => audio,
            Ok(None) => {
                warn!("No reference audio for {:?}", self.target.phrase);
                return None;
            }
            Err(e) => {
                error!("Synthesis failed for {:?}: {}", self.target.phrase, e);
                return None;
            }
        };

        match self.playback.play(&audio).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Error playing audio: {}", e);
                None
            }
        }
    }

    /// Replay a finished recording (data-URI path).
    pub async fn replay(&self, recording: &RecordedAudio) -> Option<PlaybackHandle> {
        match self.playback.play(&recording.to_payload()).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Error replaying recording {}: {}", recording.session_id, e);
                None
            }
        }
    }

    /// Begin capturing an attempt. Clears the previous evaluation.
    pub async fn start_recording(&mut self) -> Result<(), CaptureError> {
        self.last_evaluation = None;
        self.capture.start().await
    }

    /// Stop capturing and grade the attempt.
    ///
    /// Returns `None` when nothing was recording or the attempt could not be
    /// finalized or evaluated.
    pub async fn stop_and_evaluate(&mut self) -> Option<&SpeechEvaluation> {
        let recording = match self.capture.stop().await {
            Ok(Some(recording)) => recording,
            Ok(None) => return None,
            Err(e) => {
                error!("Recording failed: {}", e);
                return None;
            }
        };

        match self
            .evaluator
            .evaluate(&self.target.phrase, &recording.to_payload())
            .await
        {
            Ok(evaluation) => {
                info!(
                    "{:?} scored {} ({})",
                    self.target.phrase,
                    evaluation.score,
                    if evaluation.is_passing() { "passing" } else { "needs work" }
                );
                self.last_evaluation = Some(evaluation);
            }
            Err(e) => {
                error!("Eval error: {}", e);
            }
        }

        self.last_evaluation.as_ref()
    }
}
