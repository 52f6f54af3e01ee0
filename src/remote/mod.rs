//! Remote synthesis and pronunciation-evaluation collaborators.

mod client;
mod messages;

pub use client::{EvaluationClient, GeminiClient, SynthesisClient};
pub use messages::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    InlineData, Part, SpeechEvaluation, ADVANCE_SCORE, PASSING_SCORE,
};
