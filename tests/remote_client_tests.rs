// Tests for the Gemini synthesis / evaluation client
//
// Runs the client against an in-process axum server standing in for the
// generateContent endpoint.

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use vocab_tutor::config::GeminiConfig;
use vocab_tutor::{EvaluationClient, GeminiClient, RemoteCallError, SynthesisClient};

#[derive(Debug, Clone)]
struct CapturedRequest {
    model: String,
    api_key: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    status: StatusCode,
    reply: Value,
}

async fn generate_content(
    State(state): State<MockState>,
    Path(model): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.requests.lock().await.push(CapturedRequest {
        model,
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    (state.status, Json(state.reply.clone()))
}

/// Start a mock provider; returns a client pointed at it and the request log
async fn mock_provider(
    status: StatusCode,
    reply: Value,
) -> Result<(GeminiClient, Arc<Mutex<Vec<CapturedRequest>>>)> {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        requests: Arc::clone(&requests),
        status,
        reply,
    };

    let app = Router::new()
        .route("/v1beta/models/:model", post(generate_content))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    let client = GeminiClient::new(GeminiConfig {
        base_url: format!("http://{}/v1beta", addr),
        api_key: Some("test-key".to_string()),
        ..GeminiConfig::default()
    })?;

    Ok((client, requests))
}

fn text_reply(text: &str) -> Value {
    json!({ "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }] })
}

#[tokio::test]
async fn test_evaluate_strips_header_and_parses_result() -> Result<()> {
    let evaluation = json!({
        "score": 92,
        "feedback": "Very clear.",
        "mispronouncedPhonemes": ["ð"],
        "improvementTip": "Touch the tongue to the teeth for 'th'."
    });
    let (client, requests) = mock_provider(StatusCode::OK, text_reply(&evaluation.to_string())).await?;

    let result = client
        .evaluate("the weather", "data:audio/webm;base64,QUJD")
        .await?;

    assert_eq!(result.score, 92.0);
    assert_eq!(result.feedback, "Very clear.");
    assert_eq!(result.mispronounced_phonemes, vec!["ð"]);
    assert!(result.is_passing());

    let requests = requests.lock().await;
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.model, "gemini-3-flash-preview:generateContent");
    assert_eq!(request.api_key.as_deref(), Some("test-key"));

    let parts = &request.body["contents"][0]["parts"];
    assert_eq!(parts[0]["inlineData"]["data"], "QUJD");
    assert_eq!(parts[0]["inlineData"]["mimeType"], "audio/webm; codecs=opus");
    assert!(parts[1]["text"].as_str().unwrap().contains("\"the weather\""));
    assert_eq!(
        request.body["generationConfig"]["responseMimeType"],
        "application/json"
    );

    Ok(())
}

#[tokio::test]
async fn test_evaluate_accepts_headerless_audio() -> Result<()> {
    let evaluation = json!({
        "score": 40,
        "feedback": "Hard to hear.",
        "mispronouncedPhonemes": [],
        "improvementTip": "Speak closer to the microphone."
    });
    let (client, requests) = mock_provider(StatusCode::OK, text_reply(&evaluation.to_string())).await?;

    let result = client.evaluate("hello", "QUJD").await?;
    assert!(!result.can_advance());

    let requests = requests.lock().await;
    assert_eq!(requests[0].body["contents"][0]["parts"][0]["inlineData"]["data"], "QUJD");

    Ok(())
}

#[tokio::test]
async fn test_evaluate_incomplete_json_is_invalid_response() -> Result<()> {
    let (client, _) = mock_provider(StatusCode::OK, json!({ "candidates": [] })).await?;

    let result = client.evaluate("hello", "QUJD").await;
    assert!(matches!(result, Err(RemoteCallError::InvalidResponse(_))));

    Ok(())
}

#[tokio::test]
async fn test_provider_error_is_api_error() -> Result<()> {
    let (client, _) = mock_provider(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": { "code": 500, "message": "backend exploded" } }),
    )
    .await?;

    match client.evaluate("hello", "QUJD").await {
        Err(RemoteCallError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "backend exploded");
        }
        other => panic!("expected API error, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_synthesize_returns_inline_audio() -> Result<()> {
    let reply = json!({
        "candidates": [{
            "content": { "parts": [{ "inlineData": { "mimeType": "audio/L16;rate=24000", "data": "AAAAAA==" } }] }
        }]
    });
    let (client, requests) = mock_provider(StatusCode::OK, reply).await?;

    let audio = client.synthesize("Serendipity. A happy accident.").await?;
    assert_eq!(audio.as_deref(), Some("AAAAAA=="));

    let requests = requests.lock().await;
    let request = &requests[0];
    assert_eq!(request.model, "gemini-2.5-flash-preview-tts:generateContent");
    assert_eq!(request.body["contents"][0]["parts"][0]["text"], "Serendipity. A happy accident.");
    assert_eq!(request.body["generationConfig"]["responseModalities"][0], "AUDIO");
    assert_eq!(
        request.body["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
        "Puck"
    );

    Ok(())
}

#[tokio::test]
async fn test_synthesize_without_audio_is_none() -> Result<()> {
    let (client, _) = mock_provider(StatusCode::OK, json!({ "candidates": [] })).await?;

    assert_eq!(client.synthesize("hello").await?, None);

    Ok(())
}
