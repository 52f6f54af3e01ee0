use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use vocab_tutor::audio::PcmDecoder;
use vocab_tutor::{
    CaptureSession, Config, FileDevice, GeminiClient, PlaybackEngine, PracticeSession,
    PracticeTarget, SynthesisClient, WavFileBackend,
};

#[derive(Parser)]
#[command(name = "vocab-tutor", about = "Pronunciation practice against a generative-AI tutor")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/vocab-tutor")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize text and render it through the playback sink
    Speak { text: String },

    /// Play a base64 payload (data URI or raw PCM) read from a file
    Play { payload: PathBuf },

    /// Grade a recorded attempt at a phrase
    Evaluate {
        #[arg(long)]
        phrase: String,
        recording: PathBuf,
    },

    /// Listen to the reference, then grade a recorded attempt
    Practice {
        #[arg(long)]
        phrase: String,
        #[arg(long)]
        example: Option<String>,
        recording: PathBuf,
    },
}

fn playback_engine(cfg: &Config) -> Result<PlaybackEngine> {
    let backend = WavFileBackend::new(&cfg.audio.playback_dir)
        .context("Failed to create playback sink")?;

    Ok(PlaybackEngine::new(Arc::new(backend))
        .with_pcm_decoder(PcmDecoder::with_sample_rate(cfg.audio.sample_rate))
        .with_close_grace(cfg.audio.close_grace()))
}

async fn run_practice(
    cfg: &Config,
    target: PracticeTarget,
    recording: PathBuf,
    listen_first: bool,
) -> Result<()> {
    let client = Arc::new(GeminiClient::new(cfg.gemini.clone()).context("Failed to create Gemini client")?);

    let device = FileDevice::new(recording).with_chunk_bytes(cfg.audio.chunk_bytes);
    let capture = CaptureSession::new(device, cfg.audio.capture_config());

    let mut session = PracticeSession::new(
        target,
        capture,
        playback_engine(cfg)?,
        client.clone(),
        client,
    );

    if listen_first {
        match session.listen().await {
            Some(handle) => handle.wait_closed().await?,
            None => warn!("Reference audio unavailable"),
        }
    }

    session
        .start_recording()
        .await
        .context("Microphone access denied or not available")?;

    match session.stop_and_evaluate().await {
        Some(evaluation) => println!("{}", serde_json::to_string_pretty(evaluation)?),
        None => warn!("No evaluation available"),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Speak { text } => {
            let client = GeminiClient::new(cfg.gemini.clone())?;
            match client.synthesize(&text).await? {
                Some(audio) => {
                    let handle = playback_engine(&cfg)?.play(&audio).await?;
                    info!("Playing {:.2}s of audio", handle.duration().as_secs_f64());
                    handle.wait_closed().await?;
                }
                None => warn!("Provider returned no audio"),
            }
        }

        Command::Play { payload } => {
            let text = tokio::fs::read_to_string(&payload)
                .await
                .with_context(|| format!("Failed to read payload {:?}", payload))?;
            let handle = playback_engine(&cfg)?.play(text.trim()).await?;
            handle.wait_closed().await?;
        }

        Command::Evaluate { phrase, recording } => {
            run_practice(&cfg, PracticeTarget::new(phrase), recording, false).await?;
        }

        Command::Practice {
            phrase,
            example,
            recording,
        } => {
            let mut target = PracticeTarget::new(phrase);
            if let Some(example) = example {
                target = target.with_example(example);
            }
            run_practice(&cfg, target, recording, true).await?;
        }
    }

    Ok(())
}
