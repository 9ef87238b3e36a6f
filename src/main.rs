use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use mood_engine::{
    AnalysisRequest, EmotionDistribution, EmotionLabel, EmotionOrchestrator, EngineConfig,
    EngineError, FacePredictor, FusionPredictor, ImageFrame, Modality, ModalityPrediction,
    VoicePredictor,
};

/// Headless CLI for multimodal emotion analysis
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a WAV clip to analyze
    #[arg(short, long)]
    wav: Option<PathBuf>,

    /// Path to an image frame (passed to the face model as-is)
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// JSON file with a precomputed voice prediction
    #[arg(long)]
    voice_json: Option<PathBuf>,

    /// JSON file with a precomputed face prediction
    #[arg(long)]
    face_json: Option<PathBuf>,

    /// JSON file with a precomputed joint audio-video prediction
    #[arg(long)]
    fusion_json: Option<PathBuf>,

    /// Path to the config file (defaults to ~/.mood-engine/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the voice modality weight
    #[arg(long)]
    voice_weight: Option<f32>,

    /// Override the face modality weight
    #[arg(long)]
    face_weight: Option<f32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Prediction file format: `{"emotion": "happy", "confidence": 0.8,
/// "all_emotions": {"happy": 0.8, "neutral": 0.2}}`
#[derive(Debug, Deserialize)]
struct PredictionFile {
    emotion: String,
    confidence: f32,
    all_emotions: Option<BTreeMap<String, f32>>,
}

impl PredictionFile {
    fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prediction file {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse prediction file {:?}", path))
    }

    fn into_prediction(self, modality: Modality) -> ModalityPrediction {
        let label = EmotionLabel::parse(&self.emotion);
        let distribution = match self.all_emotions {
            Some(map) => map
                .into_iter()
                .map(|(name, p)| (EmotionLabel::parse(&name), p))
                .collect(),
            None => EmotionDistribution::from([(label.clone(), self.confidence)]),
        };
        ModalityPrediction::new(modality, label, self.confidence, distribution)
    }
}

/// Serves a prediction loaded from disk; stands in for a live voice model
struct FileVoicePredictor {
    prediction: ModalityPrediction,
}

impl VoicePredictor for FileVoicePredictor {
    fn predict(&self, _audio: &[f32], _sample_rate: u32) -> Result<ModalityPrediction, EngineError> {
        Ok(self.prediction.clone())
    }
}

struct FileFacePredictor {
    prediction: ModalityPrediction,
}

impl FacePredictor for FileFacePredictor {
    fn predict(&self, _frame: &ImageFrame) -> Result<ModalityPrediction, EngineError> {
        Ok(self.prediction.clone())
    }
}

struct FileFusionPredictor {
    prediction: ModalityPrediction,
}

impl FusionPredictor for FileFusionPredictor {
    fn available(&self) -> bool {
        true
    }

    fn predict(
        &self,
        _audio: &[f32],
        _sample_rate: u32,
        _frames: &[ImageFrame],
    ) -> Result<ModalityPrediction, EngineError> {
        Ok(self.prediction.clone())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => EngineConfig::default_config_path()?,
    };
    let mut config = EngineConfig::load(&config_path)?;

    if let Some(w) = args.voice_weight {
        config.voice_weight = w;
    }
    if let Some(w) = args.face_weight {
        config.face_weight = w;
    }

    info!("Mood engine starting...");
    info!(
        "Modality weights: voice {:.2}, face {:.2}",
        config.weights().voice(),
        config.weights().face()
    );

    let mut orchestrator = EmotionOrchestrator::new(&config);

    if let Some(path) = &args.voice_json {
        let prediction = PredictionFile::load(path)?.into_prediction(Modality::Voice);
        orchestrator = orchestrator.with_voice(Box::new(FileVoicePredictor { prediction }));
    }
    if let Some(path) = &args.face_json {
        let prediction = PredictionFile::load(path)?.into_prediction(Modality::Face);
        orchestrator = orchestrator.with_face(Box::new(FileFacePredictor { prediction }));
    }
    if let Some(path) = &args.fusion_json {
        let prediction = PredictionFile::load(path)?.into_prediction(Modality::Fusion);
        orchestrator = orchestrator.with_fusion(Box::new(FileFusionPredictor { prediction }));
    }

    let audio = match &args.wav {
        Some(path) => {
            let (samples, sample_rate) = read_wav(path)?;
            info!(
                "Loaded {:?}: {} samples at {} Hz ({:.2}s)",
                path,
                samples.len(),
                sample_rate,
                samples.len() as f32 / sample_rate as f32
            );
            Some((samples, sample_rate))
        }
        None => None,
    };

    let frames = match &args.image {
        Some(path) => {
            let data = std::fs::read(path)
                .with_context(|| format!("Failed to read image {:?}", path))?;
            vec![ImageFrame::new(data)]
        }
        None => Vec::new(),
    };

    let request = AnalysisRequest {
        audio: audio.as_ref().map(|(samples, _)| samples.as_slice()),
        sample_rate: audio.as_ref().map_or(0, |(_, rate)| *rate),
        frames: &frames,
    };

    let outcome = orchestrator
        .analyze(&request)
        .context("Emotion analysis failed")?;

    if let Some(voice) = &outcome.verdict.voice_prediction {
        if let Some(warning) = &voice.warning {
            warn!("Voice: {}", warning);
        }
    }
    if let Some(face) = &outcome.verdict.face_prediction {
        if let Some(warning) = &face.warning {
            warn!("Face: {}", warning);
        }
    }

    println!("\n--- Verdict ({}) ---", outcome.mode);
    println!("{}", outcome.verdict.summary());
    println!(
        "Recommend music for: {}",
        outcome.verdict.recommendation_emotion
    );
    println!(
        "Valence {:+.3}, arousal {:+.3}",
        outcome.verdict.valence, outcome.verdict.arousal
    );

    println!("\n{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}

/// Decode a WAV file to mono f32 samples. Multi-channel input is mixed down
/// by averaging across channels per sample frame.
fn read_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file {:?}", path))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .context("Failed to decode float samples")?,
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<std::result::Result<_, _>>()
                .context("Failed to decode integer samples")?
        }
    };

    if channels <= 1 {
        return Ok((interleaved, spec.sample_rate));
    }

    let mono = interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    Ok((mono, spec.sample_rate))
}
