//! Multimodal emotion decision engine.
//!
//! Combines voice and face emotion predictions into a single verdict for
//! music recommendation: a quality gate filters low-information audio, a
//! compatibility matrix scores cross-modal agreement, and an orchestrator
//! picks the best available resolution path per request.

pub mod audio;
pub mod compat;
pub mod config;
pub mod emotion;
pub mod error;
pub mod fusion;
pub mod orchestrator;
pub mod valence;

pub use audio::{AudioQualityGate, AudioQualityReport, QualityVerdict};
pub use compat::CompatibilityMatrix;
pub use config::{EngineConfig, FusionWeights, QualityThresholds};
pub use emotion::{EmotionDistribution, EmotionLabel};
pub use error::EngineError;
pub use fusion::{AgreementTier, FusionEngine, FusionVerdict, Modality, ModalityPrediction};
pub use orchestrator::{
    AnalysisMode, AnalysisOutcome, AnalysisRequest, EmotionOrchestrator, FacePredictor,
    FusionPredictor, ImageFrame, VoicePredictor,
};
