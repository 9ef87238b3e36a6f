//! Orchestration of the emotion decision chain.
//!
//! Given whatever inputs and predictors are actually available, picks one
//! resolution path per request, evaluated as an ordered priority list:
//!
//! 1. no audio and no frames: terminal failure
//! 2. learned joint audio-video model (when loaded and both inputs exist);
//!    authoritative on success, the rule-based merge is bypassed
//! 3. rule-based merge of voice + face predictions
//! 4. voice-only
//! 5. face-only
//!
//! The policy is asymmetric on purpose: voice is the trusted-by-default
//! signal and its failures propagate, while a face failure is never
//! terminal and is replaced by a canned neutral prediction with a warning.
//!
//! Predictors are injected at construction, so the whole tree is testable
//! with fakes and there are no process-wide model caches.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::audio::AudioQualityGate;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fusion::{FusionEngine, FusionVerdict, Modality, ModalityPrediction};

/// Opaque image payload handed to the face and fusion predictors.
/// The engine never inspects pixels; frame decoding belongs to the caller.
#[derive(Debug, Clone)]
pub struct ImageFrame {
    pub data: Vec<u8>,
}

impl ImageFrame {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

/// Voice emotion model contract. Failures propagate to the caller.
pub trait VoicePredictor: Send + Sync {
    fn predict(&self, audio: &[f32], sample_rate: u32) -> Result<ModalityPrediction, EngineError>;
}

/// Face emotion model contract. Failures are recovered by the orchestrator
/// into a neutral fallback, never surfaced.
pub trait FacePredictor: Send + Sync {
    fn predict(&self, frame: &ImageFrame) -> Result<ModalityPrediction, EngineError>;
}

/// Learned joint audio-video model contract. Optional; `available()` gates
/// whether it is attempted at all.
pub trait FusionPredictor: Send + Sync {
    fn available(&self) -> bool;
    fn predict(
        &self,
        audio: &[f32],
        sample_rate: u32,
        frames: &[ImageFrame],
    ) -> Result<ModalityPrediction, EngineError>;
}

/// One analysis request: whatever the caller managed to decode
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisRequest<'a> {
    pub audio: Option<&'a [f32]>,
    pub sample_rate: u32,
    pub frames: &'a [ImageFrame],
}

impl AnalysisRequest<'_> {
    pub fn has_audio(&self) -> bool {
        self.audio.map_or(false, |a| !a.is_empty())
    }

    pub fn has_frames(&self) -> bool {
        !self.frames.is_empty()
    }
}

/// Which resolution path produced the verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisMode {
    Fusion,
    Multimodal,
    VoiceOnly,
    FaceOnly,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fusion => "fusion",
            Self::Multimodal => "multimodal",
            Self::VoiceOnly => "voice-only",
            Self::FaceOnly => "face-only",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub mode: AnalysisMode,
    pub verdict: FusionVerdict,
}

pub struct EmotionOrchestrator {
    gate: AudioQualityGate,
    engine: FusionEngine,
    voice: Option<Box<dyn VoicePredictor>>,
    face: Option<Box<dyn FacePredictor>>,
    fusion: Option<Box<dyn FusionPredictor>>,
}

impl EmotionOrchestrator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            gate: AudioQualityGate::new(config.quality),
            engine: FusionEngine::new(config),
            voice: None,
            face: None,
            fusion: None,
        }
    }

    pub fn with_voice(mut self, predictor: Box<dyn VoicePredictor>) -> Self {
        self.voice = Some(predictor);
        self
    }

    pub fn with_face(mut self, predictor: Box<dyn FacePredictor>) -> Self {
        self.face = Some(predictor);
        self
    }

    pub fn with_fusion(mut self, predictor: Box<dyn FusionPredictor>) -> Self {
        self.fusion = Some(predictor);
        self
    }

    /// Run the decision chain end-to-end for one request
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome, EngineError> {
        let has_audio = request.has_audio();
        let has_frames = request.has_frames();

        if !has_audio && !has_frames {
            return Err(EngineError::NoUsableInput);
        }

        // Learned joint model first; when it runs it is authoritative
        if has_audio && has_frames {
            if let Some(fusion) = &self.fusion {
                if fusion.available() {
                    let audio = request.audio.unwrap_or_default();
                    match fusion.predict(audio, request.sample_rate, request.frames) {
                        Ok(pred) => {
                            info!(
                                "Fusion model verdict: {} ({:.1}%)",
                                pred.label,
                                pred.confidence * 100.0
                            );
                            return Ok(AnalysisOutcome {
                                mode: AnalysisMode::Fusion,
                                verdict: FusionVerdict::from_fusion_model(&pred),
                            });
                        }
                        Err(e) => {
                            warn!("Fusion model failed, falling back to rule-based merge: {}", e);
                        }
                    }
                }
            }
        }

        let voice_result = self.attempt_voice(request, has_audio);
        let face_prediction = self.attempt_face(request, has_frames);

        match (voice_result, face_prediction) {
            (Some(Ok(voice)), Some(face)) => {
                debug!("Merging voice and face predictions");
                let verdict = self.engine.merge(&voice, &face)?;
                Ok(AnalysisOutcome {
                    mode: AnalysisMode::Multimodal,
                    verdict,
                })
            }
            (Some(Ok(voice)), None) => {
                info!("No video frames; voice-only result: {}", voice.label);
                Ok(AnalysisOutcome {
                    mode: AnalysisMode::VoiceOnly,
                    verdict: FusionVerdict::from_single_modality(
                        &voice,
                        "No video frames; voice-only result",
                    ),
                })
            }
            (Some(Err(e)), Some(face)) => {
                warn!("Voice analysis failed ({}); using face-only result", e);
                Ok(AnalysisOutcome {
                    mode: AnalysisMode::FaceOnly,
                    verdict: FusionVerdict::from_single_modality(
                        &face,
                        "Voice analysis failed; face-only result",
                    ),
                })
            }
            (None, Some(face)) => {
                info!("No audio; face-only result: {}", face.label);
                Ok(AnalysisOutcome {
                    mode: AnalysisMode::FaceOnly,
                    verdict: FusionVerdict::from_single_modality(
                        &face,
                        "No audio; face-only result",
                    ),
                })
            }
            (Some(Err(e)), None) => Err(e),
            (None, None) => Err(EngineError::NoUsableInput),
        }
    }

    /// Voice branch: quality gate first, real inference only on reliable
    /// audio. A gate rejection is a successful degraded prediction, not an
    /// error; predictor errors are real failures of this branch.
    fn attempt_voice(
        &self,
        request: &AnalysisRequest,
        has_audio: bool,
    ) -> Option<Result<ModalityPrediction, EngineError>> {
        if !has_audio {
            return None;
        }
        let audio = request.audio.unwrap_or_default();

        let quality = self.gate.assess(audio, request.sample_rate);
        if let Some(fallback) = quality.fallback {
            debug!("Quality gate rejected audio; substituting neutral fallback");
            return Some(Ok(fallback));
        }

        match &self.voice {
            Some(predictor) => Some(predictor.predict(audio, request.sample_rate)),
            None => Some(Err(EngineError::ModelUnavailable(Modality::Voice))),
        }
    }

    /// Face branch: best-effort, never fails. Detection runs on the middle
    /// frame; any failure (or a missing predictor) becomes the canned
    /// neutral fallback with the reason attached as a warning.
    fn attempt_face(
        &self,
        request: &AnalysisRequest,
        has_frames: bool,
    ) -> Option<ModalityPrediction> {
        if !has_frames {
            return None;
        }
        let frame = &request.frames[request.frames.len() / 2];

        let prediction = match &self.face {
            Some(predictor) => match predictor.predict(frame) {
                Ok(pred) => pred,
                Err(e) => {
                    warn!("Face detection failed, using neutral: {}", e);
                    ModalityPrediction::neutral_face_fallback(e.to_string())
                }
            },
            None => ModalityPrediction::neutral_face_fallback("face predictor is not available"),
        };
        Some(prediction)
    }
}
