use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::emotion::{EmotionDistribution, EmotionLabel};
use crate::valence::compute_valence_arousal;

/// Input channel a prediction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Voice,
    Face,
    /// Learned joint audio-video model
    Fusion,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Voice => "voice",
            Self::Face => "face",
            Self::Fusion => "fusion",
        };
        f.write_str(name)
    }
}

/// One model's emotion prediction for a single inference call.
///
/// Created per call and never mutated afterwards. `warning` is set when the
/// prediction is a substituted fallback (face failure, low-information
/// audio) rather than a real model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalityPrediction {
    pub label: EmotionLabel,
    pub confidence: f32,
    pub distribution: EmotionDistribution,
    pub modality: Modality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ModalityPrediction {
    pub fn new(
        modality: Modality,
        label: EmotionLabel,
        confidence: f32,
        distribution: EmotionDistribution,
    ) -> Self {
        Self {
            label,
            confidence,
            distribution,
            modality,
            warning: None,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    /// Canned neutral prediction substituted whenever face detection fails.
    /// Face is best-effort: its failures are recovered here, never surfaced.
    pub fn neutral_face_fallback(reason: impl Into<String>) -> Self {
        Self {
            label: EmotionLabel::Neutral,
            confidence: 0.3,
            distribution: EmotionDistribution::from([(EmotionLabel::Neutral, 0.3)]),
            modality: Modality::Face,
            warning: Some(reason.into()),
        }
    }
}

/// How closely the two modality predictions concur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgreementTier {
    Strong,
    Moderate,
    Weak,
    Conflict,
    /// Verdict came from the learned joint model; no cross-modal comparison
    Fusion,
}

impl fmt::Display for AgreementTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Strong => "strong",
            Self::Moderate => "moderate",
            Self::Weak => "weak",
            Self::Conflict => "conflict",
            Self::Fusion => "fusion",
        };
        f.write_str(name)
    }
}

/// Final emotion decision for one analysis request, plus the diagnostics
/// that justify it. Produced once per orchestration call and handed to the
/// caller by value; the engine keeps nothing.
///
/// `agreement_tier` is `None` on single-modality paths, where there is no
/// second prediction to agree with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionVerdict {
    pub id: Uuid,
    pub final_emotion: EmotionLabel,
    pub final_confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement_tier: Option<AgreementTier>,
    pub agreement_score: f32,
    pub explanation: String,
    pub merged_distribution: EmotionDistribution,
    pub exact_match: bool,
    pub compatibility_score: f32,
    /// Emotion handed to the music recommender; differs from
    /// `final_emotion` only on low-confidence conflicts
    pub recommendation_emotion: EmotionLabel,
    pub valence: f32,
    pub arousal: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_prediction: Option<ModalityPrediction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_prediction: Option<ModalityPrediction>,
    pub created_at: DateTime<Utc>,
}

impl FusionVerdict {
    /// Verdict built directly from the learned joint model's prediction.
    /// The learned model, when it runs, is authoritative; nothing is merged.
    pub fn from_fusion_model(pred: &ModalityPrediction) -> Self {
        let (valence, arousal) = compute_valence_arousal(&pred.label, pred.confidence);
        Self {
            id: Uuid::new_v4(),
            final_emotion: pred.label.clone(),
            final_confidence: pred.confidence,
            agreement_tier: Some(AgreementTier::Fusion),
            agreement_score: pred.confidence,
            explanation: "Learned joint audio-video model encoded both modalities.".to_string(),
            merged_distribution: pred.distribution.clone(),
            exact_match: false,
            compatibility_score: 0.0,
            recommendation_emotion: pred.label.clone(),
            valence,
            arousal,
            voice_prediction: None,
            face_prediction: None,
            created_at: Utc::now(),
        }
    }

    /// Verdict carrying a single modality's prediction verbatim
    pub fn from_single_modality(pred: &ModalityPrediction, note: &str) -> Self {
        let (valence, arousal) = compute_valence_arousal(&pred.label, pred.confidence);
        let (voice_prediction, face_prediction) = match pred.modality {
            Modality::Voice => (Some(pred.clone()), None),
            Modality::Face => (None, Some(pred.clone())),
            Modality::Fusion => (None, None),
        };
        Self {
            id: Uuid::new_v4(),
            final_emotion: pred.label.clone(),
            final_confidence: pred.confidence,
            agreement_tier: None,
            agreement_score: pred.confidence,
            explanation: note.to_string(),
            merged_distribution: pred.distribution.clone(),
            exact_match: false,
            compatibility_score: 0.0,
            recommendation_emotion: pred.label.clone(),
            valence,
            arousal,
            voice_prediction,
            face_prediction,
            created_at: Utc::now(),
        }
    }

    fn voice_label(&self) -> &str {
        self.voice_prediction
            .as_ref()
            .map(|p| p.label.as_str())
            .unwrap_or("unknown")
    }

    fn face_label(&self) -> &str {
        self.face_prediction
            .as_ref()
            .map(|p| p.label.as_str())
            .unwrap_or("unknown")
    }

    /// One-line human-readable account of the decision
    pub fn summary(&self) -> String {
        let confidence_pct = self.final_confidence * 100.0;
        match self.agreement_tier {
            Some(AgreementTier::Strong) => format!(
                "Both models agree: {} (confidence: {:.1}%)",
                self.final_emotion, confidence_pct
            ),
            Some(AgreementTier::Moderate) => format!(
                "Models show related emotions: voice={}, face={} -> final: {} ({:.1}%)",
                self.voice_label(),
                self.face_label(),
                self.final_emotion,
                confidence_pct
            ),
            Some(AgreementTier::Weak) => format!(
                "Models show partially related emotions: voice={}, face={} -> final: {} ({:.1}%)",
                self.voice_label(),
                self.face_label(),
                self.final_emotion,
                confidence_pct
            ),
            Some(AgreementTier::Conflict) => format!(
                "Models show conflicting emotions: voice={}, face={} -> final: {} ({:.1}%)",
                self.voice_label(),
                self.face_label(),
                self.final_emotion,
                confidence_pct
            ),
            Some(AgreementTier::Fusion) => format!(
                "Joint audio-video model: {} ({:.1}%)",
                self.final_emotion, confidence_pct
            ),
            None => format!(
                "Single-modality result: {} ({:.1}%)",
                self.final_emotion, confidence_pct
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_face_fallback_shape() {
        let pred = ModalityPrediction::neutral_face_fallback("no face detected");
        assert_eq!(pred.label, EmotionLabel::Neutral);
        assert!((pred.confidence - 0.3).abs() < 1e-6);
        assert_eq!(pred.modality, Modality::Face);
        assert_eq!(pred.warning.as_deref(), Some("no face detected"));
        assert!((pred.distribution.get(&EmotionLabel::Neutral) - 0.3).abs() < 1e-6);
        assert_eq!(pred.distribution.len(), 1);
    }

    #[test]
    fn test_from_fusion_model_is_authoritative() {
        let pred = ModalityPrediction::new(
            Modality::Fusion,
            EmotionLabel::Happy,
            0.82,
            EmotionDistribution::from([(EmotionLabel::Happy, 0.82)]),
        );
        let verdict = FusionVerdict::from_fusion_model(&pred);
        assert_eq!(verdict.final_emotion, EmotionLabel::Happy);
        assert_eq!(verdict.agreement_tier, Some(AgreementTier::Fusion));
        assert!((verdict.agreement_score - 0.82).abs() < 1e-6);
        assert_eq!(verdict.recommendation_emotion, EmotionLabel::Happy);
        assert!(verdict.voice_prediction.is_none());
        assert!(verdict.face_prediction.is_none());
    }

    #[test]
    fn test_from_single_modality_slots_by_modality() {
        let voice = ModalityPrediction::new(
            Modality::Voice,
            EmotionLabel::Sad,
            0.6,
            EmotionDistribution::from([(EmotionLabel::Sad, 0.6)]),
        );
        let verdict = FusionVerdict::from_single_modality(&voice, "No video frames; voice-only result");
        assert!(verdict.voice_prediction.is_some());
        assert!(verdict.face_prediction.is_none());
        assert_eq!(verdict.agreement_tier, None);
        assert_eq!(verdict.final_emotion, EmotionLabel::Sad);
    }

    #[test]
    fn test_verdict_serializes_without_none_fields() {
        let face = ModalityPrediction::neutral_face_fallback("x");
        let verdict = FusionVerdict::from_single_modality(&face, "No audio; face-only result");
        let json = serde_json::to_string(&verdict).unwrap();
        assert!(!json.contains("agreement_tier"));
        assert!(!json.contains("voice_prediction"));
        assert!(json.contains("face_prediction"));
    }
}
