//! Rule-based cross-modal merge.
//!
//! Combines one voice and one face prediction into a single verdict:
//! confidence-weighted union of the two probability maps, an agreement tier
//! from the compatibility matrix, and a recommendation emotion that backs
//! off to neutral when the signal is both contradictory and weak.

use tracing::{debug, info};
use uuid::Uuid;

use crate::compat::CompatibilityMatrix;
use crate::config::{EngineConfig, FusionWeights};
use crate::emotion::{EmotionDistribution, EmotionLabel};
use crate::error::EngineError;
use crate::fusion::verdict::{AgreementTier, FusionVerdict, ModalityPrediction};
use crate::valence::compute_valence_arousal;

pub struct FusionEngine {
    weights: FusionWeights,
    matrix: CompatibilityMatrix,
    moderate_min: f32,
    weak_min: f32,
    conflict_confidence_floor: f32,
}

impl FusionEngine {
    pub fn new(config: &EngineConfig) -> Self {
        let weights = config.weights();
        info!(
            "Fusion engine initialized (voice: {:.2}, face: {:.2})",
            weights.voice(),
            weights.face()
        );
        Self {
            weights,
            matrix: CompatibilityMatrix::new(),
            moderate_min: config.moderate_compatibility,
            weak_min: config.weak_compatibility,
            conflict_confidence_floor: config.conflict_confidence_floor,
        }
    }

    /// Engine with explicit weights and default tier boundaries
    pub fn with_weights(weights: FusionWeights) -> Self {
        let config = EngineConfig::default();
        Self {
            weights,
            matrix: CompatibilityMatrix::new(),
            moderate_min: config.moderate_compatibility,
            weak_min: config.weak_compatibility,
            conflict_confidence_floor: config.conflict_confidence_floor,
        }
    }

    pub fn weights(&self) -> FusionWeights {
        self.weights
    }

    /// Merge a voice and a face prediction into one verdict.
    ///
    /// Fails only when both distributions are empty; unrecognized labels
    /// degrade to zero compatibility instead of erroring.
    pub fn merge(
        &self,
        voice: &ModalityPrediction,
        face: &ModalityPrediction,
    ) -> Result<FusionVerdict, EngineError> {
        if voice.distribution.is_empty() && face.distribution.is_empty() {
            return Err(EngineError::EmptyMerge);
        }

        let exact_match = voice.label == face.label;
        let compatibility = self.matrix.get(&voice.label, &face.label);

        debug!(
            "Merging voice '{}' ({:.2}) with face '{}' ({:.2}), compatibility {:.2}",
            voice.label, voice.confidence, face.label, face.confidence, compatibility
        );

        // Weighted union of both probability maps. A face prediction with no
        // distribution contributes a point mass at its label instead.
        let mut merged = EmotionDistribution::new();
        for (label, prob) in voice.distribution.iter() {
            merged.add(label.clone(), prob * self.weights.voice());
        }
        if face.distribution.is_empty() {
            merged.add(face.label.clone(), face.confidence * self.weights.face());
        } else {
            for (label, prob) in face.distribution.iter() {
                merged.add(label.clone(), prob * self.weights.face());
            }
        }

        let (final_emotion, final_confidence) =
            merged.argmax().ok_or(EngineError::EmptyMerge)?;

        let (tier, agreement_score, explanation) = if exact_match {
            (
                AgreementTier::Strong,
                1.0,
                format!("Both voice and face agree on '{}'", final_emotion),
            )
        } else if compatibility >= self.moderate_min {
            (
                AgreementTier::Moderate,
                compatibility,
                format!(
                    "Voice detected '{}' and face detected '{}' - related emotions; merged to '{}'",
                    voice.label, face.label, final_emotion
                ),
            )
        } else if compatibility >= self.weak_min {
            (
                AgreementTier::Weak,
                compatibility,
                format!(
                    "Voice detected '{}' and face detected '{}' - partially related; merged to '{}'",
                    voice.label, face.label, final_emotion
                ),
            )
        } else {
            (
                AgreementTier::Conflict,
                compatibility,
                format!(
                    "Voice detected '{}' but face detected '{}' - conflicting emotions; merged to '{}'",
                    voice.label, face.label, final_emotion
                ),
            )
        };

        // Contradictory and weak at the same time: defer to a safe default
        // for the recommender rather than committing to a shaky label.
        let recommendation_emotion = if tier == AgreementTier::Conflict
            && final_confidence < self.conflict_confidence_floor
        {
            info!("Low confidence with conflicting predictions, recommending neutral");
            EmotionLabel::Neutral
        } else {
            final_emotion.clone()
        };

        let (valence, arousal) = compute_valence_arousal(&final_emotion, final_confidence);

        info!(
            "Merged result: {} ({:.1}%) - {} agreement",
            final_emotion,
            final_confidence * 100.0,
            tier
        );

        Ok(FusionVerdict {
            id: Uuid::new_v4(),
            final_emotion,
            final_confidence,
            agreement_tier: Some(tier),
            agreement_score,
            explanation,
            merged_distribution: merged,
            exact_match,
            compatibility_score: compatibility,
            recommendation_emotion,
            valence,
            arousal,
            voice_prediction: Some(voice.clone()),
            face_prediction: Some(face.clone()),
            created_at: chrono::Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::verdict::Modality;

    fn voice_pred(label: EmotionLabel, confidence: f32, dist: EmotionDistribution) -> ModalityPrediction {
        ModalityPrediction::new(Modality::Voice, label, confidence, dist)
    }

    fn face_pred(label: EmotionLabel, confidence: f32, dist: EmotionDistribution) -> ModalityPrediction {
        ModalityPrediction::new(Modality::Face, label, confidence, dist)
    }

    fn default_engine() -> FusionEngine {
        FusionEngine::new(&EngineConfig::default())
    }

    #[test]
    fn test_identical_predictions_are_strong() {
        let dist = EmotionDistribution::from([
            (EmotionLabel::Happy, 0.8),
            (EmotionLabel::Neutral, 0.2),
        ]);
        let engine = default_engine();
        let verdict = engine
            .merge(
                &voice_pred(EmotionLabel::Happy, 0.8, dist.clone()),
                &face_pred(EmotionLabel::Happy, 0.8, dist),
            )
            .unwrap();

        assert_eq!(verdict.agreement_tier, Some(AgreementTier::Strong));
        assert_eq!(verdict.agreement_score, 1.0);
        assert!(verdict.exact_match);
        assert_eq!(verdict.final_emotion, EmotionLabel::Happy);
        // 0.8*0.6 + 0.8*0.4 = 0.8
        assert!((verdict.final_confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_weight_normalization_three_to_one() {
        let weights = FusionWeights::new(3.0, 1.0);
        assert!((weights.voice() - 0.75).abs() < 1e-6);
        assert!((weights.face() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_fear_vs_sad_is_weak_tier() {
        // voice=fear 0.7 {fear:0.7, sad:0.2, neutral:0.1}
        // face=sad 0.6 {sad:0.6, neutral:0.4}, weights 0.6/0.4
        let engine = default_engine();
        let verdict = engine
            .merge(
                &voice_pred(
                    EmotionLabel::Fear,
                    0.7,
                    EmotionDistribution::from([
                        (EmotionLabel::Fear, 0.7),
                        (EmotionLabel::Sad, 0.2),
                        (EmotionLabel::Neutral, 0.1),
                    ]),
                ),
                &face_pred(
                    EmotionLabel::Sad,
                    0.6,
                    EmotionDistribution::from([
                        (EmotionLabel::Sad, 0.6),
                        (EmotionLabel::Neutral, 0.4),
                    ]),
                ),
            )
            .unwrap();

        assert_eq!(verdict.agreement_tier, Some(AgreementTier::Weak));
        assert!((verdict.compatibility_score - 0.5).abs() < 1e-6);
        assert_eq!(verdict.final_emotion, EmotionLabel::Fear);
        assert!((verdict.final_confidence - 0.42).abs() < 1e-6);
        assert!((verdict.merged_distribution.get(&EmotionLabel::Sad) - 0.36).abs() < 1e-6);
        assert!((verdict.merged_distribution.get(&EmotionLabel::Neutral) - 0.22).abs() < 1e-6);
    }

    #[test]
    fn test_confident_conflict_keeps_final_emotion() {
        // voice=happy 0.9, face=sad 0.8: conflict, but merged happy=0.54 >= 0.4
        let engine = default_engine();
        let verdict = engine
            .merge(
                &voice_pred(
                    EmotionLabel::Happy,
                    0.9,
                    EmotionDistribution::from([
                        (EmotionLabel::Happy, 0.9),
                        (EmotionLabel::Neutral, 0.1),
                    ]),
                ),
                &face_pred(
                    EmotionLabel::Sad,
                    0.8,
                    EmotionDistribution::from([
                        (EmotionLabel::Sad, 0.8),
                        (EmotionLabel::Neutral, 0.2),
                    ]),
                ),
            )
            .unwrap();

        assert_eq!(verdict.agreement_tier, Some(AgreementTier::Conflict));
        assert_eq!(verdict.compatibility_score, 0.0);
        assert_eq!(verdict.final_emotion, EmotionLabel::Happy);
        assert!((verdict.final_confidence - 0.54).abs() < 1e-6);
        assert!((verdict.merged_distribution.get(&EmotionLabel::Sad) - 0.32).abs() < 1e-6);
        assert!((verdict.merged_distribution.get(&EmotionLabel::Neutral) - 0.14).abs() < 1e-6);
        assert_eq!(verdict.recommendation_emotion, EmotionLabel::Happy);
    }

    #[test]
    fn test_weak_conflict_recommends_neutral() {
        // Same shape as above but with voice confidence scaled down so the
        // merged winner lands under the 0.4 floor.
        let engine = default_engine();
        let verdict = engine
            .merge(
                &voice_pred(
                    EmotionLabel::Happy,
                    0.5,
                    EmotionDistribution::from([
                        (EmotionLabel::Happy, 0.5),
                        (EmotionLabel::Neutral, 0.1),
                    ]),
                ),
                &face_pred(
                    EmotionLabel::Sad,
                    0.8,
                    EmotionDistribution::from([
                        (EmotionLabel::Sad, 0.8),
                        (EmotionLabel::Neutral, 0.2),
                    ]),
                ),
            )
            .unwrap();

        assert_eq!(verdict.agreement_tier, Some(AgreementTier::Conflict));
        assert!(verdict.final_confidence < 0.4);
        assert_eq!(verdict.recommendation_emotion, EmotionLabel::Neutral);
        // final_emotion itself is untouched by the downgrade
        assert_eq!(verdict.final_emotion, EmotionLabel::Sad);
    }

    #[test]
    fn test_face_point_mass_when_no_distribution() {
        let engine = default_engine();
        let verdict = engine
            .merge(
                &voice_pred(
                    EmotionLabel::Neutral,
                    0.5,
                    EmotionDistribution::from([(EmotionLabel::Neutral, 0.5)]),
                ),
                &face_pred(EmotionLabel::Happy, 1.0, EmotionDistribution::new()),
            )
            .unwrap();

        // face contributes 1.0 * 0.4 = 0.4 at happy
        assert!((verdict.merged_distribution.get(&EmotionLabel::Happy) - 0.4).abs() < 1e-6);
        assert!((verdict.merged_distribution.get(&EmotionLabel::Neutral) - 0.3).abs() < 1e-6);
        assert_eq!(verdict.final_emotion, EmotionLabel::Happy);
    }

    #[test]
    fn test_unrecognized_label_degrades_to_conflict() {
        let engine = default_engine();
        let verdict = engine
            .merge(
                &voice_pred(
                    EmotionLabel::parse("ecstatic"),
                    0.9,
                    EmotionDistribution::from([(EmotionLabel::parse("ecstatic"), 0.9)]),
                ),
                &face_pred(
                    EmotionLabel::Happy,
                    0.6,
                    EmotionDistribution::from([(EmotionLabel::Happy, 0.6)]),
                ),
            )
            .unwrap();

        assert_eq!(verdict.compatibility_score, 0.0);
        assert_eq!(verdict.agreement_tier, Some(AgreementTier::Conflict));
        assert_eq!(verdict.final_emotion, EmotionLabel::parse("ecstatic"));
    }

    #[test]
    fn test_both_distributions_empty_is_error() {
        let engine = default_engine();
        let result = engine.merge(
            &voice_pred(EmotionLabel::Happy, 0.9, EmotionDistribution::new()),
            &face_pred(EmotionLabel::Sad, 0.8, EmotionDistribution::new()),
        );
        assert!(matches!(result, Err(EngineError::EmptyMerge)));
    }

    #[test]
    fn test_explanation_names_both_labels_and_final() {
        let engine = default_engine();
        let verdict = engine
            .merge(
                &voice_pred(
                    EmotionLabel::Fear,
                    0.7,
                    EmotionDistribution::from([(EmotionLabel::Fear, 0.7)]),
                ),
                &face_pred(
                    EmotionLabel::Surprise,
                    0.6,
                    EmotionDistribution::from([(EmotionLabel::Surprise, 0.6)]),
                ),
            )
            .unwrap();

        assert_eq!(verdict.agreement_tier, Some(AgreementTier::Moderate));
        assert!(verdict.explanation.contains("fear"));
        assert!(verdict.explanation.contains("surprise"));
        assert!(verdict.explanation.contains(verdict.final_emotion.as_str()));
    }
}
