//! Mapping from discrete emotions into valence/arousal coordinates.
//!
//! Valence is pleasantness (-1 unpleasant, +1 pleasant), arousal is
//! activation (-1 calm, +1 excited). Coordinates are scaled toward the
//! origin when confidence is low, so an uncertain "happy" lands closer to
//! neutral than a confident one.

use crate::emotion::EmotionLabel;

/// Base (valence, arousal) per canonical emotion, index-aligned with
/// `EmotionLabel::canonical_index`
const EMOTION_COORDINATES: [(f32, f32); 7] = [
    (-0.7, 0.8), // angry
    (-0.8, 0.3), // disgust
    (-0.8, 0.9), // fear
    (0.9, 0.7),  // happy
    (0.0, 0.0),  // neutral
    (-0.7, -0.4), // sad
    (0.6, 0.8),  // surprise
];

/// Map common mood words onto the canonical vocabulary ("calm" and
/// "relaxed" read as neutral, "excited" as surprise, and so on).
/// Canonical labels pass through unchanged.
pub fn resolve_mood_alias(raw: &str) -> EmotionLabel {
    let label = EmotionLabel::parse(raw);
    match &label {
        EmotionLabel::Other(name) => match name.as_str() {
            "calm" | "relaxed" => EmotionLabel::Neutral,
            "bored" | "tired" => EmotionLabel::Sad,
            "excited" => EmotionLabel::Surprise,
            "energetic" => EmotionLabel::Happy,
            "stressed" => EmotionLabel::Fear,
            _ => label.clone(),
        },
        _ => label,
    }
}

/// Valence/arousal for an emotion, scaled by prediction confidence.
///
/// Unknown labels map to the neutral origin. Confidence is clamped to
/// [0, 1]; the scale floor of 0.2 keeps even a zero-confidence result
/// pointing in the emotion's direction rather than collapsing entirely.
pub fn compute_valence_arousal(label: &EmotionLabel, confidence: f32) -> (f32, f32) {
    let (base_valence, base_arousal) = label
        .canonical_index()
        .map(|i| EMOTION_COORDINATES[i])
        .unwrap_or((0.0, 0.0));

    let confidence = confidence.clamp(0.0, 1.0);
    let scale = 0.2 + confidence * 0.8;

    let valence = (base_valence * scale).clamp(-1.0, 1.0);
    let arousal = (base_arousal * scale).clamp(-1.0, 1.0);
    (round3(valence), round3(arousal))
}

fn round3(x: f32) -> f32 {
    (x * 1000.0).round() / 1000.0
}
