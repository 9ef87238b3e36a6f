use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Emotion label over the 7-class voice/face model vocabulary.
///
/// Canonical labels are a closed set; anything else is carried verbatim in
/// `Other` and degrades gracefully downstream (zero compatibility against
/// every canonical label) instead of being rejected.
///
/// The derived `Ord` gives the fixed canonical order used for deterministic
/// argmax tie-breaking, with unrecognized labels sorting after the canonical
/// seven.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EmotionLabel {
    Angry,
    Disgust,
    Fear,
    Happy,
    Neutral,
    Sad,
    Surprise,
    Other(String),
}

/// Fixed canonical label order (also the tie-break order for merged argmax)
pub const CANONICAL_EMOTIONS: [EmotionLabel; 7] = [
    EmotionLabel::Angry,
    EmotionLabel::Disgust,
    EmotionLabel::Fear,
    EmotionLabel::Happy,
    EmotionLabel::Neutral,
    EmotionLabel::Sad,
    EmotionLabel::Surprise,
];

impl EmotionLabel {
    /// Parse a label, normalizing case and surrounding whitespace
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "angry" => Self::Angry,
            "disgust" => Self::Disgust,
            "fear" => Self::Fear,
            "happy" => Self::Happy,
            "neutral" => Self::Neutral,
            "sad" => Self::Sad,
            "surprise" => Self::Surprise,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Angry => "angry",
            Self::Disgust => "disgust",
            Self::Fear => "fear",
            Self::Happy => "happy",
            Self::Neutral => "neutral",
            Self::Sad => "sad",
            Self::Surprise => "surprise",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Index into the canonical 7x7 compatibility table, `None` for `Other`
    pub fn canonical_index(&self) -> Option<usize> {
        match self {
            Self::Angry => Some(0),
            Self::Disgust => Some(1),
            Self::Fear => Some(2),
            Self::Happy => Some(3),
            Self::Neutral => Some(4),
            Self::Sad => Some(5),
            Self::Surprise => Some(6),
            Self::Other(_) => None,
        }
    }

    pub fn is_canonical(&self) -> bool {
        self.canonical_index().is_some()
    }

    /// Short human-readable description of the emotion
    pub fn description(&self) -> &'static str {
        match self {
            Self::Angry => "Displeasure, frustration",
            Self::Disgust => "Revulsion, disapproval",
            Self::Fear => "Anxiety, apprehension",
            Self::Happy => "Joy, contentment",
            Self::Neutral => "Baseline state",
            Self::Sad => "Sorrow, melancholy",
            Self::Surprise => "Astonishment",
            Self::Other(_) => "Unknown emotion",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EmotionLabel {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<EmotionLabel> for String {
    fn from(label: EmotionLabel) -> Self {
        label.as_str().to_string()
    }
}

impl From<&str> for EmotionLabel {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

/// Per-label probability map.
///
/// Probabilities are approximate by construction (model softmax output plus
/// weighted merging), so no sum-to-one invariant is enforced. Backed by a
/// BTreeMap so iteration follows the canonical label order, which is what
/// makes the merge argmax deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionDistribution(BTreeMap<EmotionLabel, f32>);

impl EmotionDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probability for a label, 0.0 when absent
    pub fn get(&self, label: &EmotionLabel) -> f32 {
        self.0.get(label).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, label: EmotionLabel, prob: f32) {
        self.0.insert(label, prob);
    }

    /// Add `delta` to a label's slot, creating it on demand
    pub fn add(&mut self, label: EmotionLabel, delta: f32) {
        *self.0.entry(label).or_insert(0.0) += delta;
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EmotionLabel, f32)> {
        self.0.iter().map(|(label, &prob)| (label, prob))
    }

    /// Highest-probability entry; ties go to the first label in canonical
    /// order (strict `>` over an ordered walk, so the earlier label wins)
    pub fn argmax(&self) -> Option<(EmotionLabel, f32)> {
        let mut best: Option<(&EmotionLabel, f32)> = None;
        for (label, prob) in self.iter() {
            let better = match best {
                None => true,
                Some((_, best_prob)) => prob > best_prob,
            };
            if better {
                best = Some((label, prob));
            }
        }
        best.map(|(label, prob)| (label.clone(), prob))
    }
}

impl FromIterator<(EmotionLabel, f32)> for EmotionDistribution {
    fn from_iter<I: IntoIterator<Item = (EmotionLabel, f32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(EmotionLabel, f32); N]> for EmotionDistribution {
    fn from(entries: [(EmotionLabel, f32); N]) -> Self {
        entries.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        assert_eq!(EmotionLabel::parse("  Happy "), EmotionLabel::Happy);
        assert_eq!(EmotionLabel::parse("SURPRISE"), EmotionLabel::Surprise);
        assert_eq!(
            EmotionLabel::parse(" Bored "),
            EmotionLabel::Other("bored".to_string())
        );
    }

    #[test]
    fn test_canonical_order_matches_indices() {
        for (i, label) in CANONICAL_EMOTIONS.iter().enumerate() {
            assert_eq!(label.canonical_index(), Some(i));
        }
    }

    #[test]
    fn test_other_sorts_after_canonical() {
        let other = EmotionLabel::Other("aargh".to_string());
        assert!(EmotionLabel::Surprise < other);
        assert!(EmotionLabel::Angry < other);
    }

    #[test]
    fn test_distribution_get_missing_is_zero() {
        let dist = EmotionDistribution::from([(EmotionLabel::Happy, 0.9)]);
        assert_eq!(dist.get(&EmotionLabel::Sad), 0.0);
        assert_eq!(dist.get(&EmotionLabel::Happy), 0.9);
    }

    #[test]
    fn test_argmax_tie_breaks_in_canonical_order() {
        let dist = EmotionDistribution::from([
            (EmotionLabel::Sad, 0.4),
            (EmotionLabel::Fear, 0.4),
            (EmotionLabel::Neutral, 0.2),
        ]);
        let (label, prob) = dist.argmax().unwrap();
        assert_eq!(label, EmotionLabel::Fear);
        assert!((prob - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_argmax_empty() {
        assert!(EmotionDistribution::new().argmax().is_none());
    }

    #[test]
    fn test_add_creates_slot_on_demand() {
        let mut dist = EmotionDistribution::new();
        dist.add(EmotionLabel::Other("excited".to_string()), 0.3);
        dist.add(EmotionLabel::Other("excited".to_string()), 0.2);
        assert!((dist.get(&EmotionLabel::Other("excited".to_string())) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_label_serde_round_trip() {
        let json = serde_json::to_string(&EmotionLabel::Happy).unwrap();
        assert_eq!(json, "\"happy\"");
        let back: EmotionLabel = serde_json::from_str("\"Fear\"").unwrap();
        assert_eq!(back, EmotionLabel::Fear);
    }

    #[test]
    fn test_distribution_serde_uses_string_keys() {
        let dist = EmotionDistribution::from([
            (EmotionLabel::Happy, 0.75),
            (EmotionLabel::Neutral, 0.25),
        ]);
        let json = serde_json::to_string(&dist).unwrap();
        assert!(json.contains("\"happy\""));
        let back: EmotionDistribution = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dist);
    }
}
