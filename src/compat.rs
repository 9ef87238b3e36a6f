//! Emotion compatibility matrix.
//!
//! Symmetric 7x7 similarity table over the canonical emotions, encoding how
//! well a voice-detected emotion aligns with a face-detected one. The table
//! is mirrored from an upper-triangular pair list when constructed, so
//! symmetry holds by construction rather than by convention, and the
//! diagonal is pinned to 1.0.

use crate::emotion::EmotionLabel;

const DIM: usize = 7;

// Indices follow EmotionLabel::canonical_index:
// angry=0, disgust=1, fear=2, happy=3, neutral=4, sad=5, surprise=6
const UPPER_PAIRS: &[(usize, usize, f32)] = &[
    (0, 1, 0.6), // angry-disgust
    (0, 2, 0.3), // angry-fear
    (0, 3, 0.0), // angry-happy
    (0, 4, 0.2), // angry-neutral
    (0, 5, 0.4), // angry-sad
    (0, 6, 0.3), // angry-surprise
    (1, 2, 0.4), // disgust-fear
    (1, 3, 0.0), // disgust-happy
    (1, 4, 0.2), // disgust-neutral
    (1, 5, 0.3), // disgust-sad
    (1, 6, 0.2), // disgust-surprise
    (2, 3, 0.0), // fear-happy
    (2, 4, 0.2), // fear-neutral
    (2, 5, 0.5), // fear-sad
    (2, 6, 0.7), // fear-surprise
    (3, 4, 0.4), // happy-neutral
    (3, 5, 0.0), // happy-sad
    (3, 6, 0.5), // happy-surprise
    (4, 5, 0.3), // neutral-sad
    (4, 6, 0.3), // neutral-surprise
    (5, 6, 0.2), // sad-surprise
];

#[derive(Debug, Clone)]
pub struct CompatibilityMatrix {
    table: [[f32; DIM]; DIM],
}

impl CompatibilityMatrix {
    pub fn new() -> Self {
        let mut table = [[0.0; DIM]; DIM];
        for (i, row) in table.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        for &(a, b, score) in UPPER_PAIRS {
            table[a][b] = score;
            table[b][a] = score;
        }
        Self { table }
    }

    /// Compatibility score in [0, 1] between two labels.
    ///
    /// Returns 0.0 for any pair involving a non-canonical label; never fails.
    pub fn get(&self, a: &EmotionLabel, b: &EmotionLabel) -> f32 {
        match (a.canonical_index(), b.canonical_index()) {
            (Some(i), Some(j)) => self.table[i][j],
            _ => 0.0,
        }
    }
}

impl Default for CompatibilityMatrix {
    fn default() -> Self {
        Self::new()
    }
}
