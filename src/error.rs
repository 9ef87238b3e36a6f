use thiserror::Error;

use crate::fusion::Modality;

/// Errors surfaced by the decision engine.
///
/// Low-information audio and cross-modal disagreement are deliberately not
/// here: both produce successful (if degraded) verdicts. Face-path failures
/// are recovered into a neutral fallback by the orchestrator and only voice
/// and input failures propagate.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no usable audio or image input")]
    NoUsableInput,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} predictor is not available")]
    ModelUnavailable(Modality),

    #[error("{modality} inference failed: {reason}")]
    Inference { modality: Modality, reason: String },

    #[error("nothing to merge: both emotion distributions are empty")]
    EmptyMerge,
}

impl EngineError {
    pub fn inference(modality: Modality, reason: impl Into<String>) -> Self {
        Self::Inference {
            modality,
            reason: reason.into(),
        }
    }
}
