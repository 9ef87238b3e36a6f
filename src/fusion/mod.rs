pub mod engine;
pub mod verdict;

pub use engine::FusionEngine;
pub use verdict::{AgreementTier, FusionVerdict, Modality, ModalityPrediction};
