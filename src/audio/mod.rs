pub mod quality;

pub use quality::{AudioQualityGate, AudioQualityReport, QualityVerdict};
