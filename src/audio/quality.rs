//! Audio quality gate.
//!
//! Lightweight heuristics that flag silence, DC offset, narrowband hum, or
//! otherwise low-information audio before it reaches the voice model. The
//! gate never transforms the buffer: it is a go/no-go decision plus
//! diagnostics, and on no-go it substitutes a mildly neutral-biased
//! fallback prediction instead of letting the model hallucinate confidence
//! from noise.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::QualityThresholds;
use crate::emotion::{EmotionDistribution, EmotionLabel};
use crate::fusion::{Modality, ModalityPrediction};

/// Frame and hop length for zero-crossing-rate averaging
const ZCR_FRAME_LEN: usize = 1024;
const ZCR_HOP_LEN: usize = 512;

/// Typical speech band bounds in Hz
const SPEECH_BAND_LOW_HZ: f32 = 85.0;
const SPEECH_BAND_HIGH_HZ: f32 = 4000.0;

const ENERGY_EPSILON: f32 = 1e-8;

/// Signal diagnostics for one audio buffer, immutable once computed.
/// All zeros for clips too short to analyze.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioQualityReport {
    pub rms: f32,
    pub peak: f32,
    pub zero_crossing_rate: f32,
    pub spectral_centroid_hz: f32,
    pub speech_band_ratio: f32,
}

/// Gate decision: diagnostics plus, when unreliable, the fallback
/// prediction to use in place of real inference
#[derive(Debug, Clone)]
pub struct QualityVerdict {
    pub report: AudioQualityReport,
    pub is_reliable: bool,
    pub fallback: Option<ModalityPrediction>,
}

pub struct AudioQualityGate {
    thresholds: QualityThresholds,
}

impl AudioQualityGate {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    /// Decide whether a decoded mono PCM buffer carries enough vocal
    /// information to trust downstream inference.
    ///
    /// Clips shorter than `min_clip_secs` are unreliable immediately and
    /// skip the spectral analysis; everything else is measured and checked
    /// against the configured thresholds.
    pub fn assess(&self, samples: &[f32], sample_rate: u32) -> QualityVerdict {
        let min_samples = (sample_rate as f32 * self.thresholds.min_clip_secs) as usize;
        if samples.len() < min_samples {
            warn!(
                "Audio clip too short for reliable prediction: {} samples (min: {})",
                samples.len(),
                min_samples
            );
            return QualityVerdict {
                report: AudioQualityReport::default(),
                is_reliable: false,
                fallback: Some(low_information_fallback(
                    self.thresholds.short_clip_confidence,
                    "audio clip shorter than minimum length; using neutral fallback",
                )),
            };
        }

        let report = measure(samples, sample_rate);
        debug!(
            "Audio quality: rms={:.4} peak={:.4} zcr={:.3} centroid={:.1}Hz speech_ratio={:.2}",
            report.rms,
            report.peak,
            report.zero_crossing_rate,
            report.spectral_centroid_hz,
            report.speech_band_ratio
        );

        let too_quiet =
            report.rms < self.thresholds.min_rms || report.peak < self.thresholds.min_peak;
        let low_speech_band = report.speech_band_ratio < self.thresholds.min_speech_band_ratio;
        let no_variation = report.zero_crossing_rate < self.thresholds.min_zero_crossing_rate
            || report.spectral_centroid_hz < self.thresholds.min_spectral_centroid_hz;

        if too_quiet || low_speech_band || no_variation {
            warn!(
                "Audio flagged as low-information (quiet: {}, band: {}, variation: {})",
                too_quiet, low_speech_band, no_variation
            );
            return QualityVerdict {
                report,
                is_reliable: false,
                fallback: Some(low_information_fallback(
                    self.thresholds.unreliable_confidence,
                    "low-information audio; using neutral fallback",
                )),
            };
        }

        QualityVerdict {
            report,
            is_reliable: true,
            fallback: None,
        }
    }
}

impl Default for AudioQualityGate {
    fn default() -> Self {
        Self::new(QualityThresholds::default())
    }
}

/// Neutral-biased fallback prediction used whenever the gate rejects audio.
/// Deliberately not flat: a mild neutral prior avoids cascading
/// zero-confidence results downstream while still signaling distrust.
pub fn low_information_fallback(confidence: f32, reason: &str) -> ModalityPrediction {
    let distribution = EmotionDistribution::from([
        (EmotionLabel::Neutral, 0.25),
        (EmotionLabel::Happy, 0.15),
        (EmotionLabel::Sad, 0.15),
        (EmotionLabel::Angry, 0.10),
        (EmotionLabel::Fear, 0.10),
        (EmotionLabel::Disgust, 0.10),
        (EmotionLabel::Surprise, 0.10),
    ]);
    ModalityPrediction::new(Modality::Voice, EmotionLabel::Neutral, confidence, distribution)
        .with_warning(reason)
}

fn measure(samples: &[f32], sample_rate: u32) -> AudioQualityReport {
    let rms = (samples.iter().map(|&s| s * s).sum::<f32>() / samples.len() as f32).sqrt();
    let peak = samples.iter().fold(0.0f32, |max, &s| max.max(s.abs()));
    let zero_crossing_rate = framed_zcr(samples);
    let (spectral_centroid_hz, speech_band_ratio) = spectral_features(samples, sample_rate);

    AudioQualityReport {
        rms,
        peak,
        zero_crossing_rate,
        spectral_centroid_hz,
        speech_band_ratio,
    }
}

/// Zero-crossing rate of one frame: sign changes over frame length
fn frame_zcr(frame: &[f32]) -> f32 {
    if frame.len() < 2 {
        return 0.0;
    }
    let crossings = frame
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    crossings as f32 / frame.len() as f32
}

/// ZCR averaged over fixed-length frames; short buffers use one frame
fn framed_zcr(samples: &[f32]) -> f32 {
    if samples.len() < ZCR_FRAME_LEN {
        return frame_zcr(samples);
    }

    let mut sum = 0.0;
    let mut frames = 0usize;
    let mut start = 0usize;
    while start + ZCR_FRAME_LEN <= samples.len() {
        sum += frame_zcr(&samples[start..start + ZCR_FRAME_LEN]);
        frames += 1;
        start += ZCR_HOP_LEN;
    }
    sum / frames as f32
}

/// Spectral centroid and speech-band energy ratio from one whole-buffer DFT.
///
/// The buffer is zero-padded to the next power of two; only the
/// non-negative-frequency half of the spectrum is inspected.
fn spectral_features(samples: &[f32], sample_rate: u32) -> (f32, f32) {
    let n = samples.len().next_power_of_two();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);

    let mut spectrum: Vec<Complex<f32>> = samples
        .iter()
        .map(|&s| Complex::new(s, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)).take(n - samples.len()))
        .collect();
    fft.process(&mut spectrum);

    let bin_hz = sample_rate as f32 / n as f32;
    let mut total = 0.0f32;
    let mut weighted = 0.0f32;
    let mut speech = 0.0f32;

    for (i, c) in spectrum.iter().take(n / 2 + 1).enumerate() {
        let magnitude = c.norm();
        let freq = i as f32 * bin_hz;
        total += magnitude;
        weighted += magnitude * freq;
        if (SPEECH_BAND_LOW_HZ..=SPEECH_BAND_HIGH_HZ).contains(&freq) {
            speech += magnitude;
        }
    }

    let centroid = if total > 0.0 { weighted / total } else { 0.0 };
    let ratio = speech / (total + ENERGY_EPSILON);
    (centroid, ratio)
}
