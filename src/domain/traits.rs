// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams the rest of the system is written against:
//
//   SampleSource     — yields labelled images from somewhere
//   SequenceMetrics  — turns accumulated (truth, prediction)
//                      pairs into named scalar metrics
//   NextTokenScorer  — yields the next-token distribution for a
//                      decoding prefix
//
// The decoding loop and the epoch lifecycle only see these
// traits, so both are testable without a trained network.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::domain::sample::ScoreSample;

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Any component that can list labelled score images.
///
/// Implementations:
///   - ManifestLoader → reads a JSON manifest file
pub trait SampleSource {
    fn load_all(&self) -> Result<Vec<ScoreSample>>;
}

// ─── SequenceMetrics ──────────────────────────────────────────────────────────
/// Any component that scores predicted symbol sequences.
///
/// Implementations:
///   - EditDistanceMetrics → SER / CER / sequence accuracy
pub trait SequenceMetrics {
    /// `y_true` and `y_pred` are parallel: entry i of each belongs
    /// to the same sample. Returns metric-name → value.
    fn compute(&self, y_true: &[Vec<String>], y_pred: &[Vec<String>]) -> BTreeMap<String, f64>;
}

// ─── NextTokenScorer ──────────────────────────────────────────────────────────
/// Any component able to score the next token of a sequence.
///
/// Implementations:
///   - ModelScorer → runs the transformer decoder over a fixed memory
///   - scripted scorers in tests
pub trait NextTokenScorer {
    /// Given the token prefix decoded so far (starting with <SOS>),
    /// return one score per vocabulary entry for the next position.
    fn score_next(&mut self, prefix: &[usize]) -> Result<Vec<f32>>;
}
