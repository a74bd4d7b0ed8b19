// ============================================================
// Layer 3 — Epoch Prediction Accumulator
// ============================================================
// Collects one (ground truth, prediction) pair per evaluated
// sample and turns the whole epoch into metrics at its end.
//
// Lifecycle per evaluation epoch:
//
//   record(truth, pred)  × N samples
//          │
//          ▼
//   end_epoch(name, ..)  → metrics computed over all N pairs
//                        → optional random sample logged
//                        → both lists cleared
//
// The accumulator is an owned value, not a global: validation
// and test runs each hold their own and never see each other's
// predictions.

use std::collections::BTreeMap;

use rand::Rng;

use crate::domain::traits::SequenceMetrics;

/// Result of closing an epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochSummary {
    /// Raw metric names (e.g. "ser"), not prefixed with the run name
    pub metrics: BTreeMap<String, f64>,

    /// The (truth, prediction) pair picked for display, if requested
    pub sample: Option<(Vec<String>, Vec<String>)>,
}

impl EpochSummary {
    /// Metric value under its raw name
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

#[derive(Debug, Default)]
pub struct EpochAccumulator {
    y_true: Vec<Vec<String>>,
    y_pred: Vec<Vec<String>>,
}

impl EpochAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one evaluated sample. `truth` must already have its
    /// leading <SOS> removed so it lines up with `prediction`.
    pub fn record(&mut self, truth: Vec<String>, prediction: Vec<String>) {
        self.y_true.push(truth);
        self.y_pred.push(prediction);
    }

    pub fn len(&self) -> usize {
        self.y_true.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y_true.is_empty()
    }

    pub fn truths(&self) -> &[Vec<String>] {
        &self.y_true
    }

    pub fn predictions(&self) -> &[Vec<String>] {
        &self.y_pred
    }

    /// Take every recorded (truths, predictions) pair, leaving the
    /// accumulator empty.
    pub fn drain(&mut self) -> (Vec<Vec<String>>, Vec<Vec<String>>) {
        debug_assert_eq!(self.y_true.len(), self.y_pred.len());
        (std::mem::take(&mut self.y_true), std::mem::take(&mut self.y_pred))
    }

    /// Close the epoch: compute metrics, optionally pick one random
    /// pair for inspection, then clear both lists.
    ///
    /// An empty epoch is not an error; the metrics implementation
    /// decides what values an empty set produces.
    pub fn end_epoch<M, R>(
        &mut self,
        name:        &str,
        show_sample: bool,
        metrics:     &M,
        rng:         &mut R,
    ) -> EpochSummary
    where
        M: SequenceMetrics + ?Sized,
        R: Rng + ?Sized,
    {
        let (mut y_true, mut y_pred) = self.drain();

        let values = metrics.compute(&y_true, &y_pred);
        for (k, v) in &values {
            tracing::info!("{name}_{k} = {v:.4}");
        }

        let sample = if show_sample && !y_true.is_empty() {
            let index = rng.gen_range(0..y_true.len());
            let pair = (y_true.swap_remove(index), y_pred.swap_remove(index));
            tracing::info!("Ground truth - {:?}", pair.0);
            tracing::info!("Prediction - {:?}", pair.1);
            Some(pair)
        } else {
            None
        };

        EpochSummary { metrics: values, sample }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::EditDistanceMetrics;
    use rand::{rngs::StdRng, SeedableRng};
    use std::cell::Cell;

    fn seq(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Records how many pairs it was handed
    struct CountingMetrics {
        seen: Cell<usize>,
    }

    impl SequenceMetrics for CountingMetrics {
        fn compute(&self, y_true: &[Vec<String>], y_pred: &[Vec<String>]) -> BTreeMap<String, f64> {
            assert_eq!(y_true.len(), y_pred.len());
            self.seen.set(y_true.len());
            BTreeMap::from([("count".to_string(), y_true.len() as f64)])
        }
    }

    #[test]
    fn test_record_keeps_lists_parallel() {
        let mut acc = EpochAccumulator::new();
        acc.record(seq(&["a", "<EOS>"]), seq(&["a", "<EOS>"]));
        acc.record(seq(&["b", "<EOS>"]), seq(&["a"]));
        assert_eq!(acc.len(), 2);
        assert_eq!(acc.truths()[1], seq(&["b", "<EOS>"]));
        assert_eq!(acc.predictions()[1], seq(&["a"]));
    }

    #[test]
    fn test_drain_hands_over_pairs() {
        let mut acc = EpochAccumulator::new();
        acc.record(seq(&["a"]), seq(&["b"]));
        let (truths, preds) = acc.drain();
        assert_eq!(truths, vec![seq(&["a"])]);
        assert_eq!(preds, vec![seq(&["b"])]);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_end_epoch_clears_everything() {
        let mut acc = EpochAccumulator::new();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5 {
            acc.record(seq(&["a"]), seq(&["b"]));
        }
        let metrics = CountingMetrics { seen: Cell::new(0) };
        let summary = acc.end_epoch("val", false, &metrics, &mut rng);

        assert_eq!(metrics.seen.get(), 5);
        assert_eq!(summary.metric("count"), Some(5.0));
        assert!(summary.sample.is_none());
        assert!(acc.is_empty());
        assert!(acc.truths().is_empty());
        assert!(acc.predictions().is_empty());
    }

    #[test]
    fn test_end_epoch_on_empty_accumulator() {
        let mut acc = EpochAccumulator::new();
        let mut rng = StdRng::seed_from_u64(7);
        // Sample display must not panic with nothing recorded
        let summary = acc.end_epoch("test", true, &EditDistanceMetrics, &mut rng);
        assert!(summary.sample.is_none());
        assert_eq!(summary.metric("ser"), Some(0.0));
        assert!(acc.is_empty());
    }

    #[test]
    fn test_displayed_sample_is_a_recorded_pair() {
        let mut acc = EpochAccumulator::new();
        let mut rng = StdRng::seed_from_u64(3);
        acc.record(seq(&["a"]), seq(&["x"]));
        acc.record(seq(&["b"]), seq(&["y"]));
        let summary = acc.end_epoch("test", true, &EditDistanceMetrics, &mut rng);
        let (truth, pred) = summary.sample.clone().unwrap();
        assert!(
            (truth == seq(&["a"]) && pred == seq(&["x"]))
                || (truth == seq(&["b"]) && pred == seq(&["y"]))
        );
        assert_eq!(summary.metric("seq_acc"), Some(0.0));
    }

    #[test]
    fn test_independent_accumulators_do_not_share_state() {
        let mut val  = EpochAccumulator::new();
        let mut test = EpochAccumulator::new();
        val.record(seq(&["a"]), seq(&["a"]));
        assert_eq!(val.len(), 1);
        assert!(test.is_empty());
        test.record(seq(&["b"]), seq(&["b"]));
        let mut rng = StdRng::seed_from_u64(1);
        val.end_epoch("val", false, &EditDistanceMetrics, &mut rng);
        assert!(val.is_empty());
        assert_eq!(test.len(), 1);
    }
}
