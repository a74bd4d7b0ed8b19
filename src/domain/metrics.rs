// ============================================================
// Layer 3 — Sequence Metrics
// ============================================================
// Default SequenceMetrics implementation used at the end of
// every validation / test epoch.
//
//   ser     — Symbol Error Rate: total symbol-level edit distance
//             divided by the total number of ground-truth symbols
//   cer     — Character Error Rate: the same over the characters
//             of the space-joined sequences
//   seq_acc — share of samples predicted exactly
//
// All three are percentages. Lower is better for ser/cer.

use std::collections::BTreeMap;

use crate::domain::traits::SequenceMetrics;

#[derive(Debug, Clone, Copy, Default)]
pub struct EditDistanceMetrics;

impl SequenceMetrics for EditDistanceMetrics {
    fn compute(&self, y_true: &[Vec<String>], y_pred: &[Vec<String>]) -> BTreeMap<String, f64> {
        let mut symbol_errors = 0usize;
        let mut symbol_total  = 0usize;
        let mut char_errors   = 0usize;
        let mut char_total    = 0usize;
        let mut exact         = 0usize;

        for (truth, pred) in y_true.iter().zip(y_pred) {
            symbol_errors += edit_distance(truth, pred);
            symbol_total  += truth.len();

            let truth_chars: Vec<char> = truth.join(" ").chars().collect();
            let pred_chars:  Vec<char> = pred.join(" ").chars().collect();
            char_errors += edit_distance(&truth_chars, &pred_chars);
            char_total  += truth_chars.len();

            if truth == pred {
                exact += 1;
            }
        }

        let mut metrics = BTreeMap::new();
        metrics.insert("ser".to_string(), rate(symbol_errors, symbol_total));
        metrics.insert("cer".to_string(), rate(char_errors, char_total));
        metrics.insert("seq_acc".to_string(), rate(exact, y_true.len().min(y_pred.len())));
        metrics
    }
}

fn rate(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        100.0 * numerator as f64 / denominator as f64
    }
}

/// Levenshtein distance over arbitrary comparable items.
pub fn edit_distance<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    // Single rolling row: prev[j] = distance(a[..i], b[..j])
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, item_a) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, item_b) in b.iter().enumerate() {
            let cost = if item_a == item_b { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
