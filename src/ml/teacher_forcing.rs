// ============================================================
// Layer 5 — Teacher-Forcing Corruption
// ============================================================
// With plain teacher forcing the decoder only ever sees correct
// history during training, while at inference it consumes its
// own (sometimes wrong) predictions. Replacing a random share of
// the ground-truth decoder inputs with random symbols exposes it
// to erroneous history while training.
//
// For every position:
//   draw u ~ U[0, 1)
//   if u < p and the token is not <PAD>:
//       token ← uniform index in 0..vocab_size
//
// The replacement is drawn from the full vocabulary, so it can
// be the original token or a reserved one.

use burn::{prelude::*, tensor::TensorData};
use rand::Rng;

/// Corrupt a flat token sequence. The input is left untouched.
pub fn corrupt_tokens<R: Rng + ?Sized>(
    tokens:      &[usize],
    probability: f64,
    vocab_size:  usize,
    padding_idx: usize,
    rng:         &mut R,
) -> Vec<usize> {
    tokens
        .iter()
        .map(|&token| {
            if rng.gen::<f64>() < probability && token != padding_idx {
                rng.gen_range(0..vocab_size)
            } else {
                token
            }
        })
        .collect()
}

/// Tensor form used by the training loop: y_in [batch, seq_len]
/// → corrupted copy of the same shape on the same device.
pub fn apply_teacher_forcing<B: Backend, R: Rng + ?Sized>(
    y_in:        Tensor<B, 2, Int>,
    probability: f64,
    vocab_size:  usize,
    padding_idx: usize,
    rng:         &mut R,
) -> Tensor<B, 2, Int> {
    let shape  = y_in.dims();
    let device = y_in.device();

    let tokens: Vec<usize> = y_in
        .into_data()
        .iter::<i64>()
        .map(|t| t as usize)
        .collect();
    let corrupted: Vec<i64> = corrupt_tokens(&tokens, probability, vocab_size, padding_idx, rng)
        .into_iter()
        .map(|t| t as i64)
        .collect();

    Tensor::<B, 2, Int>::from_data(TensorData::new(corrupted, shape), &device)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use rand::{rngs::StdRng, SeedableRng};

    type TestBackend = NdArray<f32>;

    const PAD: usize = 0;
    const VOCAB: usize = 50;

    fn sample() -> Vec<usize> {
        vec![1, 7, 12, 33, 2, PAD, PAD, PAD]
    }

    #[test]
    fn test_zero_probability_is_identity() {
        let mut rng = StdRng::seed_from_u64(0);
        let tokens = sample();
        assert_eq!(corrupt_tokens(&tokens, 0.0, VOCAB, PAD, &mut rng), tokens);
    }

    #[test]
    fn test_full_probability_keeps_padding() {
        let tokens = sample();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = corrupt_tokens(&tokens, 1.0, VOCAB, PAD, &mut rng);
            assert_eq!(out.len(), tokens.len());
            for (orig, new) in tokens.iter().zip(&out) {
                if *orig == PAD {
                    assert_eq!(*new, PAD);
                } else {
                    assert!(*new < VOCAB);
                }
            }
        }
    }

    #[test]
    fn test_full_probability_redraws_every_token() {
        // With a large vocabulary, keeping all five real tokens by
        // chance is practically impossible
        let tokens = sample();
        let mut rng = StdRng::seed_from_u64(11);
        let out = corrupt_tokens(&tokens, 1.0, 1_000_000, PAD, &mut rng);
        let unchanged = tokens
            .iter()
            .zip(&out)
            .filter(|(o, n)| **o != PAD && o == n)
            .count();
        assert_eq!(unchanged, 0);
    }

    #[test]
    fn test_replacement_may_equal_original() {
        // Two-symbol vocabulary: a "corrupted" token is its own value
        // about half of the time. This no-op corruption is kept.
        let tokens = vec![1usize; 200];
        let mut rng = StdRng::seed_from_u64(5);
        let out = corrupt_tokens(&tokens, 1.0, 2, PAD, &mut rng);
        let kept = out.iter().filter(|&&t| t == 1).count();
        assert!(kept > 0 && kept < tokens.len());
        // ...and the replacement may even be the padding index
        assert!(out.contains(&PAD));
    }

    #[test]
    fn test_same_seed_same_corruption() {
        let tokens = sample();
        let a = corrupt_tokens(&tokens, 0.5, VOCAB, PAD, &mut StdRng::seed_from_u64(42));
        let b = corrupt_tokens(&tokens, 0.5, VOCAB, PAD, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_tensor_version_preserves_shape_and_input() {
        let device = Default::default();
        let y_in = Tensor::<TestBackend, 1, Int>::from_ints([1, 5, 6, 0, 1, 7, 0, 0], &device)
            .reshape([2, 4]);
        let before: Vec<i64> = y_in.clone().into_data().iter::<i64>().collect();

        let mut rng = StdRng::seed_from_u64(3);
        let out = apply_teacher_forcing(y_in.clone(), 1.0, VOCAB, PAD, &mut rng);
        assert_eq!(out.dims(), [2, 4]);

        let after: Vec<i64> = out.into_data().iter::<i64>().collect();
        for (b, a) in before.iter().zip(&after) {
            if *b == 0 {
                assert_eq!(*a, 0);
            }
        }
        // The caller's tensor still holds the gold tokens
        let still: Vec<i64> = y_in.into_data().iter::<i64>().collect();
        assert_eq!(still, before);

        let mut rng = StdRng::seed_from_u64(3);
        let identity = Tensor::<TestBackend, 1, Int>::from_ints([1, 5, 6, 0], &device).reshape([1, 4]);
        let same = apply_teacher_forcing(identity, 0.0, VOCAB, PAD, &mut rng);
        assert_eq!(same.into_data().iter::<i64>().collect::<Vec<_>>(), vec![1, 5, 6, 0]);
    }
}
