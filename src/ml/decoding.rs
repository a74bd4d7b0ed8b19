// ============================================================
// Layer 5 — Greedy Autoregressive Decoding
// ============================================================
// Generates a transcription one symbol at a time, feeding each
// prediction back as input to the next step.
//
//   prefix = [<SOS>]
//   repeat at most max_seq_len times:
//       scores = scorer(prefix)          ← last position only
//       token  = argmax(scores)
//       emit word(token)
//       word == <EOS>  → stop (EndOfSequence)
//       prefix.push(token)
//   → stop (MaxLength), no <EOS> appended
//
// The loop is written against NextTokenScorer, so its control
// flow can be tested with scripted scores; ModelScorer plugs the
// real network in.

use anyhow::{ensure, Result};
use burn::{prelude::*, tensor::activation::softmax};

use crate::domain::{
    traits::NextTokenScorer,
    vocabulary::{Vocabulary, EOS_TOKEN},
};
use crate::ml::model::Img2SeqModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The decoder emitted <EOS>
    EndOfSequence,
    /// max_seq_len steps ran without <EOS>
    MaxLength,
}

/// One emitted symbol
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedStep {
    pub token:       usize,
    pub word:        String,
    /// Score of the chosen token. ModelScorer reports the softmax
    /// probability, normalised over the vocabulary, not the raw logit.
    pub probability: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    pub steps: Vec<DecodedStep>,
    pub stop:  StopReason,
}

impl Transcription {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn words(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.word.clone()).collect()
    }

    /// Words with the top-1 probability of each step, for consumers
    /// that weigh predictions by confidence (e.g. late fusion).
    pub fn words_with_probabilities(&self) -> (Vec<String>, Vec<f32>) {
        self.steps
            .iter()
            .map(|s| (s.word.clone(), s.probability))
            .unzip()
    }
}

pub struct GreedyDecoder<'a> {
    vocab:       &'a Vocabulary,
    max_seq_len: usize,
}

impl<'a> GreedyDecoder<'a> {
    pub fn new(vocab: &'a Vocabulary, max_seq_len: usize) -> Self {
        Self { vocab, max_seq_len }
    }

    pub fn run<S: NextTokenScorer + ?Sized>(&self, scorer: &mut S) -> Result<Transcription> {
        let mut prefix = vec![self.vocab.sos_index()];
        let mut steps  = Vec::new();

        for step in 0..self.max_seq_len {
            let scores = scorer.score_next(&prefix)?;
            ensure!(!scores.is_empty(), "Scorer returned no scores at step {step}");

            let (token, probability) = argmax(&scores);
            let word = self.vocab.word(token)?.to_string();
            let finished = token == self.vocab.eos_index();
            steps.push(DecodedStep { token, word, probability });

            if finished {
                return Ok(Transcription { steps, stop: StopReason::EndOfSequence });
            }
            // The last step's token is never scored, so the prefix
            // stays within max_seq_len positions
            if step + 1 < self.max_seq_len {
                prefix.push(token);
            }
        }

        tracing::debug!("Decoding hit max_seq_len={} without {}", self.max_seq_len, EOS_TOKEN);
        Ok(Transcription { steps, stop: StopReason::MaxLength })
    }
}

/// Index and value of the largest score; the first one wins ties.
fn argmax(scores: &[f32]) -> (usize, f32) {
    scores
        .iter()
        .copied()
        .enumerate()
        .fold((0, scores[0]), |best, (i, v)| if v > best.1 { (i, v) } else { best })
}

// ─── Model-backed scorer ──────────────────────────────────────────────────────
/// Runs the decoder over a fixed single-sample memory.
pub struct ModelScorer<'a, B: Backend> {
    model:  &'a Img2SeqModel<B>,
    memory: Tensor<B, 3>,
    device: B::Device,
}

impl<'a, B: Backend> ModelScorer<'a, B> {
    /// memory: [1, H*W, 256] from `Img2SeqModel::encode_memory`
    pub fn new(model: &'a Img2SeqModel<B>, memory: Tensor<B, 3>) -> Self {
        assert_eq!(memory.dims()[0], 1, "Inference only supports batch_size = 1");
        let device = memory.device();
        Self { model, memory, device }
    }
}

impl<B: Backend> NextTokenScorer for ModelScorer<'_, B> {
    fn score_next(&mut self, prefix: &[usize]) -> Result<Vec<f32>> {
        let ids: Vec<i32> = prefix.iter().map(|&t| t as i32).collect();
        let tokens = Tensor::<B, 1, Int>::from_ints(ids.as_slice(), &self.device)
            .reshape([1, prefix.len()]);

        let logits = self.model.decode(tokens, self.memory.clone());
        let [_, vocab_size, seq_len] = logits.dims();
        let last = logits
            .slice([0..1, 0..vocab_size, seq_len - 1..seq_len])
            .reshape([vocab_size]);

        Ok(softmax(last, 0).into_data().iter::<f32>().collect())
    }
}

/// Encode one image and decode it greedily.
///
/// image: [1, C, H, W]. Batches larger than one are rejected.
pub fn transcribe<B: Backend>(
    model: &Img2SeqModel<B>,
    image: Tensor<B, 4>,
    vocab: &Vocabulary,
) -> Result<Transcription> {
    assert_eq!(image.dims()[0], 1, "Inference only supports batch_size = 1");
    let memory = model.encode_memory(image);
    let mut scorer = ModelScorer::new(model, memory);
    GreedyDecoder::new(vocab, model.max_seq_len).run(&mut scorer)
}
