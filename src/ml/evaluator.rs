// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Evaluation-time orchestration for one run (validation or test):
//
//   evaluation_step(image, truth)   per sample, batch size 1
//       encode → greedy decode → strip <SOS> from truth → record
//   end_epoch(name, show_sample)
//       metrics over every recorded pair → clear
//
// Ground truth may be stored in a different symbol space than
// the model's; `truth_vocab` decodes it when given.

use anyhow::Result;
use burn::prelude::*;
use rand::Rng;

use crate::domain::{
    predictions::{EpochAccumulator, EpochSummary},
    traits::SequenceMetrics,
    vocabulary::Vocabulary,
};
use crate::ml::{decoding::transcribe, model::Img2SeqModel};

pub struct Evaluator<'a> {
    vocab:       &'a Vocabulary,
    truth_vocab: &'a Vocabulary,
    accumulator: EpochAccumulator,
}

impl<'a> Evaluator<'a> {
    pub fn new(vocab: &'a Vocabulary, truth_vocab: Option<&'a Vocabulary>) -> Self {
        Self {
            vocab,
            truth_vocab: truth_vocab.unwrap_or(vocab),
            accumulator: EpochAccumulator::new(),
        }
    }

    /// image: [1, C, H, W]; truth: ground-truth indices starting with <SOS>.
    pub fn evaluation_step<B: Backend>(
        &mut self,
        model: &Img2SeqModel<B>,
        image: Tensor<B, 4>,
        truth: &[usize],
    ) -> Result<()> {
        let prediction = transcribe(model, image, self.vocab)?.words();
        let truth = self.truth_vocab.decode(truth.get(1..).unwrap_or_default())?;
        self.accumulator.record(truth, prediction);
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.accumulator.len()
    }

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
        self.accumulator.end_epoch(name, show_sample, metrics, rng)
    }
}
