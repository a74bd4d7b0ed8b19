// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds the model from train_config.json + w2i.json, loads the
// best checkpoint and runs greedy decoding on single images.
use anyhow::Result;
use burn::prelude::*;
use rand::Rng;

use crate::application::train_use_case::TrainConfig;
use crate::data::dataset::{EvalSample, SampleLimits};
use crate::domain::{
    metrics::EditDistanceMetrics,
    predictions::EpochSummary,
    vocabulary::Vocabulary,
};
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabStore};
use crate::ml::{
    decoding::{transcribe, Transcription},
    evaluator::Evaluator,
    model::Img2SeqModel,
};

type InferBackend = burn::backend::Wgpu;

pub struct Inferencer<B: Backend> {
    model:  Img2SeqModel<B>,
    vocab:  Vocabulary,
    limits: SampleLimits,
    device: B::Device,
}

impl Inferencer<InferBackend> {
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        Self::load(ckpt_manager, device)
    }
}

impl<B: Backend> Inferencer<B> {
    pub fn load(ckpt_manager: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg: TrainConfig = ckpt_manager.load_config()?;
        let vocab = VocabStore::new(ckpt_manager.dir().to_string_lossy()).load()?;

        let model_cfg = cfg.model_config(&vocab).with_dropout(0.0);
        let model: Img2SeqModel<B> = model_cfg.init(&device);
        let model = ckpt_manager.load_model(model, &device)?;
        tracing::info!("Model loaded from checkpoint ({} symbols)", vocab.len());

        Ok(Self { model, vocab, limits: cfg.limits(), device })
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn limits(&self) -> SampleLimits {
        self.limits
    }

    /// Decode one image file, keeping the probability of every symbol.
    pub fn transcribe_image(&self, path: &str) -> Result<Transcription> {
        let image = self.limits.load_image(path)?;
        let transcription = transcribe(&self.model, image.to_tensor::<B>(&self.device), &self.vocab)?;
        tracing::debug!(
            "Decoded {} symbols from '{}' ({:?})",
            transcription.len(), path, transcription.stop
        );
        Ok(transcription)
    }

    /// Run one evaluation epoch over `samples` and close it as `name`.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        samples:     &[EvalSample],
        truth_vocab: Option<&Vocabulary>,
        name:        &str,
        show_sample: bool,
        rng:         &mut R,
    ) -> Result<EpochSummary> {
        let mut evaluator = Evaluator::new(&self.vocab, truth_vocab);
        for sample in samples {
            let image = sample.image.to_tensor::<B>(&self.device);
            evaluator.evaluation_step(&self.model, image, &sample.truth)?;
        }
        Ok(evaluator.end_epoch(name, show_sample, &EditDistanceMetrics, rng))
    }
}
