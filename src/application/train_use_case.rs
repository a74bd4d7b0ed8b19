// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load train/val manifests     (Layer 4 - data)
//   Step 2: Build / load vocabulary      (Layer 6 - infra)
//   Step 3: Load evaluation vocabulary   (Layer 6 - infra)
//   Step 4: Prepare images + targets     (Layer 4 - data)
//   Step 5: Save config                  (Layer 6 - infra)
//   Step 6: Run training loop            (Layer 5 - ml)

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::{build_eval_samples, build_train_samples, Img2SeqDataset, SampleLimits},
    loader::ManifestLoader,
};
use crate::domain::{traits::SampleSource, vocabulary::Vocabulary};
use crate::infra::{
    checkpoint::CheckpointManager,
    vocab_store::{load_vocab_file, VocabStore},
};
use crate::ml::{
    model::Img2SeqConfig,
    trainer::{run_training, TrainingReport},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Saved next to the checkpoints so test/transcribe can rebuild
// exactly the same architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub train_manifest: String,
    pub val_manifest:   String,
    pub checkpoint_dir: String,
    /// Optional word → index JSON used to decode ground truth
    pub eval_vocab:     Option<String>,

    /// Largest image the model accepts, in pixels
    pub max_input_height: usize,
    pub max_input_width:  usize,
    /// Longest decoder input (<SOS> + symbols)
    pub max_seq_len:      usize,

    pub batch_size:  usize,
    pub epochs:      usize,
    pub lr:          f64,
    pub num_workers: usize,
    pub seed:        u64,

    /// Share of decoder input tokens replaced by random symbols
    pub teacher_forcing_prob: f64,

    pub num_layers:  usize,
    pub num_heads:   usize,
    pub d_ff:        usize,
    pub dropout:     f64,
    pub attn_window: Option<usize>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_manifest:       "data/train.json".to_string(),
            val_manifest:         "data/val.json".to_string(),
            checkpoint_dir:       "checkpoints".to_string(),
            eval_vocab:           None,
            max_input_height:     128,
            max_input_width:      2048,
            max_seq_len:          512,
            batch_size:           16,
            epochs:               100,
            lr:                   1e-4,
            num_workers:          1,
            seed:                 42,
            teacher_forcing_prob: 0.5,
            num_layers:           8,
            num_heads:            4,
            d_ff:                 1024,
            dropout:              0.1,
            attn_window:          None,
        }
    }
}

impl TrainConfig {
    /// Model hyper-parameters for a given vocabulary
    pub fn model_config(&self, vocab: &Vocabulary) -> Img2SeqConfig {
        Img2SeqConfig::new(
            vocab.len(),
            vocab.pad_index(),
            self.max_input_height,
            self.max_input_width,
            self.max_seq_len,
        )
        .with_num_layers(self.num_layers)
        .with_num_heads(self.num_heads)
        .with_d_ff(self.d_ff)
        .with_dropout(self.dropout)
        .with_attn_window(self.attn_window)
    }

    pub fn limits(&self) -> SampleLimits {
        SampleLimits {
            max_height:  self.max_input_height,
            max_width:   self.max_input_width,
            max_seq_len: self.max_seq_len,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.teacher_forcing_prob),
            "teacher_forcing_prob must be in [0, 1], got {}", self.teacher_forcing_prob
        );
        ensure!(self.batch_size > 0, "batch_size must be positive");
        ensure!(self.max_seq_len >= 2, "max_seq_len must leave room for <SOS> and one symbol");
        ensure!(
            self.max_input_height > 0 && self.max_input_width > 0,
            "max input size must be positive"
        );
        ensure!(self.attn_window != Some(0), "attn_window must be at least 1");
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingReport> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Load manifests ───────────────────────────────────────────
        let train_raw = ManifestLoader::new(&cfg.train_manifest).load_all()?;
        let val_raw   = ManifestLoader::new(&cfg.val_manifest).load_all()?;
        ensure!(!train_raw.is_empty(), "Training manifest '{}' is empty", cfg.train_manifest);

        // ── Step 2: Build / load vocabulary ──────────────────────────────────
        // The model's output space comes from the training transcripts
        let vocab = VocabStore::new(&cfg.checkpoint_dir).load_or_build(&train_raw)?;
        vocab.ensure_dense()?;

        // ── Step 3: Evaluation vocabulary ────────────────────────────────────
        let truth_vocab = cfg.eval_vocab.as_deref().map(|p| load_vocab_file(p)).transpose()?;

        // ── Step 4: Prepare samples ──────────────────────────────────────────
        let limits        = cfg.limits();
        let train_samples = build_train_samples(&train_raw, &vocab, limits)?;
        let val_samples   = build_eval_samples(&val_raw, truth_vocab.as_ref().unwrap_or(&vocab), limits)?;
        ensure!(!train_samples.is_empty(), "No training sample fits max_seq_len={}", cfg.max_seq_len);
        tracing::info!(
            "Prepared {} train, {} validation samples",
            train_samples.len(),
            val_samples.len()
        );

        let train_dataset = Img2SeqDataset::new(train_samples);

        // ── Step 5: Save config for test / transcribe ────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(cfg)?;

        // ── Step 6: Run training loop (Layer 5) ──────────────────────────────
        run_training(cfg, &vocab, truth_vocab.as_ref(), train_dataset, val_samples, &ckpt_manager)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = TrainConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.teacher_forcing_prob, 0.5);
        assert_eq!(cfg.lr, 1e-4);
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let bad_prob = TrainConfig { teacher_forcing_prob: 1.5, ..TrainConfig::default() };
        assert!(bad_prob.validate().is_err());

        let bad_window = TrainConfig { attn_window: Some(0), ..TrainConfig::default() };
        assert!(bad_window.validate().is_err());
    }

    #[test]
    fn test_model_config_follows_vocabulary() {
        let vocab = Vocabulary::from_words(["a", "b", "c"]);
        let cfg = TrainConfig { attn_window: Some(16), ..TrainConfig::default() };
        let model_cfg = cfg.model_config(&vocab);
        assert_eq!(model_cfg.vocab_size, 6);
        assert_eq!(model_cfg.padding_idx, 0);
        assert_eq!(model_cfg.attn_window, Some(16));
        assert_eq!(model_cfg.max_input_width, 2048);
    }

    #[test]
    fn test_config_json_round_trip_keeps_optional_fields() {
        let cfg = TrainConfig { eval_vocab: Some("eval.json".into()), ..TrainConfig::default() };
        let back: TrainConfig = serde_json::from_str(&serde_json::to_string(&cfg).unwrap()).unwrap();
        assert_eq!(back.eval_vocab.as_deref(), Some("eval.json"));
        assert_eq!(back.attn_window, None);
    }
}
