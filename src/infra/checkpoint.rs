// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// What gets saved:
//   1. Model weights (.mpk.gz file) — all learned parameters
//   2. latest_epoch.json            — which epoch was last saved
//   3. best_epoch.json              — epoch with the lowest val SER
//   4. train_config.json            — hyper-parameters to rebuild
//                                     the architecture
//
// File naming convention:
//   checkpoints/
//     model_epoch_1.mpk.gz
//     model_epoch_2.mpk.gz
//     ...
//     latest_epoch.json
//     best_epoch.json
//     train_config.json
//
// The positional table is a constant of the model, so it is
// rebuilt from train_config.json rather than read from disk.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::Img2SeqModel;

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager.
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<String>) -> Self {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    /// Save model weights for a given epoch and move the latest pointer.
    pub fn save_model<B: Backend>(&self, model: &Img2SeqModel<B>, epoch: usize) -> Result<()> {
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        self.write_pointer("latest_epoch.json", epoch)?;
        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Remember `epoch` as the best one so far.
    pub fn mark_best(&self, epoch: usize) -> Result<()> {
        self.write_pointer("best_epoch.json", epoch)
    }

    /// Load the best checkpoint, or the latest one if none was marked.
    pub fn load_model<B: Backend>(
        &self,
        model:  Img2SeqModel<B>,
        device: &B::Device,
    ) -> Result<Img2SeqModel<B>> {
        let epoch = match self.read_pointer("best_epoch.json") {
            Ok(epoch) => epoch,
            Err(_) => self.read_pointer("latest_epoch.json").with_context(|| {
                "No checkpoint found. Have you run 'train' first?"
            })?,
        };
        self.load_epoch(model, epoch, device)
    }

    pub fn load_epoch<B: Backend>(
        &self,
        model:  Img2SeqModel<B>,
        epoch:  usize,
        device: &B::Device,
    ) -> Result<Img2SeqModel<B>> {
        let path = self.dir.join(format!("model_epoch_{epoch}"));
        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        Ok(model.load_record(record))
    }

    /// Must be called before training starts so inference can
    /// reconstruct the exact model architecture.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. \
                 Make sure you have run 'train' first.",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn write_pointer(&self, name: &str, epoch: usize) -> Result<()> {
        fs::write(self.dir.join(name), serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write {name}"))
    }

    fn read_pointer(&self, name: &str) -> Result<usize> {
        let s = fs::read_to_string(self.dir.join(name))
            .with_context(|| format!("Cannot find '{name}'"))?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}
