// ============================================================
// Layer 2 — TranscribeUseCase
// ============================================================
// Loads the best checkpoint once and decodes score images into
// symbol sequences, each symbol with its probability.

use anyhow::Result;

use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{decoding::Transcription, inferencer::Inferencer};

pub struct TranscribeUseCase {
    inferencer: Inferencer<burn::backend::Wgpu>,
}

impl TranscribeUseCase {
    pub fn new(checkpoint_dir: &str) -> Result<Self> {
        let ckpt       = CheckpointManager::new(checkpoint_dir);
        let inferencer = Inferencer::from_checkpoint(&ckpt)?;
        Ok(Self { inferencer })
    }

    pub fn transcribe(&self, image_path: &str) -> Result<Transcription> {
        tracing::info!("Transcribing '{}'", image_path);
        self.inferencer.transcribe_image(image_path)
    }
}
