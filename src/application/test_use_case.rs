// ============================================================
// Layer 2 — TestUseCase
// ============================================================
// Evaluates the best checkpoint on a held-out manifest:
//
//   Step 1: Rebuild model + vocabulary from the run directory
//   Step 2: Load the test manifest and evaluation vocabulary
//   Step 3: Greedy-decode every image, close the "test" epoch
//           with a random sample shown

use anyhow::Result;
use rand::{rngs::StdRng, SeedableRng};

use crate::data::{dataset::build_eval_samples, loader::ManifestLoader};
use crate::domain::{predictions::EpochSummary, traits::SampleSource};
use crate::infra::{checkpoint::CheckpointManager, vocab_store::load_vocab_file};
use crate::ml::inferencer::Inferencer;

#[derive(Debug, Clone)]
pub struct TestConfig {
    pub manifest:       String,
    pub checkpoint_dir: String,
    pub eval_vocab:     Option<String>,
    pub seed:           u64,
}

pub struct TestUseCase {
    config: TestConfig,
}

impl TestUseCase {
    pub fn new(config: TestConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<EpochSummary> {
        let cfg = &self.config;

        let ckpt       = CheckpointManager::new(&cfg.checkpoint_dir);
        let inferencer = Inferencer::from_checkpoint(&ckpt)?;

        let raw = ManifestLoader::new(&cfg.manifest).load_all()?;
        let truth_vocab = cfg.eval_vocab.as_deref().map(|p| load_vocab_file(p)).transpose()?;
        let samples = build_eval_samples(
            &raw,
            truth_vocab.as_ref().unwrap_or(inferencer.vocab()),
            inferencer.limits(),
        )?;
        tracing::info!("Evaluating {} test samples", samples.len());

        let mut rng = StdRng::seed_from_u64(cfg.seed);
        inferencer.evaluate(&samples, truth_vocab.as_ref(), "test", true, &mut rng)
    }
}
