// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Keeps the symbol vocabulary next to the checkpoints so that
// training, testing and transcription all use the same
// word ↔ index table.
//
//   checkpoints/w2i.json   { "<PAD>": 0, "<SOS>": 1, "<EOS>": 2, ... }
//
// If no table exists yet, one is built from the training
// transcripts and written to disk.

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::domain::{sample::ScoreSample, vocabulary::Vocabulary};

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: PathBuf::from(dir.into()) }
    }

    fn path(&self) -> PathBuf {
        self.dir.join("w2i.json")
    }

    /// Load the stored vocabulary, or build one from `samples` and save it
    pub fn load_or_build(&self, samples: &[ScoreSample]) -> Result<Vocabulary> {
        if self.path().exists() {
            tracing::info!("Loading existing vocabulary from disk");
            return self.load();
        }

        let vocab = Vocabulary::from_words(samples.iter().flat_map(|s| s.transcript.iter()));
        self.save(&vocab)?;
        tracing::info!(
            "Vocabulary built with {} symbols, saved to '{}'",
            vocab.len(),
            self.path().display()
        );
        Ok(vocab)
    }

    pub fn load(&self) -> Result<Vocabulary> {
        load_vocab_file(self.path())
    }

    pub fn save(&self, vocab: &Vocabulary) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        fs::write(self.path(), serde_json::to_string_pretty(&vocab.to_w2i())?)
            .with_context(|| "Cannot write vocabulary JSON")?;
        Ok(())
    }
}

/// Read a `word → index` JSON table, e.g. a separate evaluation vocabulary.
pub fn load_vocab_file(path: impl AsRef<Path>) -> Result<Vocabulary> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read vocabulary from '{}'", path.display()))?;
    let w2i: HashMap<String, usize> = serde_json::from_str(&json)
        .with_context(|| format!("'{}' is not a word → index table", path.display()))?;
    Vocabulary::from_w2i(w2i)
        .with_context(|| format!("Invalid vocabulary in '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = VocabStore::new(dir.path().to_string_lossy());
        let samples = vec![
            ScoreSample::new("a.png", vec!["note".into(), "rest".into()]),
            ScoreSample::new("b.png", vec!["clef".into()]),
        ];

        let built = store.load_or_build(&samples).unwrap();
        assert_eq!(built.len(), 6);

        // Second call must come from disk, not from the new samples
        let reloaded = store.load_or_build(&[]).unwrap();
        assert_eq!(reloaded, built);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_vocab_file(dir.path().join("nope.json")).is_err());
    }
}
