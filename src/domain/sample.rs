// ============================================================
// Layer 3 — ScoreSample Domain Type
// ============================================================
// One entry of a dataset manifest: the image of a staff / text
// line and its ground-truth transcription as a list of symbols.
//
// Example manifest entry:
//   { "image": "img/000123.png",
//     "transcript": ["clef.G", "note.C4_quarter", "barline"] }

use serde::{Deserialize, Serialize};

/// A labelled image in symbolic form, before tokenisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSample {
    /// Path to the image; relative paths are resolved against
    /// the manifest's directory by the loader
    pub image: String,

    /// Ground-truth symbols, without <SOS>/<EOS>
    pub transcript: Vec<String>,
}

impl ScoreSample {
    pub fn new(image: impl Into<String>, transcript: Vec<String>) -> Self {
        Self { image: image.into(), transcript }
    }

    /// Number of symbols in the transcript
    pub fn symbol_count(&self) -> usize {
        self.transcript.len()
    }
}
