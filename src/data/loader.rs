// ============================================================
// Layer 4 — Manifest Loader
// ============================================================
// Reads a dataset manifest: a JSON array of labelled images.
//
//   [
//     { "image": "img/0001.png", "transcript": ["clef.G", "barline"] },
//     { "image": "/abs/path/0002.png", "transcript": ["note.C4"] }
//   ]
//
// Relative image paths are resolved against the directory of
// the manifest, so a dataset folder can be moved as a whole.

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::sample::ScoreSample;
use crate::domain::traits::SampleSource;

pub struct ManifestLoader {
    path: PathBuf,
}

impl ManifestLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn resolve(&self, image: &str) -> String {
        let image_path = Path::new(image);
        if image_path.is_absolute() {
            return image.to_string();
        }
        let base = self.path.parent().unwrap_or_else(|| Path::new("."));
        base.join(image_path).to_string_lossy().into_owned()
    }
}

impl SampleSource for ManifestLoader {
    fn load_all(&self) -> Result<Vec<ScoreSample>> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read manifest '{}'", self.path.display()))?;
        let samples: Vec<ScoreSample> = serde_json::from_str(&json)
            .with_context(|| format!("Manifest '{}' is not a valid sample list", self.path.display()))?;

        tracing::info!("Loaded {} samples from '{}'", samples.len(), self.path.display());

        Ok(samples
            .into_iter()
            .map(|s| ScoreSample { image: self.resolve(&s.image), ..s })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_are_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("train.json");
        fs::write(
            &manifest,
            r#"[{"image": "img/a.png", "transcript": ["x", "y"]},
                {"image": "/data/b.png", "transcript": []}]"#,
        )
        .unwrap();

        let samples = ManifestLoader::new(&manifest).load_all().unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(
            Path::new(&samples[0].image),
            dir.path().join("img/a.png").as_path()
        );
        assert_eq!(samples[0].transcript, vec!["x", "y"]);
        assert_eq!(samples[1].image, "/data/b.png");
    }

    #[test]
    fn test_missing_or_malformed_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ManifestLoader::new(dir.path().join("none.json")).load_all().is_err());

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ not json").unwrap();
        assert!(ManifestLoader::new(&bad).load_all().is_err());
    }
}
