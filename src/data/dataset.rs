use anyhow::{ensure, Context, Result};
use burn::data::dataset::Dataset;

use crate::data::image::PreparedImage;
use crate::domain::{sample::ScoreSample, vocabulary::Vocabulary};

/// Largest inputs the model was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLimits {
    pub max_height:  usize,
    pub max_width:   usize,
    pub max_seq_len: usize,
}

impl SampleLimits {
    /// Load an image and check it fits the positional table.
    pub fn load_image(&self, path: &str) -> Result<PreparedImage> {
        let image = PreparedImage::open(path)?;
        ensure!(
            image.height <= self.max_height && image.width <= self.max_width,
            "Image '{}' is {}x{}, larger than the declared maximum {}x{}",
            path, image.height, image.width, self.max_height, self.max_width,
        );
        Ok(image.aligned_to_strides())
    }
}

/// One teacher-forcing example.
/// y_in = [<SOS>, w1 .. wn], y_out = [w1 .. wn, <EOS>]
#[derive(Debug, Clone)]
pub struct TrainSample {
    pub image: PreparedImage,
    pub y_in:  Vec<usize>,
    pub y_out: Vec<usize>,
}

/// One evaluation example; `truth` keeps its leading <SOS>.
#[derive(Debug, Clone)]
pub struct EvalSample {
    pub image: PreparedImage,
    pub truth: Vec<usize>,
}

pub fn build_train_samples(
    samples: &[ScoreSample],
    vocab:   &Vocabulary,
    limits:  SampleLimits,
) -> Result<Vec<TrainSample>> {
    let mut out = Vec::with_capacity(samples.len());
    for sample in samples {
        // y_in holds n+1 tokens and must fit the position embedding
        if sample.symbol_count() + 1 > limits.max_seq_len {
            tracing::warn!(
                "Skipping '{}': {} symbols exceed max_seq_len={}",
                sample.image, sample.symbol_count(), limits.max_seq_len
            );
            continue;
        }
        let ids = vocab
            .encode_with_bounds(&sample.transcript)
            .with_context(|| format!("Cannot encode transcript of '{}'", sample.image))?;
        out.push(TrainSample {
            image: limits.load_image(&sample.image)?,
            y_in:  ids[..ids.len() - 1].to_vec(),
            y_out: ids[1..].to_vec(),
        });
    }
    Ok(out)
}

pub fn build_eval_samples(
    samples:     &[ScoreSample],
    truth_vocab: &Vocabulary,
    limits:      SampleLimits,
) -> Result<Vec<EvalSample>> {
    samples
        .iter()
        .map(|sample| {
            let truth = truth_vocab
                .encode_with_bounds(&sample.transcript)
                .with_context(|| format!("Cannot encode transcript of '{}'", sample.image))?;
            Ok(EvalSample { image: limits.load_image(&sample.image)?, truth })
        })
        .collect()
}

pub struct Img2SeqDataset<I> {
    items: Vec<I>,
}

impl<I> Img2SeqDataset<I> {
    pub fn new(items: Vec<I>) -> Self { Self { items } }
}

impl<I: Clone + Send + Sync> Dataset<I> for Img2SeqDataset<I> {
    fn get(&self, index: usize) -> Option<I> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn write_image(dir: &std::path::Path, name: &str, w: u32, h: u32) -> String {
        let path = dir.join(name);
        GrayImage::from_pixel(w, h, Luma([255u8])).save(&path).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    const LIMITS: SampleLimits = SampleLimits { max_height: 64, max_width: 64, max_seq_len: 4 };

    #[test]
    fn test_train_targets_are_shifted() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = Vocabulary::from_words(["a", "b"]);
        let samples = vec![ScoreSample::new(write_image(dir.path(), "s.png", 20, 10), words(&["a", "b"]))];

        let built = build_train_samples(&samples, &vocab, LIMITS).unwrap();
        assert_eq!(built.len(), 1);
        assert_eq!(built[0].y_in,  vec![1, 3, 4]);
        assert_eq!(built[0].y_out, vec![3, 4, 2]);
        // padded to stride multiples
        assert_eq!((built[0].image.height, built[0].image.width), (16, 24));
    }

    #[test]
    fn test_overlong_transcripts_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = Vocabulary::from_words(["a"]);
        let samples = vec![ScoreSample::new(
            write_image(dir.path(), "s.png", 8, 8),
            words(&["a", "a", "a", "a"]),
        )];
        assert!(build_train_samples(&samples, &vocab, LIMITS).unwrap().is_empty());
    }

    #[test]
    fn test_oversized_images_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = Vocabulary::from_words(["a"]);
        let samples = vec![ScoreSample::new(write_image(dir.path(), "big.png", 65, 8), words(&["a"]))];
        assert!(build_train_samples(&samples, &vocab, LIMITS).is_err());
        assert!(build_eval_samples(&samples, &vocab, LIMITS).is_err());
    }

    #[test]
    fn test_eval_truth_keeps_sos() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = Vocabulary::from_words(["a", "b"]);
        let samples = vec![ScoreSample::new(
            write_image(dir.path(), "s.png", 8, 8),
            words(&["b", "a", "b", "a", "b"]),
        )];
        let built = build_eval_samples(&samples, &vocab, LIMITS).unwrap();
        assert_eq!(built[0].truth, vec![1, 4, 3, 4, 3, 4, 2]);

        let dataset = Img2SeqDataset::new(built);
        assert_eq!(dataset.len(), 1);
        assert!(dataset.get(1).is_none());
    }
}
