// ============================================================
// Layer 4 — Image/Sequence Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<TrainSample>
// into one training batch.
//
// Images differ in size, so each one is zero-padded (= blank
// paper) on the bottom/right to the largest height and width in
// the batch. Sequences are padded with <PAD>.
//
// Memory lengths:
//   The encoder turns the padded batch into a grid of
//   rows = H_batch/16 and cols = W_batch/8, flattened row by row.
//   Rows below a sample's own image height are pure padding and
//   form a suffix of its memory sequence, so the valid length is
//
//       memory_lens[i] = ceil(h_i / 16) * cols
//
//   Width padding inside valid rows is left visible; it looks
//   exactly like the white margin of the page.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::TrainSample;
use crate::ml::encoder::grid_size;

#[derive(Debug, Clone)]
pub struct Img2SeqBatch<B: Backend> {
    /// [batch, 1, H, W]
    pub images: Tensor<B, 4>,

    /// Valid memory positions per sample
    pub memory_lens: Vec<usize>,

    /// [batch, seq_len], starts with <SOS>
    pub y_in: Tensor<B, 2, Int>,

    /// [batch, seq_len], ends with <EOS>
    pub y_out: Tensor<B, 2, Int>,
}

#[derive(Clone, Debug)]
pub struct Img2SeqBatcher<B: Backend> {
    pub device:      B::Device,
    pub padding_idx: usize,
}

impl<B: Backend> Img2SeqBatcher<B> {
    pub fn new(device: B::Device, padding_idx: usize) -> Self {
        Self { device, padding_idx }
    }

    fn pad_sequences(&self, seqs: impl Iterator<Item = Vec<usize>>, seq_len: usize) -> Vec<i64> {
        seqs.flat_map(|mut s| {
            s.resize(seq_len, self.padding_idx);
            s.into_iter().map(|t| t as i64)
        })
        .collect()
    }
}

impl<B: Backend> Batcher<TrainSample, Img2SeqBatch<B>> for Img2SeqBatcher<B> {
    fn batch(&self, items: Vec<TrainSample>) -> Img2SeqBatch<B> {
        let batch_size = items.len();
        let height  = items.iter().map(|s| s.image.height).max().unwrap_or(0);
        let width   = items.iter().map(|s| s.image.width).max().unwrap_or(0);
        let seq_len = items.iter().map(|s| s.y_in.len()).max().unwrap_or(0);

        let (_, cols) = grid_size(height, width);
        let memory_lens = items
            .iter()
            .map(|s| grid_size(s.image.height, s.image.width).0 * cols)
            .collect();

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.image.padded_to(height, width).pixels)
            .collect();
        let y_in  = self.pad_sequences(items.iter().map(|s| s.y_in.clone()), seq_len);
        let y_out = self.pad_sequences(items.into_iter().map(|s| s.y_out), seq_len);

        Img2SeqBatch {
            images: Tensor::from_data(TensorData::new(pixels, [batch_size, 1, height, width]), &self.device),
            memory_lens,
            y_in:  Tensor::from_data(TensorData::new(y_in, [batch_size, seq_len]), &self.device),
            y_out: Tensor::from_data(TensorData::new(y_out, [batch_size, seq_len]), &self.device),
        }
    }
}
