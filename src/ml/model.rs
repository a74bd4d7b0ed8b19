use burn::{
    prelude::*,
    tensor::activation::log_softmax,
};

use crate::ml::{
    decoder::{Decoder, DecoderConfig},
    encoder::{grid_size, Encoder, EncoderConfig, ENCODER_CHANNELS},
    positional::{flatten_grid, PositionalEncoding2d, PositionalEncodingConfig},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct Img2SeqConfig {
    pub vocab_size:       usize,
    pub padding_idx:      usize,
    pub max_input_height: usize,
    pub max_input_width:  usize,
    pub max_seq_len:      usize,
    #[config(default = 1)]
    pub in_channels: usize,
    #[config(default = 8)]
    pub num_layers: usize,
    #[config(default = 4)]
    pub num_heads: usize,
    #[config(default = 1024)]
    pub d_ff: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
    #[config(default = "None")]
    pub attn_window: Option<usize>,
}

impl Img2SeqConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Img2SeqModel<B> {
        let encoder = EncoderConfig::new()
            .with_in_channels(self.in_channels)
            .init(device);

        // The table covers the grid of the largest declared image,
        // so every admissible input can be encoded.
        let (max_h, max_w) = grid_size(self.max_input_height, self.max_input_width);
        let pos_2d = PositionalEncodingConfig::new(ENCODER_CHANNELS, max_h, max_w).init(device);

        let decoder = DecoderConfig::for_encoder(self.vocab_size, self.max_seq_len, self.padding_idx)
            .with_num_layers(self.num_layers)
            .with_num_heads(self.num_heads)
            .with_d_ff(self.d_ff)
            .with_dropout(self.dropout)
            .with_attn_window(self.attn_window)
            .init(device);

        Img2SeqModel {
            encoder,
            pos_2d,
            decoder,
            vocab_size:  self.vocab_size,
            padding_idx: self.padding_idx,
            max_seq_len: self.max_seq_len,
        }
    }
}

#[derive(Module, Debug)]
pub struct Img2SeqModel<B: Backend> {
    pub encoder:     Encoder<B>,
    pub pos_2d:      PositionalEncoding2d<B>,
    pub decoder:     Decoder<B>,
    pub vocab_size:  usize,
    pub padding_idx: usize,
    pub max_seq_len: usize,
}

impl<B: Backend> Img2SeqModel<B> {
    /// images: [batch, C, H, W] → memory [batch, H/16 * W/8, 256]
    ///
    /// Encoder → 2D positional encoding → flatten. Shared by the
    /// teacher-forced and the autoregressive paths so both see the
    /// same memory layout.
    pub fn encode_memory(&self, images: Tensor<B, 4>) -> Tensor<B, 3> {
        let grid = self.encoder.forward(images);
        let grid = self.pos_2d.forward(grid);
        flatten_grid(grid)
    }

    /// Full teacher-forced pass.
    ///
    /// `memory_lens[b]` is the number of valid memory positions of
    /// sample b; pass None when nothing is padded.
    /// Returns logits [batch, vocab_size, seq_len].
    pub fn forward(
        &self,
        images:        Tensor<B, 4>,
        memory_lens:   Option<&[usize]>,
        decoder_input: Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        let memory = self.encode_memory(images);
        self.decoder.forward(decoder_input, memory, memory_lens)
    }

    /// One decoder pass over an already encoded, unpadded memory.
    pub fn decode(&self, tokens: Tensor<B, 2, Int>, memory: Tensor<B, 3>) -> Tensor<B, 3> {
        self.decoder.forward(tokens, memory, None)
    }

    /// Cross-entropy over every non-<PAD> target position.
    pub fn forward_loss(
        &self,
        images:      Tensor<B, 4>,
        memory_lens: Option<&[usize]>,
        y_in:        Tensor<B, 2, Int>,
        y_out:       Tensor<B, 2, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 3>) {
        let logits = self.forward(images, memory_lens, y_in);
        let [batch_size, vocab_size, seq_len] = logits.dims();

        // [N, classes] / [N] for the per-position loss
        let flat_logits = logits
            .clone()
            .swap_dims(1, 2)
            .reshape([batch_size * seq_len, vocab_size]);
        let flat_targets = y_out.reshape([batch_size * seq_len]);

        let loss = masked_cross_entropy(flat_logits, flat_targets, self.padding_idx);
        (loss, logits)
    }
}

/// Mean negative log-likelihood over the targets that are not `padding_idx`.
///
/// logits: [N, classes], targets: [N] → [1]. Padded positions neither
/// contribute to the sum nor to the count; an all-padding batch gives 0.
pub fn masked_cross_entropy<B: Backend>(
    logits:      Tensor<B, 2>,
    targets:     Tensor<B, 1, Int>,
    padding_idx: usize,
) -> Tensor<B, 1> {
    let [n, _] = logits.dims();

    let picked = log_softmax(logits, 1)
        .gather(1, targets.clone().reshape([n, 1]))
        .reshape([n]);
    let keep = targets.equal_elem(padding_idx as i64).bool_not().float();
    let count = keep.clone().sum().clamp_min(1.0);

    (picked.neg() * keep).sum() / count
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::testing::{tiny_config, TestBackend};
    use burn::backend::Autodiff;
    use burn::tensor::TensorData;

    #[test]
    fn test_memory_length_is_grid_area() {
        let device = Default::default();
        let model = tiny_config(5, 10).init::<TestBackend>(&device);
        let images = Tensor::<TestBackend, 4>::zeros([1, 1, 32, 24], &device);
        // 32/16 × 24/8 = 2 × 3
        assert_eq!(model.encode_memory(images).dims(), [1, 6, ENCODER_CHANNELS]);
    }

    #[test]
    fn test_forward_logits_shape() {
        let device = Default::default();
        let model = tiny_config(5, 10).init::<TestBackend>(&device);
        assert_eq!(model.vocab_size, 5);

        let images = Tensor::<TestBackend, 4>::zeros([2, 1, 32, 16], &device);
        let y_in = Tensor::<TestBackend, 1, Int>::from_ints([1, 3, 4, 1, 4, 0], &device)
            .reshape([2, 3]);
        let logits = model.forward(images, Some(&[4, 2][..]), y_in);
        assert_eq!(logits.dims(), [2, 5, 3]);
    }

    #[test]
    fn test_padded_targets_do_not_dilute_the_loss() {
        let device = Default::default();
        // Uniform logits: every real target costs ln(5)
        let logits  = Tensor::<TestBackend, 2>::zeros([4, 5], &device);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([3, 4, 0, 0], &device);

        let loss: f32 = masked_cross_entropy(logits, targets, 0).into_scalar().elem();
        assert!((loss - 5f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_loss_matches_mean_over_real_targets() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![2.0f32, 0.0, 0.0, 0.0, 1.0, 0.0, 3.0, 3.0, 3.0], [3, 3]),
            &device,
        );
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 0], &device);

        // Rows 0 and 1 are real; row 2 is padding
        let row = |values: [f32; 3], t: usize| {
            let norm: f32 = values.iter().map(|v| v.exp()).sum();
            -(values[t].exp() / norm).ln()
        };
        let expected = (row([2.0, 0.0, 0.0], 0) + row([0.0, 1.0, 0.0], 1)) / 2.0;

        let loss: f32 = masked_cross_entropy(logits, targets, 2).into_scalar().elem();
        assert!((loss - expected).abs() < 1e-5);

        // Only padding → zero, not NaN
        let all_pad = Tensor::<TestBackend, 1, Int>::from_ints([2, 2, 2], &device);
        let logits = Tensor::<TestBackend, 2>::ones([3, 3], &device);
        let loss: f32 = masked_cross_entropy(logits, all_pad, 2).into_scalar().elem();
        assert_eq!(loss, 0.0);
    }

    #[test]
    fn test_forward_loss_backpropagates() {
        type Train = Autodiff<TestBackend>;
        let device = Default::default();
        let model = tiny_config(5, 10).init::<Train>(&device);

        let images = Tensor::<Train, 4>::ones([2, 1, 16, 16], &device);
        let y_in  = Tensor::<Train, 1, Int>::from_ints([1, 3, 4, 1, 4, 0], &device).reshape([2, 3]);
        let y_out = Tensor::<Train, 1, Int>::from_ints([3, 4, 2, 4, 2, 0], &device).reshape([2, 3]);

        let (loss, logits) = model.forward_loss(images, None, y_in, y_out);
        assert_eq!(logits.dims(), [2, 5, 3]);
        let value: f32 = loss.clone().into_scalar().elem();
        assert!(value.is_finite() && value > 0.0);

        let grads = loss.backward();
        let head_grad = model.decoder.head.weight.grad(&grads);
        assert!(head_grad.is_some());
    }
}
