// ============================================================
// Layer 5 — Autoregressive Transformer Decoder
// ============================================================
// Predicts the next symbol at every position of the target
// sequence while cross-attending to the flattened image memory.
//
//   tokens [batch, seq]           memory [batch, H*W, 256]
//       │                              │
//   token emb + position emb           │
//       │                              │
//       ▼                              ▼
//   TransformerDecoder (masked self-attn → cross-attn → FFN) × N
//       │
//   Linear → [batch, seq, vocab] → [batch, vocab, seq]
//
// Masks:
//   - self-attention: causal, optionally limited to the last
//     `attn_window` positions
//   - target padding: every <PAD> token
//   - memory padding: positions ≥ memory_lens[b], when given

use burn::{
    nn::{
        transformer::{TransformerDecoder, TransformerDecoderConfig, TransformerDecoderInput},
        Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig,
    },
    prelude::*,
};

use crate::ml::encoder::ENCODER_CHANNELS;

#[derive(Config, Debug)]
pub struct DecoderConfig {
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    pub padding_idx: usize,
    #[config(default = 256)]
    pub d_model: usize,
    #[config(default = 8)]
    pub num_layers: usize,
    #[config(default = 4)]
    pub num_heads: usize,
    #[config(default = 1024)]
    pub d_ff: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
    /// How many past positions (self included) each token may attend to.
    /// None attends to the whole prefix.
    #[config(default = "None")]
    pub attn_window: Option<usize>,
}

impl DecoderConfig {
    /// Decoder sized to attend over the encoder grid
    pub fn for_encoder(vocab_size: usize, max_seq_len: usize, padding_idx: usize) -> Self {
        Self::new(vocab_size, max_seq_len, padding_idx).with_d_model(ENCODER_CHANNELS)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Decoder<B> {
        let transformer = TransformerDecoderConfig::new(
            self.d_model, self.d_ff, self.num_heads, self.num_layers,
        )
        .with_dropout(self.dropout)
        .init(device);

        Decoder {
            token_embedding:    EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            position_embedding: EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device),
            transformer,
            head:        LinearConfig::new(self.d_model, self.vocab_size).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
            padding_idx: self.padding_idx,
            attn_window: self.attn_window,
            max_seq_len: self.max_seq_len,
        }
    }
}

#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub transformer:        TransformerDecoder<B>,
    pub head:               Linear<B>,
    pub dropout:            Dropout,
    pub padding_idx:        usize,
    pub attn_window:        Option<usize>,
    pub max_seq_len:        usize,
}

impl<B: Backend> Decoder<B> {
    /// tokens: [batch, seq], memory: [batch, mem_len, d_model]
    /// → logits [batch, vocab_size, seq]
    pub fn forward(
        &self,
        tokens:      Tensor<B, 2, Int>,
        memory:      Tensor<B, 3>,
        memory_lens: Option<&[usize]>,
    ) -> Tensor<B, 3> {
        let [batch_size, seq_len] = tokens.dims();
        let [_, mem_len, _] = memory.dims();
        let device = tokens.device();

        let tok_emb = self.token_embedding.forward(tokens.clone());
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);
        let x = self.dropout.forward(tok_emb + pos_emb);

        let mut input = TransformerDecoderInput::new(x, memory)
            .target_mask_attn(self_attention_mask::<B>(batch_size, seq_len, self.attn_window, &device))
            .target_mask_pad(tokens.equal_elem(self.padding_idx as i64));
        if let Some(lens) = memory_lens {
            input = input.memory_mask_pad(memory_padding_mask::<B>(lens, mem_len, &device));
        }

        let hidden = self.transformer.forward(input);
        self.head.forward(hidden).swap_dims(1, 2)
    }
}

/// [batch, seq, seq] mask, `true` where query i must not see key j:
/// every future key, plus keys `window` or more steps in the past.
pub fn self_attention_mask<B: Backend>(
    batch_size: usize,
    seq_len:    usize,
    window:     Option<usize>,
    device:     &B::Device,
) -> Tensor<B, 3, Bool> {
    let mut mask = Vec::with_capacity(batch_size * seq_len * seq_len);
    for _ in 0..batch_size {
        for i in 0..seq_len {
            for j in 0..seq_len {
                let future = j > i;
                let too_far = !future && window.is_some_and(|w| i - j >= w);
                mask.push(future || too_far);
            }
        }
    }
    Tensor::<B, 1, Bool>::from_data(mask.as_slice(), device).reshape([batch_size, seq_len, seq_len])
}

/// [batch, mem_len] mask, `true` on memory positions past the valid length.
pub fn memory_padding_mask<B: Backend>(
    memory_lens: &[usize],
    mem_len:     usize,
    device:      &B::Device,
) -> Tensor<B, 2, Bool> {
    let mask: Vec<bool> = memory_lens
        .iter()
        .flat_map(|&valid| (0..mem_len).map(move |p| p >= valid))
        .collect();
    Tensor::<B, 1, Bool>::from_data(mask.as_slice(), device).reshape([memory_lens.len(), mem_len])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn bools<const D: usize>(t: Tensor<TestBackend, D, Bool>) -> Vec<bool> {
        t.into_data().iter::<bool>().collect()
    }

    #[test]
    fn test_causal_mask() {
        let device = Default::default();
        let mask = bools(self_attention_mask::<TestBackend>(1, 3, None, &device));
        #[rustfmt::skip]
        let expected = vec![
            false, true,  true,
            false, false, true,
            false, false, false,
        ];
        assert_eq!(mask, expected);
    }

    #[test]
    fn test_windowed_mask() {
        let device = Default::default();
        let mask = bools(self_attention_mask::<TestBackend>(1, 4, Some(2), &device));
        #[rustfmt::skip]
        let expected = vec![
            false, true,  true,  true,
            false, false, true,  true,
            true,  false, false, true,
            true,  true,  false, false,
        ];
        assert_eq!(mask, expected);
    }

    #[test]
    fn test_memory_padding_mask() {
        let device = Default::default();
        let mask = bools(memory_padding_mask::<TestBackend>(&[2, 4], 4, &device));
        assert_eq!(mask, vec![false, false, true, true, false, false, false, false]);
    }

    #[test]
    fn test_logits_shape() {
        let device = Default::default();
        let decoder = DecoderConfig::new(7, 10, 0)
            .with_d_model(32)
            .with_num_layers(1)
            .with_num_heads(2)
            .with_d_ff(64)
            .init::<TestBackend>(&device);
        let tokens = Tensor::<TestBackend, 1, Int>::from_ints([1, 3, 4, 0, 1, 4, 0, 0], &device)
            .reshape([2, 4]);
        let memory = Tensor::<TestBackend, 3>::zeros([2, 6, 32], &device);
        let logits = decoder.forward(tokens, memory, Some(&[6, 3][..]));
        assert_eq!(logits.dims(), [2, 7, 4]);
    }
}
