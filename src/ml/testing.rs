//! Shared fixtures for the ml tests.

use burn::backend::NdArray;

use crate::ml::model::Img2SeqConfig;

pub type TestBackend = NdArray<f32>;

/// A model small enough to run on the CPU in tests: images up to
/// 64x64, one decoder layer.
pub fn tiny_config(vocab_size: usize, max_seq_len: usize) -> Img2SeqConfig {
    Img2SeqConfig::new(vocab_size, 0, 64, 64, max_seq_len)
        .with_num_layers(1)
        .with_num_heads(2)
        .with_d_ff(32)
}
