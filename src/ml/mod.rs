// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model architecture, training and decoding code.
//
//   images [b, 1, H, W]
//       │
//   encoder.rs     — conv blocks, stride 16 × 8 → [b, 256, H/16, W/8]
//       │
//   positional.rs  — 2D sinusoidal encoding added to the grid,
//                    then flattened row-major → [b, H/16·W/8, 256]
//       │
//   decoder.rs     — transformer decoder over the flattened memory
//       │
//   logits [b, vocab, seq]
//
//   model.rs           — composes the three, teacher-forced loss
//   teacher_forcing.rs — random corruption of decoder inputs
//   decoding.rs        — greedy autoregressive decoding
//   evaluator.rs       — per-sample evaluation into epoch metrics
//   trainer.rs         — train + validation loop, checkpoints
//   inferencer.rs      — rebuild from a run directory and decode
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

/// Convolutional image encoder
pub mod encoder;

/// 2D positional encoding and grid flattening
pub mod positional;

/// Autoregressive transformer decoder
pub mod decoder;

/// Full image-to-sequence model
pub mod model;

/// Decoder input corruption for training
pub mod teacher_forcing;

/// Greedy decoding with per-symbol probabilities
pub mod decoding;

/// Evaluation steps and epoch closing
pub mod evaluator;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Inference engine — loads checkpoint and transcribes images
pub mod inferencer;

#[cfg(test)]
pub(crate) mod testing;
