// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the run directory on disk:
//
//   checkpoint.rs   — Model weights (CompactRecorder), the
//                     latest/best epoch pointers and the
//                     TrainConfig used to rebuild the model.
//
//   vocab_store.rs  — Vocabulary persistence (w2i.json), so
//                     training, testing and transcription all
//                     use the same symbol indices.
//
//   metrics.rs      — Per-epoch CSV log of training loss and
//                     validation error rates.

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Vocabulary building, saving, and loading
pub mod vocab_store;

/// Training metrics CSV logger
pub mod metrics;
