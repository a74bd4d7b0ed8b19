// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a manifest on disk and a tensor batch.
//
//   manifest.json
//       │
//       ▼
//   ManifestLoader    → ScoreSample { image path, symbols }
//       │
//       ▼
//   PreparedImage     → grayscale, inverted, stride-aligned pixels
//       │
//       ▼
//   build_*_samples   → token ids via the Vocabulary
//       │
//       ▼
//   Img2SeqDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   Img2SeqBatcher    → padded image / sequence tensors
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads JSON manifests of labelled images
pub mod loader;

/// Grayscale loading, normalisation and padding
pub mod image;

/// Training / evaluation samples and Burn's Dataset impl
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
