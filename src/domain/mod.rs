// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits describing what the system
// works with: symbol vocabularies, transcribed score samples,
// evaluation metrics and the per-epoch prediction ledger.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Everything here can be unit tested without a tensor backend.

/// Bidirectional word ↔ index mapping with reserved tokens
pub mod vocabulary;

/// One transcribed image as listed in a manifest
pub mod sample;

/// Per-epoch (truth, prediction) accumulator
pub mod predictions;

/// Edit-distance based sequence metrics
pub mod metrics;

/// Core abstractions (traits) that other layers implement
pub mod traits;
