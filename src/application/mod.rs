// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one user-facing goal.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination

// The training workflow
pub mod train_use_case;

// Evaluation of a trained checkpoint on a test manifest
pub mod test_use_case;

// Single-image transcription
pub mod transcribe_use_case;
