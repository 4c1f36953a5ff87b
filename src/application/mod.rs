// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one command (train, eval or export).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing here (that's Layer 1)
//   - Only workflow coordination
//
// Every use case takes its data through the DatasetSource
// trait, so tests can hand in an in-memory dataset.

/// The training workflow
pub mod train_use_case;

/// Re-evaluating a finished run from its checkpoints
pub mod eval_use_case;

/// Label list and sprite export
pub mod export_use_case;
