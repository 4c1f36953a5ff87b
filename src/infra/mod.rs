// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything a run writes to disk:
//
//   layout.rs     — results-for-… directory structure
//   checkpoint.rs — model weights with FIFO retention,
//                   checkpoint index, saved TrainConfig
//   metrics.rs    — per-step and per-test CSV summaries
//   run_log.rs    — output.txt, echoed to stdout
//   exporters.rs  — labels TSV, sprite PNG, embeddings TSV
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Output directory layout
pub mod layout;

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Scalar summary CSV logger
pub mod metrics;

/// Human-readable run log
pub mod run_log;

/// Visualization file writers
pub mod exporters;
