// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer never opens dataset files itself; it
// asks a DatasetSource for the two partitions.
//
// Implementations:
//   - SatLoader         → reads the packed MAT file from disk
//   - in-memory sources → used by tests to drive the full
//                         training pipeline on synthetic data

use anyhow::Result;

use crate::domain::partition::SatDataset;

// ─── DatasetSource ────────────────────────────────────────────────────────────
/// Anything that can produce the train and test partitions.
///
/// Loading happens once per run; a failure here is fatal
/// because nothing downstream can proceed without data.
pub trait DatasetSource {
    /// Load both partitions into memory.
    fn load(&self) -> Result<SatDataset>;
}
