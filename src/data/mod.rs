// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between sat-6-full.mat on disk and tensors on a
// device:
//
//   sat-6-full.mat
//       │
//       ▼
//   MatFile          → parses Level-5 elements, inflates zlib
//       │
//       ▼
//   SatLoader        → transposes to NHWC, scales to [0, 1]
//       │
//       ▼
//   Partition        → (Layer 3) train and test halves
//       │
//       ▼
//   BatchIterator    → contiguous slices, wrapping cursor
//       │
//       ▼
//   SatBatcher       → NCHW image tensor + class targets
//
// Each module is responsible for exactly one step.

/// MATLAB Level-5 MAT-file reader
pub mod mat;

/// Loads the four SAT-6 arrays into partitions
pub mod loader;

/// Wrapping batch cursor over a partition
pub mod iterator;

/// Turns sample slices into tensor batches
pub mod batcher;
