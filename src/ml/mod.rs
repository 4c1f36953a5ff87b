// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model, optimiser and backend code lives here.
//
//   backend.rs   — NdArray / Wgpu selection
//   model.rs     — the SAT-6 CNN, built from a const list of
//                  conv stage descriptors:
//                  • 5 conv + ReLU stages, 3 max-pools
//                  • 2 dropout + fully-connected layers (200)
//                  • linear classifier over 6 classes
//   trainer.rs   — step loop: Adam update, periodic test
//                  accuracy, checkpoints
//   evaluator.rs — sharded test accuracy and embedding capture
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Compute backend selection
pub mod backend;

/// SAT-6 CNN architecture
pub mod model;

/// Training loop with periodic evaluation and checkpointing
pub mod trainer;

/// Sharded test-set evaluation
pub mod evaluator;
