// ============================================================
// Layer 4 — SAT-6 Batcher
// ============================================================
// Converts a SampleSlice into tensors on a given device.
//
//   images:  [N, 28, 28, 4] NHWC  →  permute  →  [N, 4, 28, 28] NCHW
//   targets: one-hot rows [N, 6]  →  arg-max  →  [N] class indices
//
// Burn's Conv2d expects channels first, while the dataset keeps
// channels last, so the permute happens here once per batch.
// The loss and accuracy only need class indices, which is all
// the one-hot rows encode.
//
// Reference: Burn Book §4 (Batcher)

use burn::prelude::*;

use crate::domain::partition::{SampleSlice, CHANNELS, IMAGE_SIDE};

// ─── SatBatch ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct SatBatch<B: Backend> {
    /// Pixel data — shape: [batch_size, 4, 28, 28]
    pub images: Tensor<B, 4>,

    /// Class index per sample — shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

// ─── SatBatcher ───────────────────────────────────────────────────────────────
/// Holds the target device so tensors are created where the model lives.
#[derive(Clone, Debug)]
pub struct SatBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SatBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    pub fn batch(&self, samples: &SampleSlice<'_>) -> SatBatch<B> {
        let n = samples.len();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(samples.images().to_vec(), [n, IMAGE_SIDE, IMAGE_SIDE, CHANNELS]),
            &self.device,
        )
        .permute([0, 3, 1, 2]);

        let classes: Vec<i32> = samples.classes().into_iter().map(|c| c as i32).collect();
        let targets = Tensor::<B, 1, Int>::from_ints(classes.as_slice(), &self.device);

        SatBatch { images, targets }
    }
}
