// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Sharded test-set accuracy with dropout disabled.
//
//   test set (len L) ──split──▶ S equal shards of L / S samples
//   each shard ──forward in chunks──▶ shard accuracy
//   reported accuracy = mean of the S shard accuracies
//
// The embedding activations of the last shard are kept too, so
// the same block of samples can be exported with its labels and
// sprite. Chunking only bounds memory; it does not change the
// numbers.
//
// Callers pass an inference model (model.valid() during training)
// so no autodiff graph is built here.

use anyhow::{anyhow, ensure, Result};
use burn::prelude::*;

use crate::data::batcher::SatBatcher;
use crate::domain::partition::Partition;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::backend::{BackendKind, CpuBackend, GpuBackend};
use crate::ml::model::{count_correct, Sat6Cnn, Sat6CnnConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct EvalReport {
    pub shard_accuracies: Vec<f64>,
    /// Mean of `shard_accuracies`.
    pub accuracy:         f64,
    /// Flat `[embedding_rows, embedding_width]` activations of the last shard.
    pub embedding:        Vec<f32>,
    pub embedding_rows:   usize,
    pub embedding_width:  usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    shards: usize,
    chunk:  usize,
}

impl Evaluator {
    pub fn new(shards: usize, chunk: usize) -> Result<Self> {
        ensure!(shards > 0, "test_shards must be at least 1");
        ensure!(chunk > 0, "eval_chunk must be at least 1");
        Ok(Self { shards, chunk })
    }

    pub fn evaluate<B: Backend>(
        &self,
        model:   &Sat6Cnn<B>,
        test:    &Partition,
        batcher: &SatBatcher<B>,
    ) -> Result<EvalReport> {
        let shards = test.shard_ranges(self.shards)?;

        let mut shard_accuracies = Vec::with_capacity(shards.len());
        let mut embedding        = Vec::new();
        let mut embedding_width  = 0;
        let last = shards.len() - 1;

        for (i, shard) in shards.iter().enumerate() {
            let mut correct = 0usize;
            let mut start   = shard.start;
            while start < shard.end {
                let end   = (start + self.chunk).min(shard.end);
                let batch = batcher.batch(&test.slice(start..end));
                let out   = model.forward(batch.images);

                if i == last {
                    embedding_width = out.embedding.dims()[1];
                    embedding.extend(to_vec(out.embedding)?);
                }
                correct += count_correct(out.logits, batch.targets);
                start = end;
            }

            let len = shard.end - shard.start;
            let acc = if len == 0 { 0.0 } else { correct as f64 / len as f64 };
            tracing::debug!("Shard {} accuracy {:.4}", i, acc);
            shard_accuracies.push(acc);
        }

        let embedding_rows = shards[last].end - shards[last].start;
        Ok(EvalReport {
            accuracy: mean_accuracy(&shard_accuracies),
            shard_accuracies,
            embedding,
            embedding_rows,
            embedding_width,
        })
    }
}

/// Arithmetic mean; 0 for no shards.
pub fn mean_accuracy(accuracies: &[f64]) -> f64 {
    if accuracies.is_empty() {
        return 0.0;
    }
    accuracies.iter().sum::<f64>() / accuracies.len() as f64
}

fn to_vec<B: Backend>(tensor: Tensor<B, 2>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read embedding activations: {e:?}"))
}

/// Rebuild the model, load the newest checkpoint and evaluate it.
pub fn evaluate_checkpoint(
    backend:     BackendKind,
    checkpoints: &CheckpointManager,
    test:        &Partition,
    evaluator:   &Evaluator,
) -> Result<EvalReport> {
    match backend {
        BackendKind::NdArray => {
            let device = burn::backend::ndarray::NdArrayDevice::default();
            evaluate_saved::<CpuBackend>(checkpoints, test, evaluator, device)
        }
        BackendKind::Wgpu => {
            let device = burn::backend::wgpu::WgpuDevice::default();
            tracing::info!("Using WGPU device: {:?}", device);
            evaluate_saved::<GpuBackend>(checkpoints, test, evaluator, device)
        }
    }
}

fn evaluate_saved<B: Backend>(
    checkpoints: &CheckpointManager,
    test:        &Partition,
    evaluator:   &Evaluator,
    device:      B::Device,
) -> Result<EvalReport> {
    let model: Sat6Cnn<B> = Sat6CnnConfig::new().with_dropout(0.0).init(&device);
    let model = checkpoints.load_model(model, &device)?;
    evaluator.evaluate(&model, test, &SatBatcher::new(device))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::domain::partition::tests::cycling_partition;

    type TestBackend = NdArray;

    #[test]
    fn test_mean_is_order_invariant() {
        let a = [0.5, 0.25, 1.0, 0.75];
        let b = [1.0, 0.75, 0.25, 0.5];
        assert!((mean_accuracy(&a) - mean_accuracy(&b)).abs() < 1e-12);
        assert!((mean_accuracy(&a) - 0.625).abs() < 1e-12);
        assert_eq!(mean_accuracy(&[]), 0.0);
    }

    #[test]
    fn test_report_shapes() {
        let device = Default::default();
        let model: Sat6Cnn<TestBackend> = Sat6CnnConfig::new().init(&device);
        let test = cycling_partition(12);

        // Chunk of 2 splits every 3-sample shard unevenly.
        let evaluator = Evaluator::new(4, 2).unwrap();
        let report = evaluator
            .evaluate(&model, &test, &SatBatcher::new(device))
            .unwrap();

        assert_eq!(report.shard_accuracies.len(), 4);
        assert!(report.shard_accuracies.iter().all(|a| (0.0..=1.0).contains(a)));
        assert!((report.accuracy - mean_accuracy(&report.shard_accuracies)).abs() < 1e-12);
        assert_eq!(report.embedding_rows, 3);
        assert_eq!(report.embedding_width, 200);
        assert_eq!(report.embedding.len(), 3 * 200);
    }

    #[test]
    fn test_blank_images_give_one_prediction_everywhere() {
        // Identical inputs produce one predicted class; with labels cycling
        // through all six classes exactly one in six is correct.
        let device = Default::default();
        let model: Sat6Cnn<TestBackend> = Sat6CnnConfig::new().init(&device);
        let test = cycling_partition(12);

        let report = Evaluator::new(2, 12)
            .unwrap()
            .evaluate(&model, &test, &SatBatcher::new(device))
            .unwrap();
        assert!((report.accuracy - 1.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_indivisible_test_set_is_rejected() {
        let device = Default::default();
        let model: Sat6Cnn<TestBackend> = Sat6CnnConfig::new().init(&device);
        let test = cycling_partition(10);
        let result = Evaluator::new(3, 4).unwrap().evaluate(&model, &test, &SatBatcher::new(device));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_shards_rejected() {
        assert!(Evaluator::new(0, 8).is_err());
        assert!(Evaluator::new(10, 0).is_err());
    }
}
