// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Step-driven train / evaluate / checkpoint loop.
//
//   for step in 0..steps:
//     batch  ← next contiguous slice of the training partition
//     loss   ← cross-entropy with dropout active
//     model  ← one Adam update
//     scalars.csv ← (step, loss, batch accuracy)
//     every one_epoch steps     → "EPOCH: n" line
//     every test_interval steps → sharded test accuracy,
//                                 embeddings.tsv, checkpoint
//   final evaluation pass
//
// Both cadences fire at step 0. The epoch number shown is
// step / one_epoch + 1.
//
// Key Burn 0.20 insight:
//   - Training uses Autodiff<backend> for gradients
//   - model.valid() returns the model on the inner backend,
//     where dropout is a no-op
//   - argmax(1) returns [batch, 1] so we flatten before .equal()
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    backend::Autodiff,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::SatBatcher, iterator::BatchIterator};
use crate::domain::partition::SatDataset;
use crate::infra::{
    checkpoint::CheckpointManager,
    exporters::write_embeddings,
    layout::OutputLayout,
    metrics::{MetricsLogger, StepMetrics},
    run_log::RunLog,
};
use crate::ml::backend::{BackendKind, CpuBackend, GpuBackend};
use crate::ml::evaluator::{EvalReport, Evaluator};
use crate::ml::model::{accuracy, Sat6Cnn, Sat6CnnConfig};

/// Everything the loop writes to.
pub struct TrainSinks {
    pub layout:      OutputLayout,
    pub run_log:     RunLog,
    pub metrics:     MetricsLogger,
    pub checkpoints: CheckpointManager,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub steps:          usize,
    /// Loss of the last training minibatch, if any step ran.
    pub last_loss:      Option<f64>,
    pub final_accuracy: f64,
    pub checkpoints:    Vec<usize>,
}

pub fn run_training(
    cfg:     &TrainConfig,
    dataset: &SatDataset,
    sinks:   &mut TrainSinks,
) -> Result<TrainSummary> {
    match cfg.backend {
        BackendKind::NdArray => {
            let device = burn::backend::ndarray::NdArrayDevice::default();
            tracing::info!("Using NdArray device: {:?}", device);
            train_loop::<Autodiff<CpuBackend>>(cfg, dataset, sinks, device)
        }
        BackendKind::Wgpu => {
            let device = burn::backend::wgpu::WgpuDevice::default();
            tracing::info!("Using WGPU device: {:?}", device);
            train_loop::<Autodiff<GpuBackend>>(cfg, dataset, sinks, device)
        }
    }
}

fn train_loop<B: AutodiffBackend>(
    cfg:     &TrainConfig,
    dataset: &SatDataset,
    sinks:   &mut TrainSinks,
    device:  B::Device,
) -> Result<TrainSummary> {

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = Sat6CnnConfig::new().with_dropout(cfg.dropout);
    let mut model: Sat6Cnn<B> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: {} conv stages, {} parameters",
        model.stages.len(),
        model.num_params()
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new()
        .with_beta_1(0.9)
        .with_beta_2(0.999)
        .with_epsilon(1e-8)
        .init();

    let train_batcher = SatBatcher::<B>::new(device.clone());
    let eval_batcher  = SatBatcher::<B::InnerBackend>::new(device.clone());
    let evaluator     = Evaluator::new(cfg.test_shards, cfg.eval_chunk)?;

    let steps         = cfg.steps();
    let one_epoch     = cfg.one_epoch().max(1);
    let test_interval = cfg.test_interval().max(1);
    let mut train_iter = BatchIterator::new(&dataset.train);
    let mut last_loss  = None;

    tracing::info!(
        "Training for {} steps (batch {}, epoch every {} steps, test every {} steps)",
        steps, cfg.batch_size, one_epoch, test_interval
    );

    // ── Step loop ─────────────────────────────────────────────────────────────
    for step in 0..steps {
        let samples = train_iter.next_batch(cfg.batch_size);
        let range   = samples.indices();
        let batch   = train_batcher.batch(&samples);
        let targets = batch.targets.clone();

        let (loss, output) = model.forward_loss(batch);
        let loss_val: f64  = loss.clone().into_scalar().elem::<f64>();
        let batch_acc      = accuracy(output.logits, targets);
        last_loss = Some(loss_val);

        // Backward pass + Adam update
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optim.step(cfg.lr, model, grads);

        sinks.metrics.log_step(&StepMetrics::new(step, loss_val, batch_acc))?;
        tracing::debug!("step {} samples {:?} loss {:.4} acc {:.4}", step, range, loss_val, batch_acc);

        let epoch = step / one_epoch + 1;
        if step % one_epoch == 0 {
            sinks.run_log.epoch(epoch)?;
        }

        if step % test_interval == 0 {
            let report = evaluator.evaluate(&model.valid(), &dataset.test, &eval_batcher)?;
            sinks.run_log.test_result(epoch, step, loss_val, report.accuracy)?;
            record_evaluation(sinks, step, &report)?;
            sinks.checkpoints.save_model(&model, step)?;
            tracing::info!("Checkpoint saved for step {}", step);
        }
    }

    // ── Final evaluation ──────────────────────────────────────────────────────
    let report = evaluator.evaluate(&model.valid(), &dataset.test, &eval_batcher)?;
    record_evaluation(sinks, steps, &report)?;
    tracing::info!("Final test accuracy: {:.2}%", report.accuracy * 100.0);

    Ok(TrainSummary {
        steps,
        last_loss,
        final_accuracy: report.accuracy,
        checkpoints:    sinks.checkpoints.retained(),
    })
}

fn record_evaluation(sinks: &mut TrainSinks, step: usize, report: &EvalReport) -> Result<()> {
    sinks.metrics.log_test(step, report.accuracy)?;
    tracing::debug!(
        "Writing {} embedding rows of width {} for step {}",
        report.embedding_rows, report.embedding_width, step
    );
    write_embeddings(
        &sinks.layout.embeddings(),
        &report.embedding,
        report.embedding_width.max(1),
    )
}
