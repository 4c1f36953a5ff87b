// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a full training run in order:
//
//   Step 1: Validate the configuration
//   Step 2: Load the dataset                (Layer 4 - data)
//   Step 3: Check partition shapes          (Layer 3 - domain)
//   Step 4: Create the output layout        (Layer 6 - infra)
//   Step 5: Open the run log, write header  (Layer 6 - infra)
//   Step 6: Open sinks, save config         (Layer 6 - infra)
//   Step 7: Run the training loop           (Layer 5 - ml)
//   Step 8: Write elapsed time
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::domain::partition::SatDataset;
use crate::domain::traits::DatasetSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    layout::OutputLayout,
    metrics::MetricsLogger,
    run_log::RunLog,
};
use crate::ml::backend::BackendKind;
use crate::ml::trainer::{run_training, TrainSinks, TrainSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run. Saved next to the checkpoints
// so `eval` can find the data and backend that were used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_path:        PathBuf,
    /// Directory the results-for-… folder is created in.
    pub output_root:      PathBuf,
    /// Training samples per epoch; drives the step count.
    pub num_samples:      usize,
    /// Samples per test shard.
    pub num_test_samples: usize,
    pub epochs:           usize,
    pub batch_size:       usize,
    pub lr:               f64,
    /// Recorded in the run name only; Adam has no decay term.
    pub decay:            f64,
    /// Recorded in the run name only.
    pub momentum:         f64,
    /// Drop probability of both dropout layers.
    pub dropout:          f64,
    pub models_to_keep:   usize,
    pub test_shards:      usize,
    /// Samples per forward pass during evaluation.
    pub eval_chunk:       usize,
    pub version:          String,
    pub backend:          BackendKind,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:        PathBuf::from("sat-6-full.mat"),
            output_root:      PathBuf::from("."),
            num_samples:      324_000,
            num_test_samples: 8_100,
            epochs:           1,
            batch_size:       128,
            lr:               0.0001,
            decay:            0.9,
            momentum:         0.0,
            dropout:          0.5,
            models_to_keep:   5,
            test_shards:      10,
            eval_chunk:       1_024,
            version:          "sat6-test".to_string(),
            backend:          BackendKind::NdArray,
        }
    }
}

impl TrainConfig {
    /// Total optimizer updates.
    pub fn steps(&self) -> usize {
        self.num_samples * self.epochs / self.batch_size.max(1)
    }

    /// Steps per pass over `num_samples`.
    pub fn one_epoch(&self) -> usize {
        self.num_samples / self.batch_size.max(1)
    }

    /// Steps between evaluations and checkpoints.
    pub fn test_interval(&self) -> usize {
        self.batch_size * 5
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "batch_size must be at least 1");
        ensure!(self.test_shards > 0, "test_shards must be at least 1");
        ensure!(self.models_to_keep > 0, "models_to_keep must be at least 1");
        ensure!(self.eval_chunk > 0, "eval_chunk must be at least 1");
        ensure!(
            (0.0..1.0).contains(&self.dropout),
            "dropout must be a probability in [0, 1), got {}",
            self.dropout
        );
        ensure!(self.lr > 0.0, "learning rate must be positive, got {}", self.lr);
        ensure!(
            self.num_samples.checked_mul(self.epochs).is_some(),
            "num_samples ({}) times epochs ({}) overflows the step counter",
            self.num_samples, self.epochs
        );
        ensure!(
            self.batch_size.checked_mul(5).is_some(),
            "batch_size {} is too large for the test interval",
            self.batch_size
        );
        Ok(())
    }

    /// Reject datasets the loop cannot run on.
    pub fn check_dataset(&self, data: &SatDataset) -> Result<()> {
        ensure!(!data.train.is_empty(), "training partition is empty");
        ensure!(
            data.test.len() % self.test_shards == 0,
            "test partition of {} samples cannot be split into {} equal shards",
            data.test.len(),
            self.test_shards
        );

        let shard = data.test.len() / self.test_shards;
        if shard != self.num_test_samples {
            tracing::warn!(
                "Test shards hold {} samples, configuration says {}",
                shard,
                self.num_test_samples
            );
        }
        if data.train.len() != self.num_samples {
            tracing::warn!(
                "Training partition has {} samples, steps are computed for {}",
                data.train.len(),
                self.num_samples
            );
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Execute the full training pipeline end to end.
    pub fn execute(&self, source: &dyn DatasetSource) -> Result<TrainSummary> {
        let cfg     = &self.config;
        let started = Instant::now();

        // ── Step 1: Validate the configuration ────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Load the dataset ──────────────────────────────────────────
        let data = source.load()?;

        // ── Step 3: Check partition shapes ────────────────────────────────────
        // Shard divisibility is checked now rather than at the first test.
        cfg.check_dataset(&data)?;

        // ── Step 4: Create the output layout ──────────────────────────────────
        let layout = OutputLayout::for_config(cfg);
        layout.create()?;
        tracing::info!("Writing results to '{}'", layout.root.display());

        // ── Step 5: Open the run log and write the header ─────────────────────
        let mut run_log = RunLog::create(&layout.run_log())?;
        run_log.write_header(cfg)?;

        // ── Step 6: Open summary sinks and save config ────────────────────────
        let metrics     = MetricsLogger::create(&layout.logs)?;
        let checkpoints = CheckpointManager::new(&layout.models, cfg.models_to_keep)?;
        checkpoints.save_config(cfg)?;

        // ── Step 7: Run the training loop (Layer 5) ───────────────────────────
        let mut sinks = TrainSinks { layout, run_log, metrics, checkpoints };
        let summary = run_training(cfg, &data, &mut sinks)?;

        // ── Step 8: Elapsed time ──────────────────────────────────────────────
        sinks.metrics.flush()?;
        sinks.run_log.elapsed(started.elapsed().as_secs_f64())?;

        Ok(summary)
    }
}
