// ============================================================
// Layer 2 — EvalUseCase
// ============================================================
// Re-evaluates a finished run:
//
//   Step 1: Reopen trained_models/ and read train_config.json
//   Step 2: Load the dataset
//   Step 3: Rebuild the model from the newest checkpoint
//   Step 4: Sharded test accuracy, same shards as training

use std::path::PathBuf;

use anyhow::Result;

use crate::domain::traits::DatasetSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::layout::models_dir;
use crate::ml::backend::BackendKind;
use crate::ml::evaluator::{evaluate_checkpoint, EvalReport, Evaluator};

pub struct EvalUseCase {
    results_dir: PathBuf,
    backend:     Option<BackendKind>,
}

impl EvalUseCase {
    /// `backend` overrides the one recorded in the run's config.
    pub fn new(results_dir: impl Into<PathBuf>, backend: Option<BackendKind>) -> Self {
        Self { results_dir: results_dir.into(), backend }
    }

    pub fn execute(&self, source: &dyn DatasetSource) -> Result<EvalReport> {
        // ── Step 1: Reopen the checkpoint directory ───────────────────────────
        let checkpoints = CheckpointManager::open(models_dir(&self.results_dir))?;
        let cfg         = checkpoints.load_config()?;
        let backend     = self.backend.unwrap_or(cfg.backend);

        // ── Step 2: Load the dataset ──────────────────────────────────────────
        let data = source.load()?;
        cfg.check_dataset(&data)?;

        // ── Step 3 + 4: Restore weights and evaluate ──────────────────────────
        let evaluator = Evaluator::new(cfg.test_shards, cfg.eval_chunk)?;
        let report = evaluate_checkpoint(backend, &checkpoints, &data.test, &evaluator)?;

        tracing::info!(
            "Evaluated {} shards from '{}': {:.2}%",
            report.shard_accuracies.len(),
            self.results_dir.display(),
            report.accuracy * 100.0
        );
        Ok(report)
    }
}
