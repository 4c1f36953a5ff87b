// Where a training run puts its files:
//
//   results-for-<epochs>e<batch>bs-<version>/
//     output.txt
//     logs/<log-name>/          scalar summaries, embeddings
//     trained_models/           checkpoints, index, config
//
// The log name encodes the optimiser settings, e.g.
// lr0.0001d0.9m0do0.5, so runs with different settings sit
// side by side under logs/.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::application::train_use_case::TrainConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub root:   PathBuf,
    pub logs:   PathBuf,
    pub models: PathBuf,
}

impl OutputLayout {
    pub fn for_config(cfg: &TrainConfig) -> Self {
        let root = cfg
            .output_root
            .join(results_dir_name(cfg.epochs, cfg.batch_size, &cfg.version));
        Self::under(root, &log_name(cfg.lr, cfg.decay, cfg.momentum, cfg.dropout))
    }

    /// Layout of an existing results directory.
    pub fn under(root: impl Into<PathBuf>, log_name: &str) -> Self {
        let root = root.into();
        Self {
            logs:   root.join("logs").join(log_name),
            models: models_dir(&root),
            root,
        }
    }

    pub fn create(&self) -> Result<()> {
        for dir in [&self.root, &self.logs, &self.models] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        }
        Ok(())
    }

    pub fn run_log(&self) -> PathBuf {
        self.root.join("output.txt")
    }

    pub fn embeddings(&self) -> PathBuf {
        self.logs.join("embeddings.tsv")
    }
}

/// Checkpoint directory of the results directory `root`.
pub fn models_dir(root: &Path) -> PathBuf {
    root.join("trained_models")
}

pub fn results_dir_name(epochs: usize, batch_size: usize, version: &str) -> String {
    format!("results-for-{epochs}e{batch_size}bs-{version}")
}

pub fn log_name(lr: f64, decay: f64, momentum: f64, dropout: f64) -> String {
    format!("lr{lr}d{decay}m{momentum}do{dropout}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names() {
        let cfg = TrainConfig::default();
        assert_eq!(results_dir_name(cfg.epochs, cfg.batch_size, &cfg.version), "results-for-1e128bs-sat6-test");
        assert_eq!(log_name(cfg.lr, cfg.decay, cfg.momentum, cfg.dropout), "lr0.0001d0.9m0do0.5");
    }

    #[test]
    fn test_layout_paths() {
        let cfg = TrainConfig { output_root: PathBuf::from("/tmp/out"), ..TrainConfig::default() };
        let layout = OutputLayout::for_config(&cfg);
        assert_eq!(layout.root, PathBuf::from("/tmp/out/results-for-1e128bs-sat6-test"));
        assert_eq!(layout.logs, layout.root.join("logs/lr0.0001d0.9m0do0.5"));
        assert_eq!(layout.models, layout.root.join("trained_models"));
        assert_eq!(layout.run_log(), layout.root.join("output.txt"));
    }
}
