// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder,
// keeping only the most recent few on disk.
//
// Directory layout:
//   trained_models/
//     model.ckpt-0.mpk        ← weights at step 0
//     model.ckpt-640.mpk      ← weights at step 640
//     ...
//     checkpoint.json         ← latest step + retained steps
//     train_config.json       ← run configuration
//
// Retention is first-in first-out: once more than `max_to_keep`
// checkpoints exist, the oldest file is deleted and dropped from
// the index. The index is rewritten after every save so `eval`
// always finds the newest weights.
//
// The recorder replaces whatever extension the path carries,
// so the full file name, extension included, is passed in.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::Sat6Cnn;

const INDEX_FILE:  &str = "checkpoint.json";
const CONFIG_FILE: &str = "train_config.json";
/// Extension CompactRecorder writes (named MessagePack).
const MODEL_EXT:   &str = "mpk";

/// Contents of checkpoint.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointIndex {
    /// Step of the newest checkpoint.
    pub latest:   usize,
    /// Steps still on disk, oldest first.
    pub retained: Vec<usize>,
}

pub struct CheckpointManager {
    dir:         PathBuf,
    max_to_keep: usize,
    retained:    VecDeque<usize>,
}

impl CheckpointManager {
    /// Start a fresh checkpoint directory for a training run.
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>, max_to_keep: usize) -> Result<Self> {
        ensure!(max_to_keep > 0, "models_to_keep must be at least 1");
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir, max_to_keep, retained: VecDeque::new() })
    }

    /// Reopen the checkpoint directory of a finished run.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let index = read_index(&dir)?;
        let max_to_keep = index.retained.len().max(1);
        Ok(Self { dir, max_to_keep, retained: index.retained.into() })
    }

    /// Steps currently on disk, oldest first.
    pub fn retained(&self) -> Vec<usize> {
        self.retained.iter().copied().collect()
    }

    /// Path of the weights file for `step`.
    pub fn model_path(&self, step: usize) -> PathBuf {
        self.dir.join(format!("model.ckpt-{step}.{MODEL_EXT}"))
    }

    /// Save model weights for `step`, then evict the oldest
    /// checkpoints beyond the retention limit.
    pub fn save_model<B: Backend>(&mut self, model: &Sat6Cnn<B>, step: usize) -> Result<()> {
        let path = self.model_path(step);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        self.retained.retain(|s| *s != step);
        self.retained.push_back(step);
        while self.retained.len() > self.max_to_keep {
            if let Some(oldest) = self.retained.pop_front() {
                let old = self.model_path(oldest);
                if old.exists() {
                    fs::remove_file(&old)
                        .with_context(|| format!("Cannot remove old checkpoint '{}'", old.display()))?;
                }
                tracing::debug!("Evicted checkpoint for step {}", oldest);
            }
        }

        let index = CheckpointIndex { latest: step, retained: self.retained() };
        let index_path = self.dir.join(INDEX_FILE);
        fs::write(&index_path, serde_json::to_string_pretty(&index)?)
            .with_context(|| format!("Cannot write '{}'", index_path.display()))?;

        tracing::debug!("Saved checkpoint: step {}", step);
        Ok(())
    }

    /// Load the newest checkpoint listed in the index into `model`.
    pub fn load_model<B: Backend>(&self, model: Sat6Cnn<B>, device: &B::Device) -> Result<Sat6Cnn<B>> {
        let index = read_index(&self.dir)?;
        let path  = self.model_path(index.latest);

        tracing::info!("Loading checkpoint from step {}", index.latest);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Has 'train' been run with these settings?",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid training config in '{}'", path.display()))
    }
}

fn read_index(dir: &Path) -> Result<CheckpointIndex> {
    let path = dir.join(INDEX_FILE);
    let json = fs::read_to_string(&path)
        .with_context(|| format!("Cannot find '{}'. Have you run 'train' first?", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Invalid checkpoint index '{}'", path.display()))
}
