// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `eval` and `export`
// and all their configurable flags.
//
// Defaults reproduce the reference SAT-6 run: one epoch over
// 324,000 training patches in batches of 128, Adam at 1e-4.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::export_use_case::{DEFAULT_LABELS_FILE, DEFAULT_SPRITE_FILE};
use crate::application::train_use_case::TrainConfig;
use crate::ml::backend::BackendKind;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the CNN on SAT-6 and write a results directory
    Train(TrainArgs),

    /// Re-evaluate the newest checkpoint of a results directory
    Eval(EvalArgs),

    /// Write the label list and sprite for the embedding shard
    Export(ExportArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Path to sat-6-full.mat
    #[arg(long, default_value = "sat-6-full.mat")]
    pub data_path: PathBuf,

    /// Directory the results-for-… folder is created in
    #[arg(long, default_value = ".")]
    pub output_root: PathBuf,

    /// Training samples per epoch; with epochs and batch size
    /// this fixes the number of steps
    #[arg(long, default_value_t = 324_000)]
    pub num_samples: usize,

    /// Samples per test shard
    #[arg(long, default_value_t = 8_100)]
    pub num_test_samples: usize,

    #[arg(long, default_value_t = 1)]
    pub epochs: usize,

    #[arg(long, default_value_t = 128)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 0.0001)]
    pub lr: f64,

    /// Only used to name the run
    #[arg(long, default_value_t = 0.9)]
    pub decay: f64,

    /// Only used to name the run
    #[arg(long, default_value_t = 0.0)]
    pub momentum: f64,

    /// Drop probability of the two dropout layers
    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,

    /// Checkpoints kept on disk; older ones are deleted
    #[arg(long, default_value_t = 5)]
    pub models_to_keep: usize,

    /// Number of equal shards the test set is split into
    #[arg(long, default_value_t = 10)]
    pub test_shards: usize,

    /// Samples per forward pass during evaluation
    #[arg(long, default_value_t = 1_024)]
    pub eval_chunk: usize,

    /// Suffix of the results directory name
    #[arg(long, default_value = "sat6-test")]
    pub version: String,

    #[arg(long, value_enum, default_value_t = BackendKind::NdArray)]
    pub backend: BackendKind,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_path:        a.data_path,
            output_root:      a.output_root,
            num_samples:      a.num_samples,
            num_test_samples: a.num_test_samples,
            epochs:           a.epochs,
            batch_size:       a.batch_size,
            lr:               a.lr,
            decay:            a.decay,
            momentum:         a.momentum,
            dropout:          a.dropout,
            models_to_keep:   a.models_to_keep,
            test_shards:      a.test_shards,
            eval_chunk:       a.eval_chunk,
            version:          a.version,
            backend:          a.backend,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Results directory written by `train`
    #[arg(long)]
    pub results_dir: PathBuf,

    /// Path to sat-6-full.mat; defaults to the one used for training
    #[arg(long)]
    pub data_path: Option<PathBuf>,

    /// Backend override; defaults to the one used for training
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Path to sat-6-full.mat
    #[arg(long, default_value = "sat-6-full.mat")]
    pub data_path: PathBuf,

    /// Number of trailing test samples to export
    #[arg(long, default_value_t = 8_100)]
    pub shard_size: usize,

    #[arg(long, default_value = DEFAULT_LABELS_FILE)]
    pub labels_out: PathBuf,

    #[arg(long, default_value = DEFAULT_SPRITE_FILE)]
    pub sprite_out: PathBuf,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    #[test]
    fn test_train_defaults_match_config() {
        let cli = Cli::try_parse_from(["sat6-cnn", "train"]).unwrap();
        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(TrainConfig::from(args), TrainConfig::default());
    }

    #[test]
    fn test_backend_flag() {
        let cli = Cli::try_parse_from(["sat6-cnn", "train", "--backend", "wgpu", "--batch-size", "64"]).unwrap();
        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        let cfg = TrainConfig::from(args);
        assert_eq!(cfg.backend, BackendKind::Wgpu);
        assert_eq!(cfg.batch_size, 64);
    }

    #[test]
    fn test_eval_requires_results_dir() {
        assert!(Cli::try_parse_from(["sat6-cnn", "eval"]).is_err());
        let cli = Cli::try_parse_from(["sat6-cnn", "eval", "--results-dir", "r", "--backend", "ndarray"]).unwrap();
        let Commands::Eval(args) = cli.command else {
            panic!("expected eval");
        };
        assert_eq!(args.backend, Some(BackendKind::NdArray));
        assert_eq!(args.data_path, None);
    }
}
