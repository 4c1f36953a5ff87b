// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All work is delegated to Layer 2 (application).
//
//   train  — train the CNN, write logs and checkpoints
//   eval   — re-run sharded test accuracy from a checkpoint
//   export — write metadata-sat6.tsv and sprite-sat6.png
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvalArgs, ExportArgs, TrainArgs};

use crate::data::loader::SatLoader;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::layout::models_dir;

#[derive(Parser, Debug)]
#[command(
    name = "sat6-cnn",
    version,
    about = "Train a convolutional land-cover classifier on SAT-6 satellite patches."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)  => run_train(args),
            Commands::Eval(args)   => run_eval(args),
            Commands::Export(args) => run_export(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}'", args.data_path.display());

    let use_case = TrainUseCase::new(args.into());
    let loader   = SatLoader::new(&use_case.config().data_path);
    let summary  = use_case.execute(&loader)?;

    println!(
        "Training complete after {} steps. Final test accuracy: {:.2}%",
        summary.steps,
        summary.final_accuracy * 100.0
    );
    if let Some(loss) = summary.last_loss {
        println!("Last minibatch loss: {:.4}", loss);
    }
    println!("Checkpoints kept for steps {:?}", summary.checkpoints);
    Ok(())
}

fn run_eval(args: EvalArgs) -> Result<()> {
    use crate::application::eval_use_case::EvalUseCase;

    let data_path = match args.data_path {
        Some(path) => path,
        None => CheckpointManager::open(models_dir(&args.results_dir))?
            .load_config()?
            .data_path,
    };

    let report = EvalUseCase::new(&args.results_dir, args.backend)
        .execute(&SatLoader::new(data_path))?;

    for (i, acc) in report.shard_accuracies.iter().enumerate() {
        println!("shard {:>2}: {:.2}%", i, acc * 100.0);
    }
    println!("Test accuracy: {:.2}%", report.accuracy * 100.0);
    Ok(())
}

fn run_export(args: ExportArgs) -> Result<()> {
    use crate::application::export_use_case::ExportUseCase;

    let count = ExportUseCase::new(args.shard_size, &args.labels_out, &args.sprite_out)
        .execute(&SatLoader::new(&args.data_path))?;

    println!(
        "Exported {} samples to '{}' and '{}'",
        count,
        args.labels_out.display(),
        args.sprite_out.display()
    );
    Ok(())
}
