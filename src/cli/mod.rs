// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All business logic is delegated to Layer 2 (application).
//
//   1. `train`    — fine-tune with checkpoints, then evaluate
//   2. `evaluate` — load a saved model and evaluate it
//   3. `stats`    — compute the normalisation statistics
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, StatsArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "deepfake-detect",
    version,
    about = "Fine-tune a ResNet to tell real images from deepfakes."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Stats(args)    => run_stats(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on dataset: {}", args.data_dir);
    let output  = args.output.clone();
    let summary = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Training complete after {} epochs. Model saved to '{}'.",
        summary.final_epoch, output
    );
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    EvaluateUseCase::new(args.into()).execute()?;
    Ok(())
}

fn run_stats(args: StatsArgs) -> Result<()> {
    use crate::application::stats_use_case::StatsUseCase;

    let stats = StatsUseCase::new(args.data_dir, args.stats_cache.clone()).execute()?;
    println!("{stats}");
    println!("Cached in '{}'", args.stats_cache);
    Ok(())
}
