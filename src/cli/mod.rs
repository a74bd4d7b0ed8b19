// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`      — trains the model on a labelled manifest
//   2. `test`       — evaluates the best checkpoint
//   3. `transcribe` — decodes one score image
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, TestArgs, TrainArgs, TranscribeArgs};

#[derive(Parser, Debug)]
#[command(
    name = "img2seq-omr",
    version = "0.1.0",
    about = "Train an image-to-sequence transformer on score images, then transcribe them."
)]
pub struct Cli {
    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)      => Self::run_train(args),
            Commands::Test(args)       => Self::run_test(args),
            Commands::Transcribe(args) => Self::run_transcribe(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting training on manifest: {}", args.train_manifest);

        let report = TrainUseCase::new(args.into()).execute()?;

        println!(
            "Training complete. Best epoch {} (val_ser={:.2}%).",
            report.best_epoch, report.best_val_ser
        );
        Ok(())
    }

    fn run_test(args: TestArgs) -> Result<()> {
        use crate::application::test_use_case::TestUseCase;

        let summary = TestUseCase::new(args.into()).execute()?;

        println!();
        for (name, value) in &summary.metrics {
            println!("test_{name}: {value:.2}");
        }
        if let Some((truth, prediction)) = &summary.sample {
            println!("Ground truth - {}", truth.join(" "));
            println!("Prediction   - {}", prediction.join(" "));
        }
        Ok(())
    }

    fn run_transcribe(args: TranscribeArgs) -> Result<()> {
        use crate::application::transcribe_use_case::TranscribeUseCase;

        let use_case      = TranscribeUseCase::new(&args.checkpoint_dir)?;
        let transcription = use_case.transcribe(&args.image)?;

        let (words, probs) = transcription.words_with_probabilities();
        println!("\nTranscription ({:?}):", transcription.stop);
        for (word, prob) in words.iter().zip(&probs) {
            println!("  {word:<24} {prob:.4}");
        }
        Ok(())
    }
}
