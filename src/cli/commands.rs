// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `test` and
// `transcribe`, and all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::{test_use_case::TestConfig, train_use_case::TrainConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the image-to-sequence model on a labelled manifest
    Train(TrainArgs),

    /// Evaluate the best checkpoint on a test manifest
    Test(TestArgs),

    /// Transcribe a single score image
    Transcribe(TranscribeArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON manifest of training images and transcripts
    #[arg(long, default_value = "data/train.json")]
    pub train_manifest: String,

    /// JSON manifest used for validation after each epoch
    #[arg(long, default_value = "data/val.json")]
    pub val_manifest: String,

    /// Directory for checkpoints, vocabulary and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Optional word → index JSON for decoding ground truth
    #[arg(long)]
    pub eval_vocab: Option<String>,

    /// Largest accepted image height in pixels
    #[arg(long, default_value_t = 128)]
    pub max_input_height: usize,

    /// Largest accepted image width in pixels
    #[arg(long, default_value_t = 2048)]
    pub max_input_width: usize,

    /// Longest decoded sequence, <SOS> included
    #[arg(long, default_value_t = 512)]
    pub max_seq_len: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// DataLoader worker threads
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    /// Seed for shuffling and teacher-forcing corruption
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Probability of replacing a decoder input token by a random one
    #[arg(long, default_value_t = 0.5)]
    pub teacher_forcing_prob: f64,

    #[arg(long, default_value_t = 8)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 4)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Limit self-attention to this many previous tokens
    #[arg(long)]
    pub attn_window: Option<usize>,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            train_manifest:       a.train_manifest,
            val_manifest:         a.val_manifest,
            checkpoint_dir:       a.checkpoint_dir,
            eval_vocab:           a.eval_vocab,
            max_input_height:     a.max_input_height,
            max_input_width:      a.max_input_width,
            max_seq_len:          a.max_seq_len,
            batch_size:           a.batch_size,
            epochs:               a.epochs,
            lr:                   a.lr,
            num_workers:          a.num_workers,
            seed:                 a.seed,
            teacher_forcing_prob: a.teacher_forcing_prob,
            num_layers:           a.num_layers,
            num_heads:            a.num_heads,
            d_ff:                 a.d_ff,
            dropout:              a.dropout,
            attn_window:          a.attn_window,
        }
    }
}

/// All arguments for the `test` command
#[derive(Args, Debug)]
pub struct TestArgs {
    /// JSON manifest of test images and transcripts
    #[arg(long, default_value = "data/test.json")]
    pub manifest: String,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long)]
    pub eval_vocab: Option<String>,

    /// Seed for picking the displayed sample
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<TestArgs> for TestConfig {
    fn from(a: TestArgs) -> Self {
        TestConfig {
            manifest:       a.manifest,
            checkpoint_dir: a.checkpoint_dir,
            eval_vocab:     a.eval_vocab,
            seed:           a.seed,
        }
    }
}

/// All arguments for the `transcribe` command
#[derive(Args, Debug)]
pub struct TranscribeArgs {
    /// Image file to transcribe
    #[arg(long)]
    pub image: String,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}
