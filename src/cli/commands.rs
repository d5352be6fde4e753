// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `evaluate`, `stats`
// and all their configurable flags. Every default matches the
// value used when the flag is omitted in a normal run.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{evaluate_use_case::EvaluateConfig, train_use_case::TrainConfig};
use crate::ml::{backbone::Architecture, device::ComputeDevice};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune the classifier, resuming from a checkpoint if present
    Train(TrainArgs),

    /// Measure a trained model on the validation split
    Evaluate(EvaluateArgs),

    /// Compute the per-channel mean / std of the training split
    Stats(StatsArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Dataset root with train/ and val/, one subdirectory per class
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// JSON cache of the normalisation statistics
    #[arg(long, default_value = "mean_and_std.json")]
    pub stats_cache: String,

    /// Checkpoint directory, written every --save-every epochs
    #[arg(long, default_value = "model_checkpoint")]
    pub checkpoint: String,

    /// Directory for the final model
    #[arg(long, default_value = "deepfake_model")]
    pub output: String,

    /// CSV file receiving the average loss of every epoch
    #[arg(long, default_value = "metrics.csv")]
    pub metrics: String,

    /// Burn record with pretrained backbone weights
    #[arg(long)]
    pub pretrained: Option<String>,

    /// Train the head only
    #[arg(long)]
    pub freeze_backbone: bool,

    /// resnet18, resnet34 or resnet50
    #[arg(long, default_value = "resnet50")]
    pub arch: Architecture,

    /// Channel width of the first ResNet stage
    #[arg(long, default_value_t = 64)]
    pub base_width: usize,

    /// Width of the hidden layer of the classifier head
    #[arg(long, default_value_t = 512)]
    pub hidden: usize,

    /// Images are resized to image_size x image_size
    #[arg(long, default_value_t = 224)]
    pub image_size: usize,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Background threads preparing batches (0 = none)
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    /// Target number of completed epochs (including resumed ones)
    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    #[arg(long, default_value_t = 10)]
    pub save_every: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 2e-4)]
    pub lr: f64,

    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,

    /// Feed raw scores to the loss instead of sigmoid outputs
    #[arg(long)]
    pub no_sigmoid: bool,

    /// Random flips and brightness / contrast jitter on training images
    #[arg(long)]
    pub augment: bool,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// wgpu or ndarray
    #[arg(long, default_value = "wgpu")]
    pub device: ComputeDevice,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:         a.data_dir,
            stats_cache:      a.stats_cache,
            checkpoint_path:  a.checkpoint,
            final_model_path: a.output,
            metrics_path:     a.metrics,
            pretrained_path:  a.pretrained,
            freeze_backbone:  a.freeze_backbone,
            arch:             a.arch,
            base_width:       a.base_width,
            hidden:           a.hidden,
            image_size:       a.image_size,
            batch_size:       a.batch_size,
            num_workers:      a.num_workers,
            epochs:           a.epochs,
            save_every:       a.save_every,
            lr:               a.lr,
            dropout:          a.dropout,
            sigmoid_output:   !a.no_sigmoid,
            augment:          a.augment,
            seed:             a.seed,
            device:           a.device,
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    #[arg(long, default_value = "mean_and_std.json")]
    pub stats_cache: String,

    /// Directory written by `train` (final model or checkpoint)
    #[arg(long, default_value = "deepfake_model")]
    pub model: String,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    #[arg(long, default_value = "wgpu")]
    pub device: ComputeDevice,
}

impl From<EvaluateArgs> for EvaluateConfig {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateConfig {
            data_dir:    a.data_dir,
            stats_cache: a.stats_cache,
            model_path:  a.model,
            batch_size:  a.batch_size,
            num_workers: a.num_workers,
            device:      a.device,
        }
    }
}

/// All arguments for the `stats` command
#[derive(Args, Debug)]
pub struct StatsArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    #[arg(long, default_value = "mean_and_std.json")]
    pub stats_cache: String,
}
