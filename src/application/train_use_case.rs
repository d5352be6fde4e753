// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full fine-tuning pipeline in order:
//
//   Step 1: Validate the configuration
//   Step 2: Mean / std of the training split   (Layer 6 - infra)
//   Step 3: Train and validation loaders       (Layer 4 - data)
//   Step 4: Build the classifier               (Layer 5 - ml)
//   Step 5: Resume from a checkpoint if any    (Layer 6 - infra)
//   Step 6: Run the training loop              (Layer 5 - ml)
//   Step 7: Save the final model               (Layer 6 - infra)
//   Step 8: Evaluate on the validation split   (Layer 5 - ml)
//
// The backend is picked once from the config; everything after
// that is generic over it.
//
// Reference: Rust Book §10 (Generic Types)
//            Burn Book §5 (Training)

use anyhow::{bail, Result};
use burn::{
    module::AutodiffModule,
    optim::AdamConfig,
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::{
    dataloader::{folder_loader, LoaderOptions},
    transform::{ImageTransform, DEFAULT_IMAGE_SIZE},
};
use crate::domain::confusion::EvalReport;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
    stats_cache::{StatsCache, DEFAULT_STATS_CACHE},
};
use crate::ml::{
    backbone::Architecture,
    device::{ComputeDevice, NdArrayAutodiff, NdArrayDevice, WgpuAutodiff, WgpuDevice},
    evaluator::evaluate,
    model::{ClassifierConfig, DeepfakeClassifier},
    trainer::Trainer,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run. Paths are plain strings so
// the config serialises to readable JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Dataset root holding `train/` and `val/`
    pub data_dir:         String,
    pub stats_cache:      String,
    /// Periodic checkpoint, also the resume source
    pub checkpoint_path:  String,
    /// Written once after the last epoch
    pub final_model_path: String,
    pub metrics_path:     String,
    /// Burn record with backbone weights; random init when absent
    pub pretrained_path:  Option<String>,
    pub freeze_backbone:  bool,
    pub arch:             Architecture,
    pub base_width:       usize,
    pub hidden:           usize,
    pub image_size:       usize,
    pub batch_size:       usize,
    /// Background threads preparing batches
    pub num_workers:      usize,
    pub epochs:           usize,
    pub save_every:       usize,
    pub lr:               f64,
    pub dropout:          f64,
    pub sigmoid_output:   bool,
    /// Random flips and colour jitter on training images
    pub augment:          bool,
    pub seed:             u64,
    pub device:           ComputeDevice,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:         "data".to_string(),
            stats_cache:      DEFAULT_STATS_CACHE.to_string(),
            checkpoint_path:  "model_checkpoint".to_string(),
            final_model_path: "deepfake_model".to_string(),
            metrics_path:     "metrics.csv".to_string(),
            pretrained_path:  None,
            freeze_backbone:  false,
            arch:             Architecture::ResNet50,
            base_width:       64,
            hidden:           512,
            image_size:       DEFAULT_IMAGE_SIZE,
            batch_size:       64,
            num_workers:      1,
            epochs:           100,
            save_every:       10,
            lr:               2e-4,
            dropout:          0.5,
            sigmoid_output:   true,
            augment:          false,
            seed:             42,
            device:           ComputeDevice::Wgpu,
        }
    }
}

impl TrainConfig {
    /// Reject values the training loop cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            bail!("epochs must be at least 1");
        }
        if self.save_every == 0 {
            bail!("save_every must be at least 1");
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.image_size == 0 {
            bail!("image_size must be at least 1");
        }
        if !(0.0..1.0).contains(&self.dropout) {
            bail!("dropout must be in [0, 1), got {}", self.dropout);
        }
        if !(self.lr > 0.0) {
            bail!("learning rate must be positive, got {}", self.lr);
        }
        Ok(())
    }

    pub fn model_config(&self) -> ClassifierConfig {
        ClassifierConfig::new(self.arch.config().with_base_width(self.base_width))
            .with_hidden(self.hidden)
            .with_dropout(self.dropout)
            .with_sigmoid_output(self.sigmoid_output)
            .with_image_size(self.image_size)
    }

    pub fn train_dir(&self) -> PathBuf {
        Path::new(&self.data_dir).join("train")
    }

    pub fn val_dir(&self) -> PathBuf {
        Path::new(&self.data_dir).join("val")
    }
}

/// What a finished run reports back to the CLI.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub start_epoch:  usize,
    pub final_epoch:  usize,
    pub epoch_losses: Vec<EpochMetrics>,
    pub last_loss:    Option<f64>,
    pub report:       EvalReport,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full pipeline on the configured backend
    pub fn execute(&self) -> Result<TrainSummary> {
        tracing::info!("Training on device: {}", self.config.device);
        match self.config.device {
            ComputeDevice::Wgpu    => run::<WgpuAutodiff>(&self.config, WgpuDevice::default()),
            ComputeDevice::NdArray => run::<NdArrayAutodiff>(&self.config, NdArrayDevice::default()),
        }
    }
}

/// The pipeline itself, on any autodiff backend.
pub fn run<B: AutodiffBackend>(cfg: &TrainConfig, device: B::Device) -> Result<TrainSummary> {
    // ── Step 1: Validate ──────────────────────────────────────────────────────
    cfg.validate()?;
    B::seed(cfg.seed);

    // ── Step 2: Normalisation statistics ──────────────────────────────────────
    let stats = StatsCache::new(&cfg.stats_cache).load_or_compute(&cfg.train_dir())?;
    tracing::info!("Normalisation: {}", stats);

    // ── Step 3: Loaders ───────────────────────────────────────────────────────
    // Augmentation applies to training images only
    let options = LoaderOptions::ordered(cfg.batch_size).with_workers(cfg.num_workers);

    let train_loader = folder_loader::<B>(
        &cfg.train_dir(),
        ImageTransform::new(cfg.image_size, stats, cfg.augment)?,
        options.with_shuffle(cfg.seed),
        &device,
    )?;

    let val_loader = folder_loader::<B::InnerBackend>(
        &cfg.val_dir(),
        ImageTransform::new(cfg.image_size, stats, false)?,
        options,
        &device,
    )?;

    // ── Step 4: Model and optimizer ───────────────────────────────────────────
    let model_config = cfg.model_config();
    let mut model: DeepfakeClassifier<B> = model_config.init(&device);
    if let Some(path) = &cfg.pretrained_path {
        model = model.with_pretrained_backbone(Path::new(path), &device)?;
    }
    if cfg.freeze_backbone {
        tracing::info!("Backbone frozen, training the head only");
        model = model.freeze_backbone();
    }
    tracing::info!(
        "Model: {} backbone, {} parameters",
        cfg.arch,
        model.num_params()
    );

    let optim = AdamConfig::new()
        .with_epsilon(1e-8)
        .init::<B, DeepfakeClassifier<B>>();

    // ── Step 5: Resume ────────────────────────────────────────────────────────
    let checkpoints = CheckpointManager::new(&cfg.checkpoint_path);
    let restored    = checkpoints.load::<B, _, _>(model, optim, &model_config, &device)?;

    // ── Step 6: Training loop ─────────────────────────────────────────────────
    let metrics = MetricsLogger::new(&cfg.metrics_path)?;
    metrics.truncate_after(restored.epoch)?;
    let outcome = Trainer::new(cfg, &model_config, &checkpoints)
        .with_metrics(&metrics)
        .fit(restored.model, restored.optim, restored.epoch, restored.loss, &train_loader)?;

    // ── Step 7: Final model ───────────────────────────────────────────────────
    // Inference copy: no autodiff graph, dropout off
    let model = outcome.model.valid();
    CheckpointManager::new(&cfg.final_model_path).save_model::<B::InnerBackend, _>(
        outcome.final_epoch,
        &model,
        outcome.last_loss,
        &model_config,
    )?;

    // ── Step 8: Evaluation ────────────────────────────────────────────────────
    let report = evaluate(&model, &val_loader)?;
    report.print();

    Ok(TrainSummary {
        start_epoch:  outcome.start_epoch,
        final_epoch:  outcome.final_epoch,
        epoch_losses: outcome.epoch_losses,
        last_loss:    outcome.last_loss,
        report,
    })
}
