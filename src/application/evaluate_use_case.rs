// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Rebuilds a trained classifier from its saved directory and
// measures it on the validation split:
//
//   Step 1: Load config.json → rebuild the network
//   Step 2: Load model.mpk into it
//   Step 3: Normalisation stats from the cache (or the train split)
//   Step 4: Validation accuracy + confusion matrix
//
// Runs on the bare backend: no autodiff, dropout inactive.

use anyhow::Result;
use burn::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::{
    dataloader::{folder_loader, LoaderOptions},
    transform::ImageTransform,
};
use crate::domain::confusion::EvalReport;
use crate::infra::{
    checkpoint::CheckpointManager,
    stats_cache::{StatsCache, DEFAULT_STATS_CACHE},
};
use crate::ml::{
    device::{ComputeDevice, NdArrayBackend, NdArrayDevice, WgpuBackend, WgpuDevice},
    evaluator::evaluate,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateConfig {
    pub data_dir:    String,
    pub stats_cache: String,
    /// Directory written by `train` (final model or a checkpoint)
    pub model_path:  String,
    pub batch_size:  usize,
    pub num_workers: usize,
    pub device:      ComputeDevice,
}

impl Default for EvaluateConfig {
    fn default() -> Self {
        Self {
            data_dir:    "data".to_string(),
            stats_cache: DEFAULT_STATS_CACHE.to_string(),
            model_path:  "deepfake_model".to_string(),
            batch_size:  64,
            num_workers: 1,
            device:      ComputeDevice::Wgpu,
        }
    }
}

impl EvaluateConfig {
    fn split_dir(&self, split: &str) -> PathBuf {
        Path::new(&self.data_dir).join(split)
    }
}

pub struct EvaluateUseCase {
    config: EvaluateConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvaluateConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<EvalReport> {
        match self.config.device {
            ComputeDevice::Wgpu    => self.run::<WgpuBackend>(WgpuDevice::default()),
            ComputeDevice::NdArray => self.run::<NdArrayBackend>(NdArrayDevice::default()),
        }
    }

    fn run<B: Backend>(&self, device: B::Device) -> Result<EvalReport> {
        let cfg = &self.config;

        // ── Steps 1-2: Rebuild and load the model ─────────────────────────────
        let store        = CheckpointManager::new(&cfg.model_path);
        let model_config = store.load_config()?;
        let (model, state) = store.load_model::<B, _>(model_config.init::<B>(&device), &device)?;
        tracing::info!(
            "Loaded model from '{}' (trained for {} epochs)",
            cfg.model_path,
            state.epoch
        );

        // ── Step 3: Normalisation ─────────────────────────────────────────────
        let stats = StatsCache::new(&cfg.stats_cache).load_or_compute(&cfg.split_dir("train"))?;

        // ── Step 4: Evaluate ──────────────────────────────────────────────────
        let loader = folder_loader::<B>(
            &cfg.split_dir("val"),
            ImageTransform::new(model_config.image_size, stats, false)?,
            LoaderOptions::ordered(cfg.batch_size).with_workers(cfg.num_workers),
            &device,
        )?;
        let report = evaluate(&model, &loader)?;
        report.print();
        Ok(report)
    }
}
