// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch / batch loop with Adam and periodic checkpoints.
//
// Per batch:
//   forward → cross-entropy vs integer labels → backward
//   → Adam step → log the batch loss
//   (gradients are computed fresh for every step, so there
//    is nothing to zero between batches)
//
// Per epoch:
//   average loss becomes the "last known loss"
//   if (epoch + 1) % save_every == 0 → checkpoint at epoch + 1
//   print the average and append a metrics row
//
// Resume: the loop starts at the epoch stored in the checkpoint
// and never repeats earlier epochs. Any error stops training.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{Context, Result};
use burn::{
    optim::{GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
};

use crate::application::train_use_case::TrainConfig;
use crate::data::dataloader::{num_batches, ImageLoader};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::{ClassifierConfig, DeepfakeClassifier};

/// Everything the loop hands back once it stops.
pub struct TrainOutcome<M, O> {
    pub model:        M,
    pub optim:        O,
    /// First epoch index that was trained (the resume point)
    pub start_epoch:  usize,
    /// Number of completed epochs after training
    pub final_epoch:  usize,
    /// One entry per epoch trained in this run
    pub epoch_losses: Vec<EpochMetrics>,
    pub last_loss:    Option<f64>,
}

pub struct Trainer<'a> {
    cfg:          &'a TrainConfig,
    model_config: &'a ClassifierConfig,
    checkpoints:  &'a CheckpointManager,
    metrics:      Option<&'a MetricsLogger>,
}

impl<'a> Trainer<'a> {
    pub fn new(
        cfg:          &'a TrainConfig,
        model_config: &'a ClassifierConfig,
        checkpoints:  &'a CheckpointManager,
    ) -> Self {
        Self { cfg, model_config, checkpoints, metrics: None }
    }

    /// Also append every epoch average to a CSV file
    pub fn with_metrics(mut self, metrics: &'a MetricsLogger) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn fit<B, O>(
        &self,
        mut model:     DeepfakeClassifier<B>,
        mut optim:     O,
        start_epoch:   usize,
        mut last_loss: Option<f64>,
        loader:        &ImageLoader<B>,
    ) -> Result<TrainOutcome<DeepfakeClassifier<B>, O>>
    where
        B: AutodiffBackend,
        O: Optimizer<DeepfakeClassifier<B>, B>,
    {
        let cfg         = self.cfg;
        let num_batches = num_batches(loader.num_items(), cfg.batch_size);
        let mut epoch_losses = Vec::new();

        if start_epoch >= cfg.epochs {
            tracing::info!(
                "Checkpoint epoch {} already reaches the target of {} epochs, nothing to train",
                start_epoch, cfg.epochs
            );
        } else {
            tracing::info!(
                "Training epochs {}..={} ({} batches of up to {} images)",
                start_epoch + 1, cfg.epochs, num_batches, cfg.batch_size
            );
        }

        // ── Epoch loop ────────────────────────────────────────────────────────
        for epoch in start_epoch..cfg.epochs {
            let mut loss_sum = 0.0f64;
            let mut batches  = 0usize;

            for (batch_idx, batch) in loader.iter().enumerate() {
                let batch = batch.with_context(|| {
                    format!("Failed to build batch {} of epoch {}", batch_idx + 1, epoch + 1)
                })?;

                let (loss, _) = model.forward_loss(batch.images, batch.labels);
                let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

                // Backward pass + Adam update
                let grads = loss.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = optim.step(cfg.lr, model, grads);

                loss_sum += loss_val;
                batches  += 1;

                tracing::info!(
                    "Epoch [{}/{}], Batch [{}/{}], Loss: {:.4}",
                    epoch + 1, cfg.epochs, batch_idx + 1, num_batches, loss_val
                );
            }

            let avg_loss = loss_sum / batches.max(1) as f64;
            last_loss = Some(avg_loss);

            if (epoch + 1) % cfg.save_every == 0 {
                self.checkpoints
                    .save::<B, _, _>(epoch + 1, &model, &optim, last_loss, self.model_config)?;
            }

            println!("Epoch [{}/{}], Average Loss: {:.4}", epoch + 1, cfg.epochs, avg_loss);

            let row = EpochMetrics::new(epoch + 1, avg_loss);
            if let Some(metrics) = self.metrics {
                metrics.log(&row)?;
            }
            epoch_losses.push(row);
        }

        Ok(TrainOutcome {
            model,
            optim,
            start_epoch,
            final_epoch: cfg.epochs.max(start_epoch),
            epoch_losses,
            last_loss,
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{split_loader, write_split};
    use crate::ml::model::tiny_config;
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
    use burn::optim::AdamConfig;

    type TestAutodiff = Autodiff<NdArray>;

    fn config(dir: &std::path::Path, epochs: usize, save_every: usize) -> TrainConfig {
        TrainConfig {
            checkpoint_path: dir.join("ckpt").display().to_string(),
            epochs,
            save_every,
            batch_size: 2,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_checkpoints_at_interval() {
        let dir = tempfile::tempdir().unwrap();
        write_split(&dir.path().join("train"), &[("fake", 2), ("real", 2)], 16);

        let device       = NdArrayDevice::default();
        let cfg          = config(dir.path(), 3, 2);
        let model_config = tiny_config();
        let checkpoints  = CheckpointManager::new(&cfg.checkpoint_path);
        let loader       = split_loader::<TestAutodiff>(&dir.path().join("train"), 16, 2, &device);

        let model = model_config.init::<TestAutodiff>(&device);
        let optim = AdamConfig::new().init::<TestAutodiff, DeepfakeClassifier<TestAutodiff>>();

        let outcome = Trainer::new(&cfg, &model_config, &checkpoints)
            .fit(model, optim, 0, None, &loader)
            .unwrap();

        let epochs: Vec<usize> = outcome.epoch_losses.iter().map(|m| m.epoch).collect();
        assert_eq!(epochs, vec![1, 2, 3]);
        assert_eq!(outcome.final_epoch, 3);
        assert_eq!(outcome.last_loss, Some(outcome.epoch_losses[2].train_loss));

        // Epoch 3 is not a multiple of 2: the checkpoint still holds epoch 2
        let state = checkpoints.load_state().unwrap().unwrap();
        assert_eq!(state.epoch, 2);
        assert_eq!(state.loss, Some(outcome.epoch_losses[1].train_loss));
    }

    #[test]
    fn test_resume_skips_completed_epochs() {
        let dir = tempfile::tempdir().unwrap();
        write_split(&dir.path().join("train"), &[("fake", 2), ("real", 2)], 16);

        let device       = NdArrayDevice::default();
        let model_config = tiny_config();
        let loader       = split_loader::<TestAutodiff>(&dir.path().join("train"), 16, 2, &device);

        // First run: 2 epochs, checkpoint after each
        let first       = config(dir.path(), 2, 1);
        let checkpoints = CheckpointManager::new(&first.checkpoint_path);
        let model = model_config.init::<TestAutodiff>(&device);
        let optim = AdamConfig::new().init::<TestAutodiff, DeepfakeClassifier<TestAutodiff>>();
        Trainer::new(&first, &model_config, &checkpoints)
            .fit(model, optim, 0, None, &loader)
            .unwrap();

        // Second run: target 3 epochs, resume from the checkpoint
        let second   = config(dir.path(), 3, 1);
        let model    = model_config.init::<TestAutodiff>(&device);
        let optim    = AdamConfig::new().init::<TestAutodiff, DeepfakeClassifier<TestAutodiff>>();
        let restored = checkpoints.load::<TestAutodiff, _, _>(model, optim, &model_config, &device).unwrap();
        assert_eq!(restored.epoch, 2);

        let outcome = Trainer::new(&second, &model_config, &checkpoints)
            .fit(restored.model, restored.optim, restored.epoch, restored.loss, &loader)
            .unwrap();

        let epochs: Vec<usize> = outcome.epoch_losses.iter().map(|m| m.epoch).collect();
        assert_eq!(epochs, vec![3]);
        assert_eq!(outcome.start_epoch, 2);
        assert_eq!(checkpoints.load_state().unwrap().unwrap().epoch, 3);
    }

    #[test]
    fn test_nothing_to_do_when_checkpoint_is_past_target() {
        let dir = tempfile::tempdir().unwrap();
        write_split(&dir.path().join("train"), &[("fake", 1), ("real", 1)], 16);

        let device       = NdArrayDevice::default();
        let cfg          = config(dir.path(), 1, 1);
        let model_config = tiny_config();
        let checkpoints  = CheckpointManager::new(&cfg.checkpoint_path);
        let loader       = split_loader::<TestAutodiff>(&dir.path().join("train"), 16, 2, &device);

        let model = model_config.init::<TestAutodiff>(&device);
        let optim = AdamConfig::new().init::<TestAutodiff, DeepfakeClassifier<TestAutodiff>>();
        let outcome = Trainer::new(&cfg, &model_config, &checkpoints)
            .fit(model, optim, 5, Some(0.25), &loader)
            .unwrap();

        assert!(outcome.epoch_losses.is_empty());
        assert_eq!(outcome.final_epoch, 5);
        assert_eq!(outcome.last_loss, Some(0.25));
        assert!(!checkpoints.path().exists());
    }
}
