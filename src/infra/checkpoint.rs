// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores training state using Burn's
// NamedMpkFileRecorder at full precision, so a restored model
// reproduces the saved one bit for bit.
//
// One checkpoint is one directory, overwritten on every save:
//
//   model_checkpoint/
//     model.mpk        ← network parameters + BatchNorm running stats
//     optimizer.mpk    ← Adam moment estimates (resume only)
//     config.json      ← ClassifierConfig used to build the network
//     checkpoint.json  ← {"epoch": 20, "loss": 0.6931}
//
// checkpoint.json is written last. A directory that exists but
// lacks any of the files is reported as an error on load; a
// directory that does not exist means "start fresh".
//
// The final model directory uses the same layout minus
// optimizer.mpk (see `save_model`).
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::ml::model::ClassifierConfig;

const MODEL_FILE:     &str = "model";
const OPTIMIZER_FILE: &str = "optimizer";
const STATE_FILE:     &str = "checkpoint";
const CONFIG_FILE:    &str = "config";

type CheckpointRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Scalar part of a checkpoint, stored as JSON.
///
/// Both keys are required. `loss` is `null` before the first
/// finished epoch; non-finite losses are written as strings
/// ("NaN", "inf", "-inf") since JSON numbers cannot hold them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    /// Number of completed epochs; training resumes here
    pub epoch: usize,
    /// Last known average epoch loss, if any epoch has finished
    #[serde(with = "loss_repr")]
    pub loss:  Option<f64>,
}

mod loss_repr {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(loss: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
        match loss {
            None                      => s.serialize_none(),
            Some(v) if v.is_finite()  => s.serialize_f64(*v),
            Some(v)                   => s.serialize_str(&v.to_string()),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        match Option::<Stored>::deserialize(d)? {
            None                       => Ok(None),
            Some(Stored::Number(v))    => Ok(Some(v)),
            Some(Stored::Text(text))   => text
                .parse::<f64>()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("invalid loss value '{text}'"))),
        }
    }
}

/// What `CheckpointManager::load` hands back.
pub struct Restored<M, O> {
    pub model: M,
    pub optim: O,
    pub epoch: usize,
    pub loss:  Option<f64>,
}

/// Reads and writes one checkpoint directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// The directory is only created by the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Write model, optimizer, config and state, overwriting any
    /// previous checkpoint at this path.
    pub fn save<B, M, O>(
        &self,
        epoch:  usize,
        model:  &M,
        optim:  &O,
        loss:   Option<f64>,
        config: &ClassifierConfig,
    ) -> Result<()>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        self.prepare_dir()?;

        let path = self.dir.join(OPTIMIZER_FILE);
        Recorder::<B>::record(&CheckpointRecorder::new(), optim.to_record(), path.clone())
            .with_context(|| format!("Failed to save optimizer state to '{}'", path.display()))?;

        self.write_model::<B, M>(model)?;
        self.write_config(config)?;
        self.write_state(CheckpointState { epoch, loss })?;

        tracing::info!("Checkpoint saved at epoch {} to '{}'", epoch, self.dir.display());
        Ok(())
    }

    /// Write model, config and state without optimizer state.
    /// Used for the final trained model.
    pub fn save_model<B: Backend, M: Module<B>>(
        &self,
        epoch:  usize,
        model:  &M,
        loss:   Option<f64>,
        config: &ClassifierConfig,
    ) -> Result<()> {
        self.prepare_dir()?;
        self.write_model::<B, M>(model)?;
        self.write_config(config)?;
        self.write_state(CheckpointState { epoch, loss })?;

        tracing::info!("Model saved to '{}'", self.dir.display());
        Ok(())
    }

    /// Restore model and optimizer from the checkpoint.
    ///
    /// No checkpoint directory: logs it and returns the inputs
    /// untouched with epoch 0 and no loss. A checkpoint written
    /// for a different `ClassifierConfig` than `expected` is an
    /// error; its weights would not fit the current network.
    pub fn load<B, M, O>(
        &self,
        model:    M,
        optim:    O,
        expected: &ClassifierConfig,
        device:   &B::Device,
    ) -> Result<Restored<M, O>>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        if !self.dir.exists() {
            tracing::info!("No checkpoint found at '{}', starting from epoch 0", self.dir.display());
            return Ok(Restored { model, optim, epoch: 0, loss: None });
        }

        self.check_config(expected)?;
        let state = self.read_state()?;
        let model = self.read_model::<B, M>(model, device)?;

        let path = self.file(OPTIMIZER_FILE, "mpk")?;
        let record = Recorder::<B>::load(&CheckpointRecorder::new(), path.clone(), device)
            .with_context(|| format!("Failed to load optimizer state from '{}'", path.display()))?;
        let optim = optim.load_record(record);

        tracing::info!(
            "Resuming from checkpoint '{}' at epoch {} (loss {})",
            self.dir.display(),
            state.epoch,
            state.loss.map_or_else(|| "n/a".to_string(), |l| format!("{l:.4}")),
        );
        Ok(Restored { model, optim, epoch: state.epoch, loss: state.loss })
    }

    /// Restore only the model parameters. Unlike `load`, a missing
    /// directory is an error here.
    pub fn load_model<B: Backend, M: Module<B>>(
        &self,
        model:  M,
        device: &B::Device,
    ) -> Result<(M, CheckpointState)> {
        let state = self.read_state()?;
        let model = self.read_model::<B, M>(model, device)?;
        Ok((model, state))
    }

    /// Network configuration stored next to the weights.
    pub fn load_config(&self) -> Result<ClassifierConfig> {
        let path = self.file(CONFIG_FILE, "json")?;
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read model config '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid model config '{}'", path.display()))
    }

    /// Fail unless the stored config equals `expected`.
    pub fn check_config(&self, expected: &ClassifierConfig) -> Result<()> {
        let saved = serde_json::to_value(self.load_config()?)?;
        let current = serde_json::to_value(expected)?;
        if saved != current {
            bail!(
                "Checkpoint '{}' was written for a different model configuration.\n  \
                 saved:   {}\n  current: {}\n\
                 Train with the saved settings or remove the checkpoint directory.",
                self.dir.display(),
                saved,
                current
            );
        }
        Ok(())
    }

    /// Epoch and loss of the checkpoint, `None` when nothing was saved yet.
    pub fn load_state(&self) -> Result<Option<CheckpointState>> {
        if !self.dir.join(STATE_FILE).with_extension("json").exists() {
            return Ok(None);
        }
        self.read_state().map(Some)
    }

    // ─── Internals ────────────────────────────────────────────────────────────

    fn prepare_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", self.dir.display()))
    }

    /// Path of a required file inside the directory.
    fn file(&self, name: &str, ext: &str) -> Result<PathBuf> {
        let path = self.dir.join(name).with_extension(ext);
        if !path.exists() {
            bail!(
                "Checkpoint '{}' is incomplete: '{}' is missing",
                self.dir.display(),
                path.display()
            );
        }
        Ok(path)
    }

    fn write_model<B: Backend, M: Module<B>>(&self, model: &M) -> Result<()> {
        let path = self.dir.join(MODEL_FILE);
        Recorder::<B>::record(&CheckpointRecorder::new(), model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save model to '{}'", path.display()))
    }

    fn read_model<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let path = self.file(MODEL_FILE, "mpk")?;
        let record = Recorder::<B>::load(&CheckpointRecorder::new(), path.clone(), device)
            .with_context(|| {
                format!("Cannot load model from '{}'. Does the architecture match?", path.display())
            })?;
        Ok(model.load_record(record))
    }

    fn write_config(&self, config: &ClassifierConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE).with_extension("json");
        fs::write(&path, serde_json::to_string_pretty(config)?)
            .with_context(|| format!("Cannot write model config to '{}'", path.display()))
    }

    fn write_state(&self, state: CheckpointState) -> Result<()> {
        let path = self.dir.join(STATE_FILE).with_extension("json");
        fs::write(&path, serde_json::to_string_pretty(&state)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }

    fn read_state(&self) -> Result<CheckpointState> {
        let path = self.file(STATE_FILE, "json")?;
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Invalid checkpoint state '{}'", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{split_loader, write_split};
    use crate::ml::backbone::ResNetConfig;
    use crate::ml::model::{fingerprint, tiny_config, DeepfakeClassifier};
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
    use burn::optim::{AdamConfig, GradientsParams};

    type TestAutodiff = Autodiff<NdArray>;
    type Model = DeepfakeClassifier<TestAutodiff>;

    fn adam() -> impl Optimizer<Model, TestAutodiff> {
        AdamConfig::new().init::<TestAutodiff, Model>()
    }

    /// One Adam step on the first batch of `loader`.
    fn train_step<O: Optimizer<Model, TestAutodiff>>(
        model:  Model,
        mut optim: O,
        loader: &crate::data::dataloader::ImageLoader<TestAutodiff>,
    ) -> (Model, O) {
        let batch = loader.iter().next().unwrap().unwrap();
        let (loss, _) = model.forward_loss(batch.images, batch.labels);
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        let model = optim.step(1e-2, model, grads);
        (model, optim)
    }

    #[test]
    fn test_round_trip_restores_epoch_loss_and_weights() {
        let dir    = tempfile::tempdir().unwrap();
        let device = NdArrayDevice::default();
        let config = tiny_config();
        let ckpt   = CheckpointManager::new(dir.path().join("ckpt"));

        let model = config.init::<TestAutodiff>(&device);
        ckpt.save::<TestAutodiff, _, _>(7, &model, &adam(), Some(0.4321), &config).unwrap();

        let fresh    = config.init::<TestAutodiff>(&device);
        let restored = ckpt.load::<TestAutodiff, _, _>(fresh, adam(), &config, &device).unwrap();

        assert_eq!(restored.epoch, 7);
        assert_eq!(restored.loss, Some(0.4321));
        assert_eq!(
            fingerprint(&restored.model, 16, &device),
            fingerprint(&model, 16, &device)
        );
        assert_eq!(ckpt.load_config().unwrap().hidden, config.hidden);
    }

    #[test]
    fn test_optimizer_state_survives_round_trip() {
        let dir    = tempfile::tempdir().unwrap();
        let device = NdArrayDevice::default();
        let config = tiny_config();
        let ckpt   = CheckpointManager::new(dir.path().join("ckpt"));

        write_split(&dir.path().join("train"), &[("fake", 2), ("real", 2)], 16);
        let loader = split_loader::<TestAutodiff>(&dir.path().join("train"), 16, 4, &device);

        // One step so Adam has non-trivial moment estimates
        let (model, optim) = train_step(config.init::<TestAutodiff>(&device), adam(), &loader);
        ckpt.save::<TestAutodiff, _, _>(1, &model, &optim, None, &config).unwrap();

        let restored = ckpt.load::<TestAutodiff, _, _>(config.init::<TestAutodiff>(&device), adam(), &config, &device).unwrap();

        let (expected, _) = train_step(model, optim, &loader);
        let (actual, _)   = train_step(restored.model, restored.optim, &loader);
        assert_eq!(fingerprint(&actual, 16, &device), fingerprint(&expected, 16, &device));
    }

    #[test]
    fn test_missing_checkpoint_starts_fresh() {
        let dir    = tempfile::tempdir().unwrap();
        let device = NdArrayDevice::default();
        let config = tiny_config();
        let ckpt   = CheckpointManager::new(dir.path().join("does_not_exist"));

        let model  = config.init::<TestAutodiff>(&device);
        let before = fingerprint(&model, 16, &device);

        let restored = ckpt.load::<TestAutodiff, _, _>(model, adam(), &config, &device).unwrap();
        assert_eq!(restored.epoch, 0);
        assert_eq!(restored.loss, None);
        assert_eq!(fingerprint(&restored.model, 16, &device), before);
        assert!(ckpt.load_state().unwrap().is_none());
        assert!(!ckpt.path().exists());
    }

    #[test]
    fn test_incomplete_checkpoint_is_an_error() {
        let dir    = tempfile::tempdir().unwrap();
        let device = NdArrayDevice::default();
        let config = tiny_config();
        let ckpt   = CheckpointManager::new(dir.path().join("ckpt"));

        ckpt.save::<TestAutodiff, _, _>(3, &config.init::<TestAutodiff>(&device), &adam(), Some(1.0), &config).unwrap();
        fs::remove_file(dir.path().join("ckpt").join("optimizer.mpk")).unwrap();

        let result = ckpt.load::<TestAutodiff, _, _>(config.init::<TestAutodiff>(&device), adam(), &config, &device);
        assert!(result.is_err());
    }

    #[test]
    fn test_final_model_loads_on_inner_backend() {
        let dir    = tempfile::tempdir().unwrap();
        let device = NdArrayDevice::default();
        let config = tiny_config();
        let ckpt   = CheckpointManager::new(dir.path().join("final"));

        let model = config.init::<NdArray>(&device);
        ckpt.save_model::<NdArray, _>(4, &model, Some(0.5), &config).unwrap();
        assert!(!dir.path().join("final").join("optimizer.mpk").exists());

        let rebuilt = ckpt.load_config().unwrap().init::<NdArray>(&device);
        let (loaded, state) = ckpt.load_model::<NdArray, _>(rebuilt, &device).unwrap();
        assert_eq!(state, CheckpointState { epoch: 4, loss: Some(0.5) });
        assert_eq!(fingerprint(&loaded, 16, &device), fingerprint(&model, 16, &device));
    }

    #[test]
    fn test_resume_with_changed_config_is_an_error() {
        let dir    = tempfile::tempdir().unwrap();
        let device = NdArrayDevice::default();
        let config = tiny_config();
        let ckpt   = CheckpointManager::new(dir.path().join("ckpt"));
        ckpt.save::<TestAutodiff, _, _>(2, &config.init::<TestAutodiff>(&device), &adam(), Some(0.7), &config)
            .unwrap();

        // Wider head: parameter shapes differ
        let wider  = tiny_config().with_hidden(16);
        let result = ckpt.load::<TestAutodiff, _, _>(wider.init::<TestAutodiff>(&device), adam(), &wider, &device);
        let err    = result.err().unwrap();
        assert!(err.to_string().contains("different model configuration"), "{err}");

        // Different backbone depth: rejected before any record is read
        let deeper = ClassifierConfig { backbone: ResNetConfig::new([2, 2, 2, 2]).with_base_width(2), ..tiny_config() };
        let result = ckpt.load::<TestAutodiff, _, _>(deeper.init::<TestAutodiff>(&device), adam(), &deeper, &device);
        assert!(result.is_err());
    }

    #[test]
    fn test_state_keeps_non_finite_loss() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());

        ckpt.write_state(CheckpointState { epoch: 5, loss: Some(f64::NAN) }).unwrap();
        let state = ckpt.load_state().unwrap().unwrap();
        assert_eq!(state.epoch, 5);
        assert!(state.loss.unwrap().is_nan());

        ckpt.write_state(CheckpointState { epoch: 6, loss: Some(f64::INFINITY) }).unwrap();
        assert_eq!(ckpt.load_state().unwrap().unwrap().loss, Some(f64::INFINITY));

        ckpt.write_state(CheckpointState { epoch: 7, loss: None }).unwrap();
        assert_eq!(ckpt.load_state().unwrap().unwrap().loss, None);
    }

    #[test]
    fn test_state_without_loss_key_is_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        fs::write(dir.path().join("checkpoint.json"), r#"{"epoch": 3}"#).unwrap();
        assert!(ckpt.load_state().is_err());

        fs::write(dir.path().join("checkpoint.json"), r#"{"epoch": 3, "loss": null}"#).unwrap();
        assert_eq!(ckpt.load_state().unwrap().unwrap(), CheckpointState { epoch: 3, loss: None });
    }
}
