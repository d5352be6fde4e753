// ============================================================
// Layer 5 — Deepfake Classifier
// ============================================================
// A ResNet backbone with its original classification layer
// replaced by a small feed-forward head:
//
//   features → Linear(features, 512) → ReLU → Dropout(0.5)
//            → Linear(512, 2) → Sigmoid
//
// The head ends in a sigmoid while the loss is cross-entropy,
// which expects raw class scores. That pairing is kept as the
// default; `sigmoid_output = false` trains on the raw scores.

use anyhow::Result;
use burn::{
    nn::{
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{relu, sigmoid},
};
use std::path::Path;

use crate::ml::backbone::{ResNet, ResNetConfig};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize,
// deriving them again gives conflicting impls.
#[derive(Config, Debug)]
pub struct ClassifierConfig {
    pub backbone:       ResNetConfig,
    #[config(default = 512)]
    pub hidden:         usize,
    #[config(default = 2)]
    pub num_classes:    usize,
    #[config(default = 0.5)]
    pub dropout:        f64,
    #[config(default = true)]
    pub sigmoid_output: bool,
    /// Side length of the square input images
    #[config(default = 224)]
    pub image_size:     usize,
}

impl ClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DeepfakeClassifier<B> {
        let backbone = self.backbone.init(device);
        let features = backbone.num_features();
        let head = ClassifierHead {
            fc1:            LinearConfig::new(features, self.hidden).init(device),
            dropout:        DropoutConfig::new(self.dropout).init(),
            fc2:            LinearConfig::new(self.hidden, self.num_classes).init(device),
            sigmoid_output: self.sigmoid_output,
        };
        DeepfakeClassifier { backbone, head }
    }
}

#[derive(Module, Debug)]
pub struct ClassifierHead<B: Backend> {
    pub fc1:            Linear<B>,
    pub dropout:        Dropout,
    pub fc2:            Linear<B>,
    pub sigmoid_output: bool,
}

impl<B: Backend> ClassifierHead<B> {
    /// features: [batch, in] → scores: [batch, num_classes]
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.fc1.forward(features));
        let x = self.dropout.forward(x);
        let x = self.fc2.forward(x);
        if self.sigmoid_output { sigmoid(x) } else { x }
    }
}

#[derive(Module, Debug)]
pub struct DeepfakeClassifier<B: Backend> {
    pub backbone: ResNet<B>,
    pub head:     ClassifierHead<B>,
}

impl<B: Backend> DeepfakeClassifier<B> {
    /// images: [batch, 3, H, W] → scores: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        self.head.forward(self.backbone.forward(images))
    }

    /// Forward pass plus cross-entropy against integer class labels.
    pub fn forward_loss(
        &self,
        images: Tensor<B, 4>,
        labels: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let output = self.forward(images);
        let ce = CrossEntropyLossConfig::new().init(&output.device());
        let loss = ce.forward(output.clone(), labels);
        (loss, output)
    }

    /// Load backbone weights from a record file. A missing file is
    /// not an error: training continues from random initialisation.
    pub fn with_pretrained_backbone(self, path: &Path, device: &B::Device) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("Pretrained weights not found at '{}', using random init", path.display());
            return Ok(self);
        }
        let backbone = self.backbone.load_pretrained(path, device)?;
        tracing::info!("Loaded pretrained backbone from '{}'", path.display());
        Ok(Self { backbone, head: self.head })
    }

    /// Stop gradient tracking for every backbone parameter so
    /// only the head is trained.
    pub fn freeze_backbone(self) -> Self {
        Self { backbone: self.backbone.no_grad(), head: self.head }
    }
}

/// Tiny network used by the tests of every layer.
#[cfg(test)]
pub(crate) fn tiny_config() -> ClassifierConfig {
    ClassifierConfig::new(ResNetConfig::new([1, 1, 1, 1]).with_base_width(2))
        .with_hidden(8)
        .with_dropout(0.0)
        .with_image_size(16)
}

/// Scores of `model` on a fixed pseudo-random input, flattened.
/// Two models with identical weights and running statistics
/// produce identical fingerprints.
#[cfg(test)]
pub(crate) fn fingerprint<B: Backend>(model: &DeepfakeClassifier<B>, size: usize, device: &B::Device) -> Vec<f32> {
    let values: Vec<f32> = (0..2 * 3 * size * size)
        .map(|i| ((i as f32) * 0.37).sin())
        .collect();
    let input = Tensor::<B, 1>::from_floats(values.as_slice(), device).reshape([2, 3, size, size]);
    model.forward(input).into_data().iter::<f32>().collect()
}
