// ============================================================
// Layer 5 — ResNet Backbone
// ============================================================
// Convolutional feature extractor without a classification layer.
// The network ends at global average pooling and returns one
// feature vector per image; the classifier head in model.rs is
// attached on top of it.
//
// Layout (He et al. 2016):
//
//   stem      conv 7x7 /2 → BN → ReLU → maxpool 3x3 /2
//   stage 1   blocks[0] residual blocks, width w
//   stage 2   blocks[1] residual blocks, width 2w, first block /2
//   stage 3   blocks[2] residual blocks, width 4w, first block /2
//   stage 4   blocks[3] residual blocks, width 8w, first block /2
//   pool      adaptive average pool → [batch, features]
//
// Two block kinds:
//   basic       3x3 → 3x3                    (ResNet-18/34)
//   bottleneck  1x1 → 3x3 → 1x1 (x4 width)   (ResNet-50)
//
// Reference: Burn Book §3 (Building Blocks)

use anyhow::{bail, Context, Result};
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d,
    },
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
    tensor::activation::relu,
};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, str::FromStr};

/// Output width multiplier of a bottleneck block
const BOTTLENECK_EXPANSION: usize = 4;

// ─── Architecture presets ─────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Architecture {
    ResNet18,
    ResNet34,
    ResNet50,
}

impl Architecture {
    pub fn config(self) -> ResNetConfig {
        match self {
            Architecture::ResNet18 => ResNetConfig::new([2, 2, 2, 2]),
            Architecture::ResNet34 => ResNetConfig::new([3, 4, 6, 3]),
            Architecture::ResNet50 => ResNetConfig::new([3, 4, 6, 3]).with_bottleneck(true),
        }
    }
}

impl FromStr for Architecture {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "resnet18" => Ok(Architecture::ResNet18),
            "resnet34" => Ok(Architecture::ResNet34),
            "resnet50" => Ok(Architecture::ResNet50),
            other      => bail!("Unknown architecture '{other}' (expected resnet18, resnet34 or resnet50)"),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Architecture::ResNet18 => "resnet18",
            Architecture::ResNet34 => "resnet34",
            Architecture::ResNet50 => "resnet50",
        };
        f.write_str(name)
    }
}

// ─── Config ───────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct ResNetConfig {
    /// Residual blocks per stage
    pub blocks: [usize; 4],
    /// Bottleneck blocks instead of basic blocks
    #[config(default = false)]
    pub bottleneck: bool,
    /// Channel width of the stem and first stage
    #[config(default = 64)]
    pub base_width: usize,
}

impl ResNetConfig {
    fn expansion(&self) -> usize {
        if self.bottleneck { BOTTLENECK_EXPANSION } else { 1 }
    }

    /// Length of the pooled feature vector
    pub fn num_features(&self) -> usize {
        self.base_width * 8 * self.expansion()
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ResNet<B> {
        let stem = ConvBn::new(3, self.base_width, 7, 2, device);
        let maxpool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        let mut layers   = Vec::new();
        let mut in_c     = self.base_width;
        for (stage, &count) in self.blocks.iter().enumerate() {
            let width  = self.base_width << stage;
            let stride = if stage == 0 { 1 } else { 2 };
            for i in 0..count {
                let s = if i == 0 { stride } else { 1 };
                let block = if self.bottleneck {
                    ResidualBlock::bottleneck(in_c, width, s, device)
                } else {
                    ResidualBlock::basic(in_c, width, s, device)
                };
                in_c = width * self.expansion();
                layers.push(block);
            }
        }

        ResNet {
            stem,
            maxpool,
            layers,
            avgpool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            num_features: self.num_features(),
        }
    }
}

// ─── Building blocks ──────────────────────────────────────────────────────────
/// Convolution (no bias) followed by batch norm.
#[derive(Module, Debug)]
pub struct ConvBn<B: Backend> {
    conv: Conv2d<B>,
    bn:   BatchNorm<B, 2>,
}

impl<B: Backend> ConvBn<B> {
    fn new(in_c: usize, out_c: usize, kernel: usize, stride: usize, device: &B::Device) -> Self {
        let pad  = kernel / 2;
        let conv = Conv2dConfig::new([in_c, out_c], [kernel, kernel])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(pad, pad))
            .with_bias(false)
            .init(device);
        let bn = BatchNormConfig::new(out_c).init(device);
        Self { conv, bn }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.bn.forward(self.conv.forward(x))
    }
}

/// Residual block: ReLU between the conv layers, then the
/// shortcut is added and a final ReLU applied.
#[derive(Module, Debug)]
pub struct ResidualBlock<B: Backend> {
    layers:     Vec<ConvBn<B>>,
    /// 1x1 projection when the shape changes
    downsample: Option<ConvBn<B>>,
}

impl<B: Backend> ResidualBlock<B> {
    fn basic(in_c: usize, width: usize, stride: usize, device: &B::Device) -> Self {
        let layers = vec![
            ConvBn::new(in_c, width, 3, stride, device),
            ConvBn::new(width, width, 3, 1, device),
        ];
        Self { layers, downsample: shortcut(in_c, width, stride, device) }
    }

    fn bottleneck(in_c: usize, width: usize, stride: usize, device: &B::Device) -> Self {
        let out_c  = width * BOTTLENECK_EXPANSION;
        let layers = vec![
            ConvBn::new(in_c, width, 1, 1, device),
            ConvBn::new(width, width, 3, stride, device),
            ConvBn::new(width, out_c, 1, 1, device),
        ];
        Self { layers, downsample: shortcut(in_c, out_c, stride, device) }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(proj) => proj.forward(x.clone()),
            None       => x.clone(),
        };

        let last    = self.layers.len().saturating_sub(1);
        let mut out = x;
        for (i, layer) in self.layers.iter().enumerate() {
            out = layer.forward(out);
            if i < last {
                out = relu(out);
            }
        }
        relu(out + identity)
    }
}

fn shortcut<B: Backend>(in_c: usize, out_c: usize, stride: usize, device: &B::Device) -> Option<ConvBn<B>> {
    (stride != 1 || in_c != out_c).then(|| ConvBn::new(in_c, out_c, 1, stride, device))
}

// ─── ResNet ───────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    stem:         ConvBn<B>,
    maxpool:      MaxPool2d,
    layers:       Vec<ResidualBlock<B>>,
    avgpool:      AdaptiveAvgPool2d,
    num_features: usize,
}

impl<B: Backend> ResNet<B> {
    /// images: [batch, 3, H, W] → features: [batch, num_features]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = relu(self.stem.forward(images));
        let mut x = self.maxpool.forward(x);
        for block in &self.layers {
            x = block.forward(x);
        }
        let x = self.avgpool.forward(x);
        let [batch, channels, _, _] = x.dims();
        x.reshape([batch, channels])
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Replace all weights with the ones stored in a Burn record file
    /// (`.mpk`, full precision) written from a backbone of the same
    /// architecture.
    pub fn load_pretrained(self, path: &Path, device: &B::Device) -> Result<Self> {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        self.load_file(path.to_path_buf(), &recorder, device)
            .with_context(|| format!("Cannot load pretrained backbone '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_feature_widths() {
        assert_eq!(Architecture::ResNet18.config().num_features(), 512);
        assert_eq!(Architecture::ResNet34.config().num_features(), 512);
        assert_eq!(Architecture::ResNet50.config().num_features(), 2048);
    }

    #[test]
    fn test_parse_architecture() {
        assert_eq!("ResNet50".parse::<Architecture>().unwrap(), Architecture::ResNet50);
        assert_eq!(Architecture::ResNet18.to_string(), "resnet18");
        assert!("vgg16".parse::<Architecture>().is_err());
    }

    #[test]
    fn test_forward_shape_basic() {
        let device = Default::default();
        let config = ResNetConfig::new([1, 1, 1, 1]).with_base_width(4);
        let net    = config.init::<TestBackend>(&device);

        let images = Tensor::<TestBackend, 4>::zeros([2, 3, 32, 32], &device);
        assert_eq!(net.forward(images).dims(), [2, 32]);
    }

    #[test]
    fn test_forward_shape_bottleneck() {
        let device = Default::default();
        let config = ResNetConfig::new([1, 1, 1, 1]).with_bottleneck(true).with_base_width(2);
        let net    = config.init::<TestBackend>(&device);

        let images = Tensor::<TestBackend, 4>::ones([1, 3, 32, 32], &device);
        assert_eq!(net.forward(images).dims(), [1, config.num_features()]);
        assert_eq!(config.num_features(), 64);
    }
}
