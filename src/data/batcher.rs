// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Converts a slice of ImageSamples into device tensors.
//
// How batching works here:
//   Input:  N samples (paths + class indices)
//   Output: ImageBatch with
//             images  [N, 3, S, S]  float, normalised
//             labels  [N]           int class indices
//
//   Every image is decoded and transformed into a flat CHW Vec,
//   the Vecs are concatenated in sample order, and the result is
//   reshaped to 4 dimensions.
//
// Images of one batch are decoded in parallel on the rayon pool;
// the call returns once every image is ready. Decoding can fail,
// so the Batcher output is a Result: the loader hands the error
// to the training loop, which stops on it.
//
// Reference: Burn Book §4 (Batcher)

use anyhow::{bail, Result};
use burn::{data::dataloader::batcher::Batcher, prelude::*};
use rayon::prelude::*;
use std::fmt;

use crate::data::transform::ImageTransform;
use crate::domain::sample::ImageSample;

// ─── ImageBatch ───────────────────────────────────────────────────────────────
/// A batch of images ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Normalised pixels — shape: [batch_size, 3, size, size]
    pub images: Tensor<B, 4>,

    /// Class indices — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,

    /// The same class indices kept on the host, so evaluation
    /// does not have to read them back from the device
    pub targets: Vec<usize>,
}

impl<B: Backend> ImageBatch<B> {
    pub fn len(&self) -> usize {
        self.targets.len()
    }
}

// ─── BatchError ───────────────────────────────────────────────────────────────
/// Why a batch could not be built. Loader outputs must be `Clone`,
/// so the error chain is flattened into its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchError(String);

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for BatchError {}

/// What the data loader yields for every batch
pub type BatchResult<B> = std::result::Result<ImageBatch<B>, BatchError>;

// ─── ImageBatcher ─────────────────────────────────────────────────────────────
/// Holds the target device and the transform pipeline.
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
    transform:  ImageTransform,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device, transform: ImageTransform) -> Self {
        Self { device, transform }
    }

    pub fn transform(&self) -> &ImageTransform {
        &self.transform
    }

    /// Decode, transform and stack `items` into one batch.
    pub fn try_batch(&self, items: &[ImageSample]) -> Result<ImageBatch<B>> {
        if items.is_empty() {
            bail!("Cannot build a batch from zero samples");
        }
        let batch_size = items.len();
        let size       = self.transform.size();

        // ── Decode in parallel, keep sample order ─────────────────────────────
        let transform = &self.transform;
        let decoded: Vec<Vec<f32>> = items
            .par_iter()
            .map(|s| transform.load(&s.path))
            .collect::<Result<Vec<_>>>()?;

        let pixels: Vec<f32> = decoded.into_iter().flatten().collect();
        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        // ── Create tensors ────────────────────────────────────────────────────
        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([batch_size, 3, size, size]);

        let labels_tensor = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        Ok(ImageBatch {
            images,
            labels:  labels_tensor,
            targets: items.iter().map(|s| s.label).collect(),
        })
    }
}

impl<B: Backend> Batcher<ImageSample, BatchResult<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageSample>) -> BatchResult<B> {
        self.try_batch(&items).map_err(|e| BatchError(format!("{e:#}")))
    }
}
