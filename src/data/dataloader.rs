// ============================================================
// Layer 4 — Data Loaders
// ============================================================
// Wraps an ImageDataset and an ImageBatcher in Burn's
// DataLoader:
//
//   Training:   shuffled, reshuffled on every pass
//   Validation: samples visited in dataset order
//
// With num_workers > 0 batches are prepared on background
// threads while the model works on the current one.
//
// The last batch may be smaller than batch_size.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use anyhow::{bail, Result};
use burn::data::{
    dataloader::{DataLoader, DataLoaderBuilder},
    dataset::Dataset,
};
use burn::prelude::*;
use std::{path::Path, sync::Arc};

use crate::data::batcher::{BatchResult, ImageBatcher};
use crate::data::dataset::ImageDataset;
use crate::data::loader::{check_class_layout, ImageFolderLoader};
use crate::data::transform::ImageTransform;
use crate::domain::traits::SampleSource;

/// A Burn data loader yielding one `BatchResult` per batch
pub type ImageLoader<B> = Arc<dyn DataLoader<BatchResult<B>>>;

/// How a split is cut into batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    pub batch_size:  usize,
    /// None = keep dataset order
    pub shuffle:     Option<u64>,
    /// 0 = build batches on the calling thread
    pub num_workers: usize,
}

impl LoaderOptions {
    pub fn ordered(batch_size: usize) -> Self {
        Self { batch_size, shuffle: None, num_workers: 0 }
    }

    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle = Some(seed);
        self
    }

    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }
}

/// Number of batches one pass over `num_items` samples takes
pub fn num_batches(num_items: usize, batch_size: usize) -> usize {
    num_items.div_ceil(batch_size.max(1))
}

pub fn build_loader<B: Backend>(
    dataset: ImageDataset,
    batcher: ImageBatcher<B>,
    options: LoaderOptions,
) -> Result<ImageLoader<B>> {
    if options.batch_size == 0 {
        bail!("Batch size must be at least 1");
    }
    if dataset.len() == 0 {
        bail!("Cannot build a loader over an empty dataset");
    }

    let mut builder = DataLoaderBuilder::new(batcher).batch_size(options.batch_size);
    if let Some(seed) = options.shuffle {
        builder = builder.shuffle(seed);
    }
    if options.num_workers > 0 {
        builder = builder.num_workers(options.num_workers);
    }
    Ok(builder.build(dataset))
}

/// Scan `root/<class>/` and build a loader over it.
pub fn folder_loader<B: Backend>(
    root:      &Path,
    transform: ImageTransform,
    options:   LoaderOptions,
    device:    &B::Device,
) -> Result<ImageLoader<B>> {
    tracing::info!("Loading split '{}'", root.display());
    let source  = ImageFolderLoader::new(root);
    let classes = source.classes()?;
    check_class_layout(&classes)?;

    let dataset = ImageDataset::new(source.load_all()?, classes);
    tracing::info!("{} images, per class {:?}", dataset.len(), dataset.class_counts());

    build_loader(dataset, ImageBatcher::new(device.clone(), transform), options)
}
