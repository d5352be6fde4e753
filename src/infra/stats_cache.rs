// ============================================================
// Layer 6 — Normalisation Statistics Cache
// ============================================================
// Per-channel mean / std of the training split, computed once
// and cached as JSON:
//
//   mean_and_std.json
//     {"mean": [0.52, 0.43, 0.39], "std": [0.24, 0.22, 0.22]}
//
// Computation (one pass over the training images):
//   1. decode each image at its native size, pixels in [0,1]
//   2. per image, per channel: mean and population variance
//   3. sum over images, divide by the image count
//   4. std = sqrt(mean variance)
//
// Images are decoded in parallel; the sums are taken in file
// order so repeated runs give identical numbers.
//
// A present cache file is returned as-is. It is never checked
// against the current contents of the dataset.
//
// Reference: Rust Book §16 (Fearless Concurrency, via rayon)

use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::loader::ImageFolderLoader;
use crate::domain::{
    stats::{ChannelMoments, NormalizationStats, StatsAccumulator},
    traits::{Persistable, SampleSource},
};

pub const DEFAULT_STATS_CACHE: &str = "mean_and_std.json";

impl Persistable for NormalizationStats {
    fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Cannot write statistics to '{}'", path.display()))
    }

    fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read statistics from '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid statistics file '{}'", path.display()))
    }
}

pub struct StatsCache {
    path: PathBuf,
}

impl StatsCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached statistics when the file exists, otherwise compute
    /// them from `train_dir` and write the cache.
    pub fn load_or_compute(&self, train_dir: &Path) -> Result<NormalizationStats> {
        if self.path.exists() {
            tracing::info!("Reusing cached mean and std from '{}'", self.path.display());
            return NormalizationStats::load(&self.path);
        }

        tracing::info!("Computing mean and std over '{}'", train_dir.display());
        let stats = compute_stats(train_dir)?;
        stats.save(&self.path)?;
        tracing::info!("Saved {} to '{}'", stats, self.path.display());
        Ok(stats)
    }
}

/// Mean and std of every image under `root/<class>/`.
pub fn compute_stats(root: &Path) -> Result<NormalizationStats> {
    let samples = ImageFolderLoader::new(root).load_all()?;

    let moments: Vec<ChannelMoments> = samples
        .par_iter()
        .map(|sample| {
            let rgb = image::open(&sample.path)
                .with_context(|| format!("Cannot decode image '{}'", sample.path.display()))?
                .to_rgb8();
            ChannelMoments::from_rgb_bytes(rgb.as_raw())
                .ok_or_else(|| anyhow!("Image '{}' has no pixels", sample.path.display()))
        })
        .collect::<Result<_>>()?;

    let mut acc = StatsAccumulator::new();
    for m in &moments {
        acc.add(m);
    }
    tracing::debug!("Accumulated moments of {} images", acc.images());

    acc.finish()
        .ok_or_else(|| anyhow!("No training images under '{}'", root.display()))
}
