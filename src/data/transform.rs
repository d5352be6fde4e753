// ============================================================
// Layer 4 — Image Transform
// ============================================================
// Turns an encoded image file into the float layout the network
// expects. Applied in order:
//
//   1. Decode          (image crate, any supported format)
//   2. Augment         (training only, off by default)
//   3. Resize          (exact size x size, bilinear / Triangle)
//   4. To [0, 1]       (u8 / 255)
//   5. Normalise       ((x - mean[c]) / std[c])
//   6. Lay out as CHW  (all R, then all G, then all B)
//
// Training and validation use the same resize and normalisation.
// Augmentation is random horizontal flip plus brightness and
// contrast jitter.

use anyhow::{bail, Context, Result};
use image::{imageops::FilterType, DynamicImage, RgbImage};
use rand::Rng;
use std::path::Path;

use crate::domain::stats::NormalizationStats;

/// Side length images are resized to
pub const DEFAULT_IMAGE_SIZE: usize = 224;

/// Maximum brightness shift as a fraction of full scale
const BRIGHTNESS_JITTER: f32 = 0.2;

/// Maximum contrast change in percent
const CONTRAST_JITTER: f32 = 20.0;

#[derive(Debug, Clone)]
pub struct ImageTransform {
    size:    u32,
    stats:   NormalizationStats,
    augment: bool,
}

impl ImageTransform {
    pub fn new(size: usize, stats: NormalizationStats, augment: bool) -> Result<Self> {
        if size == 0 {
            bail!("Image size must be positive");
        }
        if !stats.is_usable() {
            bail!("Normalisation statistics cannot be used (zero or invalid std): {stats}");
        }
        let size = u32::try_from(size).context("Image size does not fit in u32")?;
        Ok(Self { size, stats, augment })
    }

    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Number of f32 values one transformed image occupies
    pub fn values_per_image(&self) -> usize {
        3 * self.size() * self.size()
    }

    /// Decode the file at `path` and transform it.
    pub fn load(&self, path: &Path) -> Result<Vec<f32>> {
        let img = image::open(path)
            .with_context(|| format!("Cannot decode image '{}'", path.display()))?;
        Ok(self.apply(img))
    }

    /// Transform an already decoded image.
    pub fn apply(&self, img: DynamicImage) -> Vec<f32> {
        let img = if self.augment {
            augment(img, &mut rand::thread_rng())
        } else {
            img
        };
        let img = img.resize_exact(self.size, self.size, FilterType::Triangle);
        to_normalized_chw(&img.to_rgb8(), &self.stats)
    }
}

/// Scale to [0, 1], normalise, and lay out channel-major.
pub fn to_normalized_chw(img: &RgbImage, stats: &NormalizationStats) -> Vec<f32> {
    let plane   = (img.width() * img.height()) as usize;
    let mut out = vec![0.0f32; 3 * plane];

    for (i, px) in img.pixels().enumerate() {
        for c in 0..3 {
            out[c * plane + i] = stats.normalize(c, px.0[c] as f32 / 255.0);
        }
    }
    out
}

fn augment<R: Rng>(img: DynamicImage, rng: &mut R) -> DynamicImage {
    let img = if rng.gen_bool(0.5) { img.fliph() } else { img };

    let brightness: f32 = rng.gen_range(-BRIGHTNESS_JITTER..=BRIGHTNESS_JITTER);
    let contrast:   f32 = rng.gen_range(-CONTRAST_JITTER..=CONTRAST_JITTER);
    img.adjust_contrast(contrast)
        .brighten((brightness * 255.0) as i32)
}
