// ============================================================
// Layer 3 — Normalisation Statistics
// ============================================================
// Per-channel mean and standard deviation of the training set,
// used to rescale pixels before they reach the network:
//
//   x' = (x - mean[c]) / std[c]
//
// How the statistics are accumulated:
//   1. For every image, compute the mean and the population
//      (uncorrected) variance of each channel over its pixels,
//      with pixel values scaled to [0, 1]
//   2. Sum those per-image values over the whole dataset
//   3. Divide both sums by the number of images
//   4. std = sqrt(mean variance)
//
// Every image counts once regardless of its resolution, and the
// result is the mean of per-image variances, not the variance of
// the pooled pixels.

use serde::{Deserialize, Serialize};

/// Mean and population variance of the R, G and B channels
/// of a single image, in [0, 1] pixel scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelMoments {
    pub mean: [f64; 3],
    pub var:  [f64; 3],
}

impl ChannelMoments {
    /// Compute moments from interleaved RGB bytes (`R G B R G B ...`).
    /// Returns None when the buffer holds no complete pixel.
    pub fn from_rgb_bytes(rgb: &[u8]) -> Option<Self> {
        let pixels = rgb.len() / 3;
        if pixels == 0 {
            return None;
        }
        let n = pixels as f64;

        let mut mean = [0.0f64; 3];
        for px in rgb.chunks_exact(3) {
            for c in 0..3 {
                mean[c] += px[c] as f64 / 255.0;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        // Second pass for the variance keeps precision on large images
        let mut var = [0.0f64; 3];
        for px in rgb.chunks_exact(3) {
            for c in 0..3 {
                let d = px[c] as f64 / 255.0 - mean[c];
                var[c] += d * d;
            }
        }
        for v in &mut var {
            *v /= n;
        }

        Some(Self { mean, var })
    }
}

/// Running sums of per-image moments.
#[derive(Debug, Clone, Default)]
pub struct StatsAccumulator {
    mean_sum: [f64; 3],
    var_sum:  [f64; 3],
    images:   usize,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, moments: &ChannelMoments) {
        for c in 0..3 {
            self.mean_sum[c] += moments.mean[c];
            self.var_sum[c]  += moments.var[c];
        }
        self.images += 1;
    }

    pub fn images(&self) -> usize {
        self.images
    }

    /// Divide by the image count and take the square root of the
    /// variance. None if nothing was accumulated.
    pub fn finish(&self) -> Option<NormalizationStats> {
        if self.images == 0 {
            return None;
        }
        let n = self.images as f64;
        let mut mean = [0.0f32; 3];
        let mut std  = [0.0f32; 3];
        for c in 0..3 {
            mean[c] = (self.mean_sum[c] / n) as f32;
            std[c]  = (self.var_sum[c] / n).sqrt() as f32;
        }
        Some(NormalizationStats { mean, std })
    }
}

/// Per-channel normalisation statistics (R, G, B).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub mean: [f32; 3],
    pub std:  [f32; 3],
}

impl NormalizationStats {
    pub fn new(mean: [f32; 3], std: [f32; 3]) -> Self {
        Self { mean, std }
    }

    /// Identity transform: leaves [0, 1] pixels unchanged
    pub fn identity() -> Self {
        Self { mean: [0.0; 3], std: [1.0; 3] }
    }

    /// Normalise one [0, 1] value of channel `c`
    pub fn normalize(&self, c: usize, value: f32) -> f32 {
        (value - self.mean[c]) / self.std[c]
    }

    /// True if every std is a positive finite number,
    /// i.e. normalising cannot divide by zero.
    pub fn is_usable(&self) -> bool {
        self.std.iter().all(|s| s.is_finite() && *s > 0.0)
            && self.mean.iter().all(|m| m.is_finite())
    }
}

impl std::fmt::Display for NormalizationStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "mean=[{:.4}, {:.4}, {:.4}] std=[{:.4}, {:.4}, {:.4}]",
            self.mean[0], self.mean[1], self.mean[2],
            self.std[0],  self.std[1],  self.std[2],
        )
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_colour_has_zero_variance() {
        let rgb: Vec<u8> = [255u8, 0, 51].repeat(16);
        let m = ChannelMoments::from_rgb_bytes(&rgb).unwrap();
        assert!((m.mean[0] - 1.0).abs() < 1e-12);
        assert!(m.mean[1].abs() < 1e-12);
        assert!((m.mean[2] - 0.2).abs() < 1e-12);
        assert!(m.var.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_half_black_half_white() {
        // Two pixels: black and white → mean 0.5, population var 0.25
        let rgb = [0u8, 0, 0, 255, 255, 255];
        let m = ChannelMoments::from_rgb_bytes(&rgb).unwrap();
        for c in 0..3 {
            assert!((m.mean[c] - 0.5).abs() < 1e-12);
            assert!((m.var[c] - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn test_empty_buffer() {
        assert!(ChannelMoments::from_rgb_bytes(&[]).is_none());
        assert!(StatsAccumulator::new().finish().is_none());
    }

    #[test]
    fn test_accumulator_averages_per_image_values() {
        let black_white = ChannelMoments::from_rgb_bytes(&[0, 0, 0, 255, 255, 255]).unwrap();
        let white       = ChannelMoments::from_rgb_bytes(&[255, 255, 255]).unwrap();

        let mut acc = StatsAccumulator::new();
        acc.add(&black_white);
        acc.add(&white);
        let stats = acc.finish().unwrap();

        // mean = (0.5 + 1.0) / 2, std = sqrt((0.25 + 0.0) / 2)
        for c in 0..3 {
            assert!((stats.mean[c] - 0.75).abs() < 1e-6);
            assert!((stats.std[c] - (0.125f32).sqrt()).abs() < 1e-6);
        }
        assert_eq!(acc.images(), 2);
    }

    #[test]
    fn test_normalize_and_usability() {
        let stats = NormalizationStats::new([0.5; 3], [0.25; 3]);
        assert!((stats.normalize(1, 1.0) - 2.0).abs() < 1e-6);
        assert!(stats.is_usable());
        assert!(!NormalizationStats::new([0.5; 3], [0.0, 0.1, 0.1]).is_usable());
        assert!(NormalizationStats::identity().is_usable());
    }
}
