// ============================================================
// Layer 2 — StatsUseCase
// ============================================================
// Computes (or reads back) the per-channel normalisation
// statistics of the training split without training anything.

use anyhow::Result;
use std::path::Path;

use crate::domain::stats::NormalizationStats;
use crate::infra::stats_cache::StatsCache;

pub struct StatsUseCase {
    data_dir:    String,
    stats_cache: String,
}

impl StatsUseCase {
    pub fn new(data_dir: impl Into<String>, stats_cache: impl Into<String>) -> Self {
        Self { data_dir: data_dir.into(), stats_cache: stats_cache.into() }
    }

    pub fn execute(&self) -> Result<NormalizationStats> {
        let train_dir = Path::new(&self.data_dir).join("train");
        StatsCache::new(&self.stats_cache).load_or_compute(&train_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::write_dataset;

    #[test]
    fn test_writes_cache_file() {
        let dir   = tempfile::tempdir().unwrap();
        let cache = dir.path().join("cache").join("mean_and_std.json");
        write_dataset(&dir.path().join("data"), 1, 1, 8);

        let stats = StatsUseCase::new(
            dir.path().join("data").display().to_string(),
            cache.display().to_string(),
        )
        .execute()
        .unwrap();

        assert!(stats.is_usable());
        assert!(cache.exists());
    }
}
