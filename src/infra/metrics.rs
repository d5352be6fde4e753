// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends the average training loss of every epoch to a CSV
// file, so a loss curve survives the console output.
//
// Example CSV output:
//   epoch,train_loss
//   1,0.693147
//   2,0.652210
//   ...
//
// The file is appended to across runs. Rows for epochs after the
// checkpoint a run resumes from are dropped first (see
// `truncate_after`), so a crash between checkpoints does not
// leave the same epoch number twice.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Average cross-entropy loss over all training batches
    pub train_loss: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64) -> Self {
        Self { epoch, train_loss }
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(csv_path: impl Into<PathBuf>) -> Result<Self> {
        let csv_path = csv_path.into();

        if let Some(parent) = csv_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "epoch,train_loss")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{},{:.6}", m.epoch, m.train_loss)?;

        tracing::debug!("Logged epoch {} metrics: train_loss={:.4}", m.epoch, m.train_loss);
        Ok(())
    }

    /// Drop every row whose epoch is greater than `epoch`.
    /// Returns the number of rows removed.
    pub fn truncate_after(&self, epoch: usize) -> Result<usize> {
        let csv = fs::read_to_string(&self.csv_path)
            .with_context(|| format!("Cannot read '{}'", self.csv_path.display()))?;

        let mut lines = csv.lines();
        let header    = lines.next().unwrap_or("epoch,train_loss");
        let rows: Vec<&str> = lines.collect();
        let kept: Vec<&str> = rows
            .iter()
            .copied()
            .filter(|row| {
                row.split(',')
                    .next()
                    .and_then(|e| e.trim().parse::<usize>().ok())
                    .map_or(true, |e| e <= epoch)
            })
            .collect();

        let removed = rows.len() - kept.len();
        if removed > 0 {
            let mut out = String::from(header);
            out.push('\n');
            for row in &kept {
                out.push_str(row);
                out.push('\n');
            }
            fs::write(&self.csv_path, out)
                .with_context(|| format!("Cannot rewrite '{}'", self.csv_path.display()))?;
            tracing::info!("Dropped {} metrics rows after epoch {}", removed, epoch);
        }
        Ok(removed)
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
