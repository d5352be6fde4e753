// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Runs a trained model over the validation split and builds an
// EvalReport (accuracy + confusion matrix).
//
// The model passed in must be on a backend without autodiff,
// e.g. the result of `model.valid()`. On such a backend no
// gradients are tracked, dropout is a no-op and batch norm
// uses its running statistics.
//
// The predicted class of a sample is the arg-max over its scores.

use anyhow::{Context, Result};
use burn::prelude::*;

use crate::data::dataloader::ImageLoader;
use crate::domain::confusion::EvalReport;
use crate::ml::model::DeepfakeClassifier;

pub fn evaluate<B: Backend>(
    model:  &DeepfakeClassifier<B>,
    loader: &ImageLoader<B>,
) -> Result<EvalReport> {
    let mut labels      = Vec::with_capacity(loader.num_items());
    let mut predictions = Vec::with_capacity(loader.num_items());

    for (batch_idx, batch) in loader.iter().enumerate() {
        let batch = batch.with_context(|| format!("Failed to build validation batch {}", batch_idx + 1))?;

        let output = model.forward(batch.images);
        // argmax(1) returns shape [batch, 1], flatten to [batch]
        let predicted = output.argmax(1).flatten::<1>(0, 1);

        predictions.extend(predicted.into_data().iter::<i64>().map(|p| p as usize));
        labels.extend(batch.targets);
    }

    let report = EvalReport::from_predictions(&labels, &predictions);
    tracing::info!(
        "Evaluated {} samples: {} correct ({:.2}%)",
        report.total, report.correct, report.accuracy
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{split_loader, write_split};
    use crate::ml::model::tiny_config;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};

    #[test]
    fn test_report_covers_every_sample() {
        let dir = tempfile::tempdir().unwrap();
        write_split(dir.path(), &[("fake", 3), ("real", 2)], 16);

        let device = NdArrayDevice::default();
        let loader = split_loader::<NdArray>(dir.path(), 16, 2, &device);

        let model  = tiny_config().init::<NdArray>(&device);
        let report = evaluate(&model, &loader).unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.matrix.total(), 5);
        // Row sums are the true class counts
        assert_eq!(report.matrix.cells[0].iter().sum::<usize>(), 3);
        assert_eq!(report.matrix.cells[1].iter().sum::<usize>(), 2);
        assert!((0.0..=100.0).contains(&report.accuracy));
    }
}
