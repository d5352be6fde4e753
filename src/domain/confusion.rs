// ============================================================
// Layer 3 — Evaluation Report
// ============================================================
// Accuracy and a 2x2 confusion matrix for the binary classifier.
//
// The matrix is indexed [true class][predicted class] using the
// class indices from `Label`:
//
//                  predicted Fake   predicted Real
//   true Fake           TP               FN
//   true Real           FP               TN
//
// Fake is the positive class: the detector's job is to flag fakes.

use crate::domain::sample::Label;

/// Counts of (true, predicted) pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub cells: [[usize; Label::COUNT]; Label::COUNT],
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one prediction. Indices outside {0, 1} are ignored
    /// and reported back as false.
    pub fn record(&mut self, truth: usize, predicted: usize) -> bool {
        match self.cells.get_mut(truth).and_then(|row| row.get_mut(predicted)) {
            Some(cell) => {
                *cell += 1;
                true
            }
            None => false,
        }
    }

    pub fn count(&self, truth: Label, predicted: Label) -> usize {
        self.cells[truth.index()][predicted.index()]
    }

    /// Fake identified as Fake
    pub fn true_positives(&self) -> usize {
        self.count(Label::Fake, Label::Fake)
    }

    /// Fake identified as Real
    pub fn false_negatives(&self) -> usize {
        self.count(Label::Fake, Label::Real)
    }

    /// Real identified as Fake
    pub fn false_positives(&self) -> usize {
        self.count(Label::Real, Label::Fake)
    }

    /// Real identified as Real
    pub fn true_negatives(&self) -> usize {
        self.count(Label::Real, Label::Real)
    }

    pub fn total(&self) -> usize {
        self.cells.iter().flatten().sum()
    }
}

/// Result of running the evaluator over a validation split.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalReport {
    pub total:    usize,
    pub correct:  usize,
    /// Percentage in [0, 100]; 0 when nothing was evaluated
    pub accuracy: f64,
    pub matrix:   ConfusionMatrix,
}

impl EvalReport {
    /// Build a report from parallel slices of true and predicted
    /// class indices. Pairs with an out-of-range index still count
    /// towards `total` and `correct` but not towards the matrix.
    pub fn from_predictions(labels: &[usize], predictions: &[usize]) -> Self {
        let mut matrix  = ConfusionMatrix::new();
        let mut correct = 0usize;

        for (&truth, &pred) in labels.iter().zip(predictions) {
            if truth == pred {
                correct += 1;
            }
            if !matrix.record(truth, pred) {
                tracing::warn!("Class index out of range: true={} predicted={}", truth, pred);
            }
        }

        let total    = labels.len().min(predictions.len());
        let accuracy = if total > 0 { 100.0 * correct as f64 / total as f64 } else { 0.0 };

        Self { total, correct, accuracy, matrix }
    }

    /// Print accuracy and the confusion counts to stdout.
    pub fn print(&self) {
        let m = &self.matrix;
        println!("Validation Accuracy: {:.2}%", self.accuracy);
        println!("True Positives  (Fake identified as Fake): {}", m.true_positives());
        println!("False Negatives (Fake identified as Real): {}", m.false_negatives());
        println!("False Positives (Real identified as Fake): {}", m.false_positives());
        println!("True Negatives  (Real identified as Real): {}", m.true_negatives());
        println!("Confusion Matrix (rows = true, cols = predicted; Fake, Real):");
        for row in &m.cells {
            println!("  [{:>6} {:>6}]", row[0], row[1]);
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_correct_predictions() {
        let labels = vec![0, 1, 1, 0, 1];
        let report = EvalReport::from_predictions(&labels, &labels);

        assert_eq!(report.accuracy, 100.0);
        assert_eq!(report.total, 5);
        assert_eq!(report.matrix.false_positives(), 0);
        assert_eq!(report.matrix.false_negatives(), 0);
        assert_eq!(report.matrix.true_positives(), 2);
        assert_eq!(report.matrix.true_negatives(), 3);
    }

    #[test]
    fn test_cell_positions() {
        // fake→real, real→fake, real→real, fake→fake
        let labels      = vec![0, 1, 1, 0];
        let predictions = vec![1, 0, 1, 0];
        let report = EvalReport::from_predictions(&labels, &predictions);

        assert_eq!(report.matrix.cells, [[1, 1], [1, 1]]);
        assert_eq!(report.correct, 2);
        assert!((report.accuracy - 50.0).abs() < 1e-9);
        assert_eq!(report.matrix.total(), 4);
    }

    #[test]
    fn test_empty_report() {
        let report = EvalReport::from_predictions(&[], &[]);
        assert_eq!(report.total, 0);
        assert_eq!(report.accuracy, 0.0);
    }

    #[test]
    fn test_out_of_range_index_not_recorded() {
        let mut m = ConfusionMatrix::new();
        assert!(!m.record(2, 0));
        assert!(m.record(1, 1));
        assert_eq!(m.total(), 1);
    }
}
