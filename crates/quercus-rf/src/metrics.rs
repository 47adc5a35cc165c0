//! Binary classification metrics over prediction and ground-truth vectors.

use std::fmt;
use std::str::FromStr;

use crate::error::RfError;

/// A binary confusion matrix with class 1 as the positive class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionMatrix {
    /// Predicted 1, actual 1.
    pub true_positives: usize,
    /// Predicted 1, actual 0.
    pub false_positives: usize,
    /// Predicted 0, actual 0.
    pub true_negatives: usize,
    /// Predicted 0, actual 1.
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from predictions and ground-truth labels.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`RfError::LengthMismatch`] | vector lengths differ |
    /// | [`RfError::EmptyDataset`] | zero labels provided |
    pub fn from_predictions(predictions: &[usize], actuals: &[usize]) -> Result<Self, RfError> {
        if predictions.len() != actuals.len() {
            return Err(RfError::LengthMismatch {
                predictions: predictions.len(),
                actuals: actuals.len(),
            });
        }
        if predictions.is_empty() {
            return Err(RfError::EmptyDataset);
        }

        let mut matrix = Self {
            true_positives: 0,
            false_positives: 0,
            true_negatives: 0,
            false_negatives: 0,
        };
        for (&predicted, &actual) in predictions.iter().zip(actuals.iter()) {
            match (predicted, actual) {
                (1, 1) => matrix.true_positives += 1,
                (1, 0) => matrix.false_positives += 1,
                (0, 0) => matrix.true_negatives += 1,
                _ => matrix.false_negatives += 1,
            }
        }
        Ok(matrix)
    }

    /// Total number of samples counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    /// Accuracy: (TP + TN) / total.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        (self.true_positives + self.true_negatives) as f64 / self.total() as f64
    }

    /// Precision: TP / (TP + FP), or 0.0 when nothing was predicted positive.
    #[must_use]
    pub fn precision(&self) -> f64 {
        let denominator = self.true_positives + self.false_positives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    /// Recall: TP / (TP + FN), or 0.0 when no positives exist.
    #[must_use]
    pub fn recall(&self) -> f64 {
        let denominator = self.true_positives + self.false_negatives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    /// F1: harmonic mean of precision and recall, or 0.0 when both are zero.
    #[must_use]
    pub fn f1(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>16}", "Predicted")?;
        writeln!(f, "{:>14}{:>7}", "0", "1")?;
        writeln!(
            f,
            "Actual 0{:>6}{:>7}",
            self.true_negatives, self.false_positives
        )?;
        writeln!(
            f,
            "       1{:>6}{:>7}",
            self.false_negatives, self.true_positives
        )
    }
}

/// Evaluation metric selectable for tuning and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Fraction of correct predictions.
    Accuracy,
    /// TP / (TP + FP).
    Precision,
    /// TP / (TP + FN).
    Recall,
    /// Harmonic mean of precision and recall.
    F1,
}

impl Metric {
    /// Evaluate this metric over predictions and ground-truth labels.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`RfError::LengthMismatch`] | vector lengths differ |
    /// | [`RfError::EmptyDataset`] | zero labels provided |
    pub fn evaluate(&self, predictions: &[usize], actuals: &[usize]) -> Result<f64, RfError> {
        let matrix = ConfusionMatrix::from_predictions(predictions, actuals)?;
        Ok(match self {
            Metric::Accuracy => matrix.accuracy(),
            Metric::Precision => matrix.precision(),
            Metric::Recall => matrix.recall(),
            Metric::F1 => matrix.f1(),
        })
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Accuracy => "accuracy",
            Metric::Precision => "precision",
            Metric::Recall => "recall",
            Metric::F1 => "f1",
        };
        f.write_str(name)
    }
}

impl FromStr for Metric {
    type Err = RfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accuracy" => Ok(Metric::Accuracy),
            "precision" => Ok(Metric::Precision),
            "recall" => Ok(Metric::Recall),
            "f1" => Ok(Metric::F1),
            _ => Err(RfError::UnknownMetric {
                name: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_counts() {
        // Pred: [1,1,0,0,1,0]  Actual: [1,0,0,1,1,0]
        let predictions = vec![1, 1, 0, 0, 1, 0];
        let actuals = vec![1, 0, 0, 1, 1, 0];
        let cm = ConfusionMatrix::from_predictions(&predictions, &actuals).unwrap();
        assert_eq!(cm.true_positives, 2);
        assert_eq!(cm.false_positives, 1);
        assert_eq!(cm.true_negatives, 2);
        assert_eq!(cm.false_negatives, 1);
        assert_eq!(cm.total(), 6);

        assert!((cm.accuracy() - 4.0 / 6.0).abs() < 1e-12);
        assert!((cm.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((cm.recall() - 2.0 / 3.0).abs() < 1e-12);
        assert!((cm.f1() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn perfect_predictions_score_one_everywhere() {
        let labels = vec![0, 1, 1, 0, 1];
        let cm = ConfusionMatrix::from_predictions(&labels, &labels).unwrap();
        assert!((cm.accuracy() - 1.0).abs() < f64::EPSILON);
        assert!((cm.precision() - 1.0).abs() < f64::EPSILON);
        assert!((cm.recall() - 1.0).abs() < f64::EPSILON);
        assert!((cm.f1() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn no_positive_predictions_zero_precision() {
        let cm = ConfusionMatrix::from_predictions(&[0, 0, 0], &[1, 0, 1]).unwrap();
        assert_eq!(cm.precision(), 0.0);
        assert_eq!(cm.f1(), 0.0);
    }

    #[test]
    fn no_actual_positives_zero_recall() {
        let cm = ConfusionMatrix::from_predictions(&[1, 0, 1], &[0, 0, 0]).unwrap();
        assert_eq!(cm.recall(), 0.0);
        assert_eq!(cm.f1(), 0.0);
    }

    #[test]
    fn f1_zero_iff_precision_plus_recall_zero() {
        // All-wrong negative predictions: precision = recall = 0 -> f1 = 0.
        let cm = ConfusionMatrix::from_predictions(&[0, 0], &[1, 1]).unwrap();
        assert_eq!(cm.precision() + cm.recall(), 0.0);
        assert_eq!(cm.f1(), 0.0);

        // Any positive precision+recall -> positive f1.
        let cm = ConfusionMatrix::from_predictions(&[1, 0], &[1, 1]).unwrap();
        assert!(cm.precision() + cm.recall() > 0.0);
        assert!(cm.f1() > 0.0);
    }

    #[test]
    fn length_mismatch_error() {
        let err = ConfusionMatrix::from_predictions(&[0, 1], &[0]).unwrap_err();
        assert!(matches!(
            err,
            RfError::LengthMismatch {
                predictions: 2,
                actuals: 1
            }
        ));
    }

    #[test]
    fn empty_input_error() {
        let err = ConfusionMatrix::from_predictions(&[], &[]).unwrap_err();
        assert!(matches!(err, RfError::EmptyDataset));
    }

    #[test]
    fn metric_dispatch_matches_matrix() {
        let predictions = vec![1, 1, 0, 0, 1, 0];
        let actuals = vec![1, 0, 0, 1, 1, 0];
        let cm = ConfusionMatrix::from_predictions(&predictions, &actuals).unwrap();

        for (metric, expected) in [
            (Metric::Accuracy, cm.accuracy()),
            (Metric::Precision, cm.precision()),
            (Metric::Recall, cm.recall()),
            (Metric::F1, cm.f1()),
        ] {
            let got = metric.evaluate(&predictions, &actuals).unwrap();
            assert!((got - expected).abs() < 1e-12, "{metric}: {got} vs {expected}");
        }
    }

    #[test]
    fn metric_parses_from_str() {
        assert_eq!("accuracy".parse::<Metric>().unwrap(), Metric::Accuracy);
        assert_eq!("F1".parse::<Metric>().unwrap(), Metric::F1);
        assert_eq!("Recall".parse::<Metric>().unwrap(), Metric::Recall);
        assert!(matches!(
            "auc".parse::<Metric>().unwrap_err(),
            RfError::UnknownMetric { .. }
        ));
    }

    #[test]
    fn display_round_trips_parse() {
        for metric in [Metric::Accuracy, Metric::Precision, Metric::Recall, Metric::F1] {
            assert_eq!(metric.to_string().parse::<Metric>().unwrap(), metric);
        }
    }

    #[test]
    fn display_renders_counts() {
        let cm = ConfusionMatrix::from_predictions(&[1, 0], &[1, 1]).unwrap();
        let rendered = format!("{cm}");
        assert!(rendered.contains("Predicted"));
        assert!(rendered.contains("Actual 0"));
    }
}
