//! Run-artifact writer: evaluation/tuning JSON, predictions CSV, DOT files.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::RunName;

/// Writes training and tuning artifacts for one named run.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{run}_evaluate.json`, `{run}_tune.json`,
/// `{run}_predictions.csv`, and `{run}_tree_{index}.dot`.
///
/// The writer accepts primitives only — it has no dependency on the
/// learning crate.
pub struct RunWriter {
    output_dir: PathBuf,
    run: RunName,
}

impl RunWriter {
    /// Create a new writer targeting the given directory and run name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), run = %run))]
    pub fn new(output_dir: &Path, run: RunName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            run,
        })
    }

    /// Write an evaluation result to `{run}_evaluate.json`.
    ///
    /// `confusion` is `[TP, FP, TN, FN]` with class 1 positive.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all)]
    pub fn write_evaluation(
        &self,
        n_trees: usize,
        max_depth: Option<usize>,
        min_samples_split: usize,
        max_features: usize,
        seed: u64,
        train_accuracy: f64,
        test_accuracy: f64,
        precision: f64,
        recall: f64,
        f1: f64,
        confusion: [usize; 4],
    ) -> Result<(), IoError> {
        let path = self
            .output_dir
            .join(format!("{}_evaluate.json", self.run.as_str()));

        let artifact = EvaluateArtifact {
            run: self.run.as_str(),
            hyperparameters: Hyperparameters {
                n_trees,
                max_depth,
                min_samples_split,
                max_features,
                seed,
            },
            train_accuracy,
            test_accuracy,
            precision,
            recall,
            f1,
            confusion: Confusion {
                true_positives: confusion[0],
                false_positives: confusion[1],
                true_negatives: confusion[2],
                false_negatives: confusion[3],
            },
        };

        let json = serde_json::to_string_pretty(&artifact).expect("serialization cannot fail");
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "evaluation result written");
        Ok(())
    }

    /// Write a tuning result to `{run}_tune.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all)]
    pub fn write_tuning(
        &self,
        n_trees: usize,
        max_depth: Option<usize>,
        min_samples_split: usize,
        max_features: usize,
        metric: &str,
        mean_score: f64,
        std_score: f64,
        n_folds: usize,
    ) -> Result<(), IoError> {
        let path = self
            .output_dir
            .join(format!("{}_tune.json", self.run.as_str()));

        let artifact = TuneArtifact {
            run: self.run.as_str(),
            best: BestCombination {
                n_trees,
                max_depth,
                min_samples_split,
                max_features,
            },
            metric,
            mean_score,
            std_score,
            n_folds,
        };

        let json = serde_json::to_string_pretty(&artifact).expect("serialization cannot fail");
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "tuning result written");
        Ok(())
    }

    /// Write per-sample predictions to `{run}_predictions.csv`.
    ///
    /// `probabilities[i]` is the class-1 probability; the emitted confidence
    /// column is the probability of the class actually predicted.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(n_samples = predictions.len()))]
    pub fn write_predictions(
        &self,
        predictions: &[usize],
        actuals: &[usize],
        probabilities: &[f64],
    ) -> Result<(), IoError> {
        let path = self
            .output_dir
            .join(format!("{}_predictions.csv", self.run.as_str()));

        let mut out =
            String::from("sample_index,prediction,actual,probability,confidence,correct\n");
        for (i, ((&prediction, &actual), &probability)) in predictions
            .iter()
            .zip(actuals.iter())
            .zip(probabilities.iter())
            .enumerate()
        {
            let confidence = if prediction == 1 {
                probability
            } else {
                1.0 - probability
            };
            let _ = writeln!(
                out,
                "{i},{prediction},{actual},{probability:.6},{confidence:.6},{}",
                prediction == actual
            );
        }

        fs::write(&path, &out).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "predictions written");
        Ok(())
    }

    /// Write a DOT rendering of tree `tree_index` to `{run}_tree_{index}.dot`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip(self, dot))]
    pub fn write_tree_dot(&self, tree_index: usize, dot: &str) -> Result<(), IoError> {
        let path = self
            .output_dir
            .join(format!("{}_tree_{tree_index}.dot", self.run.as_str()));

        fs::write(&path, dot).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "tree visualisation written");
        Ok(())
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct Hyperparameters {
    n_trees: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    max_features: usize,
    seed: u64,
}

#[derive(Serialize)]
struct Confusion {
    true_positives: usize,
    false_positives: usize,
    true_negatives: usize,
    false_negatives: usize,
}

#[derive(Serialize)]
struct EvaluateArtifact<'a> {
    run: &'a str,
    hyperparameters: Hyperparameters,
    train_accuracy: f64,
    test_accuracy: f64,
    precision: f64,
    recall: f64,
    f1: f64,
    confusion: Confusion,
}

#[derive(Serialize)]
struct BestCombination {
    n_trees: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    max_features: usize,
}

#[derive(Serialize)]
struct TuneArtifact<'a> {
    run: &'a str,
    best: BestCombination,
    metric: &'a str,
    mean_score: f64,
    std_score: f64,
    n_folds: usize,
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn writer(dir: &TempDir, run: &str) -> RunWriter {
        RunWriter::new(dir.path(), RunName::new(run.to_string()).unwrap()).unwrap()
    }

    #[test]
    fn write_evaluation_json_structure() {
        let dir = TempDir::new().unwrap();
        let w = writer(&dir, "test_run");
        w.write_evaluation(
            100,
            Some(10),
            2,
            3,
            42,
            0.98,
            0.85,
            0.84,
            0.88,
            0.86,
            [40, 8, 45, 7],
        )
        .unwrap();

        let path = dir.path().join("test_run_evaluate.json");
        assert!(path.exists());

        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(content["run"], "test_run");
        assert_eq!(content["hyperparameters"]["n_trees"], 100);
        assert_eq!(content["hyperparameters"]["max_depth"], 10);
        assert_eq!(content["test_accuracy"], 0.85);
        assert_eq!(content["confusion"]["true_positives"], 40);
        assert_eq!(content["confusion"]["false_negatives"], 7);
    }

    #[test]
    fn write_evaluation_unlimited_depth_is_null() {
        let dir = TempDir::new().unwrap();
        let w = writer(&dir, "nodepth");
        w.write_evaluation(10, None, 2, 1, 42, 1.0, 1.0, 1.0, 1.0, 1.0, [1, 0, 1, 0])
            .unwrap();

        let content: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("nodepth_evaluate.json")).unwrap(),
        )
        .unwrap();
        assert!(content["hyperparameters"]["max_depth"].is_null());
    }

    #[test]
    fn write_tuning_json_structure() {
        let dir = TempDir::new().unwrap();
        let w = writer(&dir, "tune_run");
        w.write_tuning(50, None, 4, 2, "f1", 0.91, 0.03, 5).unwrap();

        let content: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("tune_run_tune.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(content["best"]["n_trees"], 50);
        assert!(content["best"]["max_depth"].is_null());
        assert_eq!(content["metric"], "f1");
        assert_eq!(content["n_folds"], 5);
    }

    #[test]
    fn write_predictions_csv_rows() {
        let dir = TempDir::new().unwrap();
        let w = writer(&dir, "preds");
        w.write_predictions(&[1, 0], &[1, 1], &[0.75, 0.40]).unwrap();

        let content =
            fs::read_to_string(dir.path().join("preds_predictions.csv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "sample_index,prediction,actual,probability,confidence,correct"
        );
        assert_eq!(lines[1], "0,1,1,0.750000,0.750000,true");
        // Predicted 0, so confidence is 1 - probability.
        assert_eq!(lines[2], "1,0,1,0.400000,0.600000,false");
    }

    #[test]
    fn write_tree_dot_passthrough() {
        let dir = TempDir::new().unwrap();
        let w = writer(&dir, "viz");
        w.write_tree_dot(3, "digraph DecisionTree {\n}\n").unwrap();

        let content = fs::read_to_string(dir.path().join("viz_tree_3.dot")).unwrap();
        assert!(content.starts_with("digraph DecisionTree"));
    }

    #[test]
    fn creates_nested_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("deep").join("er");
        let w = RunWriter::new(&nested, RunName::new("n".to_string()).unwrap()).unwrap();
        w.write_tree_dot(0, "digraph DecisionTree {}\n").unwrap();
        assert!(nested.join("n_tree_0.dot").exists());
    }
}
