//! Grid-search hyperparameter tuning with k-fold cross-validation.

use std::fmt;

use tracing::{debug, info, instrument};

use crate::dataset::Dataset;
use crate::error::RfError;
use crate::forest::RandomForestConfig;
use crate::metrics::Metric;
use crate::splitter::k_fold_split;

/// Candidate values for each tunable Random Forest hyperparameter.
///
/// The search space is the Cartesian product of the four axes. A `None`
/// max-depth candidate means unlimited depth.
#[derive(Debug, Clone)]
pub struct ParameterGrid {
    n_trees: Vec<usize>,
    max_depth: Vec<Option<usize>>,
    min_samples_split: Vec<usize>,
    max_features: Vec<usize>,
}

impl ParameterGrid {
    /// Create a grid from the four candidate axes.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::EmptyGrid`] naming the first axis with no candidates.
    pub fn new(
        n_trees: Vec<usize>,
        max_depth: Vec<Option<usize>>,
        min_samples_split: Vec<usize>,
        max_features: Vec<usize>,
    ) -> Result<Self, RfError> {
        if n_trees.is_empty() {
            return Err(RfError::EmptyGrid { axis: "n_trees" });
        }
        if max_depth.is_empty() {
            return Err(RfError::EmptyGrid { axis: "max_depth" });
        }
        if min_samples_split.is_empty() {
            return Err(RfError::EmptyGrid {
                axis: "min_samples_split",
            });
        }
        if max_features.is_empty() {
            return Err(RfError::EmptyGrid {
                axis: "max_features",
            });
        }
        Ok(Self {
            n_trees,
            max_depth,
            min_samples_split,
            max_features,
        })
    }

    /// Return the total number of parameter combinations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n_trees.len()
            * self.max_depth.len()
            * self.min_samples_split.len()
            * self.max_features.len()
    }

    /// Return `true` if the grid has no combinations (never after validation).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The winning parameter tuple of a grid search, with its fold statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningResult {
    /// Number of trees.
    pub n_trees: usize,
    /// Maximum tree depth, `None` for unlimited.
    pub max_depth: Option<usize>,
    /// Minimum samples required to attempt a split.
    pub min_samples_split: usize,
    /// Attributes considered at each split.
    pub max_features: usize,
    /// Mean validation score across folds.
    pub mean_score: f64,
    /// Population standard deviation of the fold scores.
    pub std_score: f64,
    /// The metric that was optimised.
    pub metric: Metric,
}

impl fmt::Display for TuningResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Best hyperparameters (optimising {}):", self.metric)?;
        writeln!(f, "  n_trees: {}", self.n_trees)?;
        match self.max_depth {
            Some(depth) => writeln!(f, "  max_depth: {depth}")?,
            None => writeln!(f, "  max_depth: unlimited")?,
        }
        writeln!(f, "  min_samples_split: {}", self.min_samples_split)?;
        writeln!(f, "  max_features: {}", self.max_features)?;
        write!(
            f,
            "  {}: {:.4} (std: {:.4})",
            self.metric, self.mean_score, self.std_score
        )
    }
}

/// Grid-search tuner driving k-fold cross-validation.
///
/// Construct via [`HyperparameterTuner::new`], then chain `with_seed` /
/// `with_metric` as needed.
#[derive(Debug, Clone)]
pub struct HyperparameterTuner {
    n_folds: usize,
    seed: u64,
    metric: Metric,
}

impl HyperparameterTuner {
    /// Create a tuner with the given fold count (accuracy metric, seed 42).
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, RfError> {
        if n_folds < 2 {
            return Err(RfError::InvalidFoldCount { n_folds });
        }
        Ok(Self {
            n_folds,
            seed: 42,
            metric: Metric::Accuracy,
        })
    }

    /// Set the random seed used for folding and every candidate forest.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the metric to optimise.
    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Return the fold count.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Return the metric being optimised.
    #[must_use]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Search the grid, scoring every combination with k-fold cross-validation.
    ///
    /// The dataset is partitioned once up front; each combination trains one
    /// forest per fold on the other folds and scores it on the held-out
    /// fold. The combination with the highest mean score wins; ties keep
    /// the earliest combination in grid iteration order (n_trees outermost,
    /// then max_depth, min_samples_split, max_features).
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`RfError::FoldCountExceedsSamples`] | more folds than samples |
    /// | [`RfError::InvalidTreeCount`] and friends | an invalid grid candidate |
    #[instrument(skip(self, dataset, grid), fields(n_folds = self.n_folds, n_combinations = grid.len(), metric = %self.metric))]
    pub fn tune(&self, dataset: &Dataset, grid: &ParameterGrid) -> Result<TuningResult, RfError> {
        let folds = k_fold_split(dataset, self.n_folds, self.seed)?;

        let mut best: Option<TuningResult> = None;
        let mut tested = 0usize;

        for &n_trees in &grid.n_trees {
            for &max_depth in &grid.max_depth {
                for &min_samples_split in &grid.min_samples_split {
                    for &max_features in &grid.max_features {
                        tested += 1;

                        let mut fold_scores = Vec::with_capacity(folds.len());
                        for (train, validation) in &folds {
                            let config = RandomForestConfig::new(n_trees)?
                                .with_max_depth(max_depth)
                                .with_min_samples_split(min_samples_split)
                                .with_max_features(Some(max_features))
                                .with_seed(self.seed);
                            let forest = config.fit(train)?;

                            let mut predictions = Vec::with_capacity(validation.n_samples());
                            for i in 0..validation.n_samples() {
                                predictions.push(forest.predict(validation.sample(i))?);
                            }
                            fold_scores
                                .push(self.metric.evaluate(&predictions, &validation.labels())?);
                        }

                        let mean_score =
                            fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
                        let std_score = (fold_scores
                            .iter()
                            .map(|&s| (s - mean_score).powi(2))
                            .sum::<f64>()
                            / fold_scores.len() as f64)
                            .sqrt();

                        debug!(
                            tested,
                            n_trees,
                            ?max_depth,
                            min_samples_split,
                            max_features,
                            mean_score,
                            "combination scored"
                        );

                        if best.as_ref().is_none_or(|b| mean_score > b.mean_score) {
                            info!(
                                n_trees,
                                ?max_depth,
                                min_samples_split,
                                max_features,
                                mean_score,
                                std_score,
                                "new best combination"
                            );
                            best = Some(TuningResult {
                                n_trees,
                                max_depth,
                                min_samples_split,
                                max_features,
                                mean_score,
                                std_score,
                                metric: self.metric,
                            });
                        }
                    }
                }
            }
        }

        best.ok_or(RfError::EmptyGrid { axis: "n_trees" })
    }
}
