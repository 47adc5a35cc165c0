//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::dataset::Dataset;
use crate::error::RfError;
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// Configuration for Random Forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `max_features`      | `None` (all features) |
/// | `seed`              | 42                    |
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, RfError> {
        if n_trees == 0 {
            return Err(RfError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        })
    }

    /// Set the maximum tree depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the maximum number of attributes considered at each split.
    ///
    /// `None` means consider every available attribute.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the maximum attributes considered per split, if set.
    #[must_use]
    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a Random Forest on the dataset.
    ///
    /// Trees train in parallel, each from its own pre-derived child seed,
    /// so the resulting ensemble is identical for a given seed regardless
    /// of how many worker threads run the builds.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | the dataset view has zero samples |
    /// | [`RfError::InvalidMaxDepth`] | `max_depth` is `Some(0)` |
    /// | [`RfError::InvalidMinSamplesSplit`] | `min_samples_split` < 2 |
    /// | [`RfError::InvalidMaxFeatures`] | `max_features` resolves outside [1, n_features] |
    #[instrument(skip(self, dataset), fields(n_trees = self.n_trees, n_samples = dataset.n_samples()))]
    pub fn fit(&self, dataset: &Dataset) -> Result<RandomForest, RfError> {
        let n_samples = dataset.n_samples();
        if n_samples == 0 {
            return Err(RfError::EmptyDataset);
        }

        let n_features = dataset.n_features();

        if let Some(d) = self.max_depth
            && d == 0
        {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }

        info!(
            n_trees = self.n_trees,
            n_samples,
            n_features,
            max_features,
            "training random forest"
        );

        // Derive one child seed per tree before any parallelism, so tree
        // content is independent of scheduler interleaving.
        let mut master_rng = ChaCha8Rng::seed_from_u64(self.seed);
        let tree_seeds: Vec<u64> = (0..self.n_trees).map(|_| master_rng.r#gen()).collect();

        // Capture config fields needed in the closure.
        let max_depth = self.max_depth;
        let min_samples_split = self.min_samples_split;

        let trees: Vec<DecisionTree> = tree_seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let indices = bootstrap_indices(n_samples, &mut rng);
                let sample = dataset.subset(&indices);

                let tree_config = DecisionTreeConfig::new()
                    .with_max_depth(max_depth)
                    .with_min_samples_split(min_samples_split)
                    .with_max_features(Some(max_features))
                    .with_seed(rng.r#gen());

                // All inputs are pre-validated — fit cannot fail here.
                tree_config
                    .fit(&sample)
                    .expect("tree fit should not fail on pre-validated data")
            })
            .collect();

        debug!(n_trees_trained = trees.len(), "tree training complete");

        Ok(RandomForest {
            trees,
            n_features,
            feature_names: dataset.feature_names().to_vec(),
        })
    }
}

/// Draw a bootstrap sample: `n_samples` indices with replacement.
fn bootstrap_indices(n_samples: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
}

/// A fitted Random Forest ensemble for binary classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) feature_names: Vec<String>,
}

impl RandomForest {
    /// Predict the class label for a single sample by majority vote.
    ///
    /// Tie-break: an even vote resolves to class 1 (class 0 wins only with
    /// a strict majority).
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        let mut votes = [0usize; 2];
        for tree in &self.trees {
            votes[tree.predict(sample)?] += 1;
        }
        Ok(usize::from(votes[0] <= votes[1]))
    }

    /// Predict class labels for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(&self, samples: &[Vec<f64>]) -> Result<Vec<usize>, RfError> {
        samples
            .par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Return the smoothed probability of class 1 for a single sample.
    ///
    /// With `p` positive votes out of `T` trees the estimate is
    /// `(p + 1) / (T + 2)`, so it always lies strictly inside (0, 1).
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<f64, RfError> {
        let mut positive = 0usize;
        for tree in &self.trees {
            positive += tree.predict(sample)?;
        }
        Ok((positive as f64 + 1.0) / (self.trees.len() as f64 + 2.0))
    }

    /// Return the accuracy of the forest on a labelled dataset.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | the dataset view has zero samples |
    /// | [`RfError::PredictionFeatureMismatch`] | feature count differs from training |
    pub fn score(&self, dataset: &Dataset) -> Result<f64, RfError> {
        let n_samples = dataset.n_samples();
        if n_samples == 0 {
            return Err(RfError::EmptyDataset);
        }
        let mut correct = 0usize;
        for i in 0..n_samples {
            if self.predict(dataset.sample(i))? == dataset.label(i) {
                correct += 1;
            }
        }
        Ok(correct as f64 / n_samples as f64)
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the feature names recorded at training time.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the fitted trees in training order.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::node::Node;

    fn separable() -> Dataset {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            features.push(vec![i as f64 * 0.15, 0.5]);
            labels.push(0);
        }
        for i in 0..20 {
            features.push(vec![10.0 + i as f64 * 0.15, 0.5]);
            labels.push(1);
        }
        Dataset::new(features, labels, None, BTreeSet::new()).unwrap()
    }

    /// A forest assembled from single-leaf trees with fixed predictions.
    fn stub_forest(leaf_classes: &[usize]) -> RandomForest {
        let trees = leaf_classes
            .iter()
            .map(|&class| DecisionTree {
                nodes: vec![Node::Leaf {
                    prediction: class,
                    n_samples: 1,
                }],
                n_features: 1,
            })
            .collect();
        RandomForest {
            trees,
            n_features: 1,
            feature_names: vec!["feat_0".to_string()],
        }
    }

    #[test]
    fn separable_training_accuracy() {
        let ds = separable();
        let forest = RandomForestConfig::new(25)
            .unwrap()
            .with_seed(42)
            .fit(&ds)
            .unwrap();
        let accuracy = forest.score(&ds).unwrap();
        assert!(accuracy > 0.95, "accuracy = {accuracy}");
    }

    #[test]
    fn tree_count_matches_config() {
        let forest = RandomForestConfig::new(7)
            .unwrap()
            .fit(&separable())
            .unwrap();
        assert_eq!(forest.n_trees(), 7);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let ds = separable();
        let forest1 = RandomForestConfig::new(10)
            .unwrap()
            .with_seed(99)
            .fit(&ds)
            .unwrap();
        let forest2 = RandomForestConfig::new(10)
            .unwrap()
            .with_seed(99)
            .fit(&ds)
            .unwrap();
        assert_eq!(forest1, forest2);
    }

    #[test]
    fn deterministic_across_worker_counts() {
        let ds = separable();
        let config = RandomForestConfig::new(8).unwrap().with_seed(7);

        let single = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(|| config.fit(&ds).unwrap());
        let several = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .unwrap()
            .install(|| config.fit(&ds).unwrap());

        assert_eq!(single, several);
    }

    #[test]
    fn bootstrap_indices_reproducible() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(7);
        let mut rng2 = ChaCha8Rng::seed_from_u64(7);
        let draw1 = bootstrap_indices(100, &mut rng1);
        let draw2 = bootstrap_indices(100, &mut rng2);
        assert_eq!(draw1, draw2);
        assert_eq!(draw1.len(), 100);
        assert!(draw1.iter().all(|&i| i < 100));
    }

    #[test]
    fn vote_tie_resolves_to_class_one() {
        let forest = stub_forest(&[0, 1]);
        assert_eq!(forest.predict(&[0.0]).unwrap(), 1);
    }

    #[test]
    fn strict_majority_of_zeros_wins() {
        let forest = stub_forest(&[0, 0, 1]);
        assert_eq!(forest.predict(&[0.0]).unwrap(), 0);
    }

    #[test]
    fn predict_matches_vote_counts() {
        let ds = separable();
        let forest = RandomForestConfig::new(9)
            .unwrap()
            .with_seed(3)
            .fit(&ds)
            .unwrap();
        for i in 0..ds.n_samples() {
            let sample = ds.sample(i);
            let positive: usize = forest
                .trees()
                .iter()
                .map(|t| t.predict(sample).unwrap())
                .sum();
            let expected = usize::from(positive * 2 >= forest.n_trees());
            assert_eq!(forest.predict(sample).unwrap(), expected);
        }
    }

    #[test]
    fn proba_single_tree_smoothing() {
        let positive = stub_forest(&[1]);
        assert!((positive.predict_proba(&[0.0]).unwrap() - 2.0 / 3.0).abs() < 1e-12);

        let negative = stub_forest(&[0]);
        assert!((negative.predict_proba(&[0.0]).unwrap() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn proba_stays_strictly_inside_unit_interval() {
        let ds = separable();
        let forest = RandomForestConfig::new(5)
            .unwrap()
            .with_seed(42)
            .fit(&ds)
            .unwrap();
        let t = forest.n_trees() as f64;
        for i in 0..ds.n_samples() {
            let p = forest.predict_proba(ds.sample(i)).unwrap();
            assert!(p >= 1.0 / (t + 2.0) - 1e-12);
            assert!(p <= (t + 1.0) / (t + 2.0) + 1e-12);
        }
    }

    #[test]
    fn score_equals_batch_accuracy() {
        let ds = separable();
        let forest = RandomForestConfig::new(10)
            .unwrap()
            .with_seed(42)
            .fit(&ds)
            .unwrap();

        let samples: Vec<Vec<f64>> = (0..ds.n_samples()).map(|i| ds.sample(i).to_vec()).collect();
        let predictions = forest.predict_batch(&samples).unwrap();
        let correct = predictions
            .iter()
            .zip(ds.labels())
            .filter(|&(&p, l)| p == l)
            .count();
        let accuracy = correct as f64 / ds.n_samples() as f64;

        assert!((forest.score(&ds).unwrap() - accuracy).abs() < 1e-12);
    }

    #[test]
    fn invalid_tree_count_error() {
        assert!(matches!(
            RandomForestConfig::new(0).unwrap_err(),
            RfError::InvalidTreeCount { n_trees: 0 }
        ));
    }

    #[test]
    fn empty_view_error() {
        let ds = separable();
        let empty = ds.subset(&[]);
        let err = RandomForestConfig::new(3).unwrap().fit(&empty).unwrap_err();
        assert!(matches!(err, RfError::EmptyDataset));
    }

    #[test]
    fn invalid_max_features_error() {
        let err = RandomForestConfig::new(3)
            .unwrap()
            .with_max_features(Some(5))
            .fit(&separable())
            .unwrap_err();
        assert!(matches!(err, RfError::InvalidMaxFeatures { .. }));
    }
}
