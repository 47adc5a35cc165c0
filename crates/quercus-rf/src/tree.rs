use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::dataset::Dataset;
use crate::error::RfError;
use crate::evaluator::SplitEvaluator;
use crate::node::{FeatureIndex, Node, NodeIndex};

/// Nodes at or below this entropy are considered pure enough to stop.
const MIN_SPLIT_ENTROPY: f64 = 0.01;

/// Configuration for a single gain-ratio decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
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
pub struct DecisionTreeConfig {
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        }
    }

    /// Set the maximum tree depth.
    ///
    /// `None` means grow until the stopping conditions apply on their own.
    /// `Some(d)` limits every root-to-leaf path to `d` edges.
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

    /// Train a decision tree on the dataset.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | the dataset view has zero samples |
    /// | [`RfError::InvalidMaxDepth`] | `max_depth` is `Some(0)` |
    /// | [`RfError::InvalidMinSamplesSplit`] | `min_samples_split` < 2 |
    /// | [`RfError::InvalidMaxFeatures`] | `max_features` resolves outside [1, n_features] |
    #[instrument(skip(self, dataset), fields(n_samples = dataset.n_samples()))]
    pub fn fit(&self, dataset: &Dataset) -> Result<DecisionTree, RfError> {
        if dataset.n_samples() == 0 {
            return Err(RfError::EmptyDataset);
        }

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

        let n_features = dataset.n_features();
        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }

        let mut evaluator = SplitEvaluator::new(dataset);
        let rows: Vec<usize> = (0..dataset.n_samples()).collect();
        let attributes: Vec<usize> = (0..n_features).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut arena: Vec<Node> = Vec::new();

        let root = build_tree(
            &mut evaluator,
            &rows,
            &attributes,
            0,
            self,
            max_features,
            &mut rng,
            &mut arena,
        );

        debug!(
            root_index = root.index(),
            n_nodes = arena.len(),
            "decision tree built"
        );

        Ok(DecisionTree {
            nodes: arena,
            n_features,
        })
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively build the arena-based decision tree.
///
/// Returns the [`NodeIndex`] of the node just created in `arena`. Nodes are
/// laid out in preorder; an interior node's slot is reserved with a
/// placeholder leaf before its subtrees are built.
#[allow(clippy::too_many_arguments)]
fn build_tree(
    evaluator: &mut SplitEvaluator<'_>,
    rows: &[usize],
    attributes: &[usize],
    depth: usize,
    config: &DecisionTreeConfig,
    max_features: usize,
    rng: &mut ChaCha8Rng,
    arena: &mut Vec<Node>,
) -> NodeIndex {
    let majority = evaluator.most_common(rows);
    let make_leaf = |arena: &mut Vec<Node>| -> NodeIndex {
        let idx = arena.len();
        arena.push(Node::Leaf {
            prediction: majority,
            n_samples: rows.len(),
        });
        NodeIndex::new(idx)
    };

    let entropy = evaluator.entropy(rows);

    let depth_exceeded = config.max_depth.is_some_and(|max_d| depth >= max_d);
    if attributes.is_empty()
        || entropy < MIN_SPLIT_ENTROPY
        || depth_exceeded
        || rows.len() < config.min_samples_split
    {
        return make_leaf(arena);
    }

    // Candidate selection: partial Fisher-Yates over the available
    // attributes, keeping the first max_features positions.
    let mut candidates: Vec<usize> = attributes.to_vec();
    if candidates.len() > max_features {
        for i in 0..max_features {
            let j = rng.gen_range(i..candidates.len());
            candidates.swap(i, j);
        }
        candidates.truncate(max_features);
    }

    // Score candidates; first occurrence wins ties.
    let mut best: Option<(usize, f64)> = None;
    for &attribute in &candidates {
        let igr = evaluator.gain_ratio(attribute, rows, entropy);
        if best.is_none_or(|(_, gain)| igr > gain) {
            best = Some((attribute, igr));
        }
    }

    let Some((attribute, gain)) = best else {
        return make_leaf(arena);
    };
    if gain <= 0.0 {
        return make_leaf(arena);
    }

    // A positive gain ratio guarantees a memoised descriptor.
    let Some(rule) = evaluator.split_rule(attribute) else {
        return make_leaf(arena);
    };

    let (left_rows, right_rows) = evaluator.split(attribute, rows);
    if left_rows.is_empty() || right_rows.is_empty() {
        return make_leaf(arena);
    }

    // Each attribute is used at most once along a root-to-leaf path.
    let remaining: Vec<usize> = attributes
        .iter()
        .copied()
        .filter(|&a| a != attribute)
        .collect();

    // Reserve this node's preorder slot before building the subtrees.
    let node_idx = arena.len();
    arena.push(Node::Leaf {
        prediction: majority,
        n_samples: rows.len(),
    });

    let left = build_tree(
        evaluator,
        &left_rows,
        &remaining,
        depth + 1,
        config,
        max_features,
        rng,
        arena,
    );
    let right = build_tree(
        evaluator,
        &right_rows,
        &remaining,
        depth + 1,
        config,
        max_features,
        rng,
        arena,
    );

    // Identical sibling leaves collapse into one leaf.
    if let (
        Node::Leaf {
            prediction: left_class,
            ..
        },
        Node::Leaf {
            prediction: right_class,
            ..
        },
    ) = (&arena[left.index()], &arena[right.index()])
        && left_class == right_class
    {
        let prediction = *left_class;
        arena.truncate(node_idx);
        arena.push(Node::Leaf {
            prediction,
            n_samples: rows.len(),
        });
        return NodeIndex::new(node_idx);
    }

    arena[node_idx] = Node::Split {
        feature: FeatureIndex::new(attribute),
        rule,
        left,
        right,
        n_samples: rows.len(),
    };

    NodeIndex::new(node_idx)
}

/// A fitted gain-ratio decision tree.
///
/// Stored as an arena `Vec<Node>` in preorder with index references,
/// which keeps traversal cache-friendly.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
}

impl DecisionTree {
    /// Predict the class label for a single sample.
    ///
    /// Traverses from the root (index 0), routing by each split's rule.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { prediction, .. } => return Ok(*prediction),
                Node::Split {
                    feature,
                    rule,
                    left,
                    right,
                    ..
                } => {
                    idx = if rule.goes_left(sample[feature.index()]) {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }

    /// Return the number of features this tree was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut max_depth = 0usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((0usize, 0usize));

        while let Some((node_idx, d)) = queue.pop_front() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => {
                    if d > max_depth {
                        max_depth = d;
                    }
                }
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }

        max_depth
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::node::SplitRule;

    fn dataset(features: Vec<Vec<f64>>, labels: Vec<usize>) -> Dataset {
        Dataset::new(features, labels, None, BTreeSet::new()).unwrap()
    }

    fn separable() -> Dataset {
        dataset(
            vec![
                vec![1.0, 0.0],
                vec![2.0, 0.0],
                vec![3.0, 0.0],
                vec![10.0, 0.0],
                vec![11.0, 0.0],
                vec![12.0, 0.0],
            ],
            vec![0, 0, 0, 1, 1, 1],
        )
    }

    #[test]
    fn pure_dataset_single_leaf() {
        let ds = dataset(vec![vec![1.0], vec![2.0], vec![3.0]], vec![0, 0, 0]);
        let tree = DecisionTreeConfig::new().fit(&ds).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict(&[2.5]).unwrap(), 0);
    }

    #[test]
    fn separable_data_splits_correctly() {
        let tree = DecisionTreeConfig::new().fit(&separable()).unwrap();
        assert_eq!(tree.predict(&[2.0, 0.0]).unwrap(), 0);
        assert_eq!(tree.predict(&[11.0, 0.0]).unwrap(), 1);

        // The root must split feature 0 at the class boundary midpoint.
        match &tree.nodes[0] {
            Node::Split { feature, rule, .. } => {
                assert_eq!(feature.index(), 0);
                assert_eq!(rule, &SplitRule::Threshold(6.5));
            }
            Node::Leaf { .. } => panic!("expected a split at the root"),
        }
    }

    #[test]
    fn max_depth_bounds_every_path() {
        // XOR needs depth 2; capping at 1 must be respected.
        let ds = dataset(
            vec![
                vec![0.0, 0.0],
                vec![0.0, 1.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
            ],
            vec![0, 1, 1, 0],
        );
        let tree = DecisionTreeConfig::new()
            .with_max_depth(Some(1))
            .fit(&ds)
            .unwrap();
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn min_samples_split_stops_recursion() {
        let tree = DecisionTreeConfig::new()
            .with_min_samples_split(10)
            .fit(&separable())
            .unwrap();
        assert_eq!(tree.n_nodes(), 1);
    }

    #[test]
    fn identical_sibling_leaves_collapse() {
        // Best split at 2.5 leaves majority 0 on both sides once the depth
        // cap turns the children into leaves, so the root collapses.
        let ds = dataset(
            vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]],
            vec![0, 1, 0, 0],
        );
        let tree = DecisionTreeConfig::new()
            .with_max_depth(Some(1))
            .fit(&ds)
            .unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict(&[2.0]).unwrap(), 0);
    }

    #[test]
    fn attribute_used_at_most_once_per_path() {
        // Walk every root-to-leaf path and check feature uniqueness.
        fn walk(tree: &DecisionTree, idx: usize, used: &mut Vec<usize>) {
            match &tree.nodes[idx] {
                Node::Leaf { .. } => {}
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    assert!(
                        !used.contains(&feature.index()),
                        "feature {} reused on a path",
                        feature.index()
                    );
                    used.push(feature.index());
                    walk(tree, left.index(), used);
                    walk(tree, right.index(), used);
                    used.pop();
                }
            }
        }

        // Feature 0 isolates the first two rows; feature 1 then separates
        // the rest, forcing a two-level tree.
        let ds = dataset(
            vec![
                vec![0.0, 0.0],
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![1.0, 0.0],
                vec![1.0, 5.0],
                vec![1.0, 5.0],
            ],
            vec![0, 0, 1, 1, 0, 0],
        );
        let tree = DecisionTreeConfig::new().fit(&ds).unwrap();
        assert!(tree.depth() >= 2);
        walk(&tree, 0, &mut Vec::new());
    }

    #[test]
    fn deterministic_with_same_seed() {
        let ds = dataset(
            vec![
                vec![1.0, 5.0],
                vec![2.0, 6.0],
                vec![3.0, 7.0],
                vec![10.0, 15.0],
                vec![11.0, 16.0],
                vec![12.0, 17.0],
            ],
            vec![0, 0, 0, 1, 1, 1],
        );
        let tree1 = DecisionTreeConfig::new()
            .with_max_features(Some(1))
            .with_seed(123)
            .fit(&ds)
            .unwrap();
        let tree2 = DecisionTreeConfig::new()
            .with_max_features(Some(1))
            .with_seed(123)
            .fit(&ds)
            .unwrap();
        assert_eq!(tree1, tree2);
    }

    #[test]
    fn empty_view_error() {
        let ds = separable();
        let empty = ds.subset(&[]);
        let err = DecisionTreeConfig::new().fit(&empty).unwrap_err();
        assert!(matches!(err, RfError::EmptyDataset));
    }

    #[test]
    fn invalid_max_depth_error() {
        let err = DecisionTreeConfig::new()
            .with_max_depth(Some(0))
            .fit(&separable())
            .unwrap_err();
        assert!(matches!(err, RfError::InvalidMaxDepth { max_depth: 0 }));
    }

    #[test]
    fn invalid_min_samples_split_error() {
        let err = DecisionTreeConfig::new()
            .with_min_samples_split(1)
            .fit(&separable())
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::InvalidMinSamplesSplit {
                min_samples_split: 1
            }
        ));
    }

    #[test]
    fn invalid_max_features_error() {
        let err = DecisionTreeConfig::new()
            .with_max_features(Some(3))
            .fit(&separable())
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::InvalidMaxFeatures {
                max_features: 3,
                n_features: 2
            }
        ));
    }

    #[test]
    fn prediction_feature_mismatch() {
        let tree = DecisionTreeConfig::new().fit(&separable()).unwrap();
        let err = tree.predict(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            RfError::PredictionFeatureMismatch {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn categorical_split_produces_two_pure_leaves() {
        let features = vec![
            vec![0.0],
            vec![0.0],
            vec![1.0],
            vec![1.0],
            vec![2.0],
            vec![2.0],
            vec![3.0],
            vec![3.0],
        ];
        let labels = vec![0, 0, 0, 0, 1, 1, 1, 1];
        let categorical: BTreeSet<usize> = [0].into_iter().collect();
        let ds = Dataset::new(features, labels, None, categorical).unwrap();

        let tree = DecisionTreeConfig::new()
            .with_max_depth(Some(2))
            .fit(&ds)
            .unwrap();

        assert_eq!(tree.n_nodes(), 3);
        match &tree.nodes[0] {
            Node::Split { rule, .. } => {
                let expected: BTreeSet<i64> = [0, 1].into_iter().collect();
                assert_eq!(rule, &SplitRule::Categories(expected));
            }
            Node::Leaf { .. } => panic!("expected a categorical split at the root"),
        }
        assert_eq!(tree.predict(&[0.0]).unwrap(), 0);
        assert_eq!(tree.predict(&[1.0]).unwrap(), 0);
        assert_eq!(tree.predict(&[2.0]).unwrap(), 1);
        assert_eq!(tree.predict(&[3.0]).unwrap(), 1);
    }
}
