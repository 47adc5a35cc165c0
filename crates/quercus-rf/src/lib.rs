//! Random Forest classification for binary targets on tabular data mixing
//! numeric and categorical attributes.
//!
//! Provides gain-ratio decision trees with Laplace-smoothed entropy scoring,
//! numeric thresholding and purity-ordered categorical grouping, bootstrap
//! aggregation with parallel tree training via rayon, binary classification
//! metrics, deterministic train/test and k-fold splitting, and grid-search
//! hyperparameter tuning. All randomness flows from explicit seeds, so
//! results are reproducible across runs and worker counts.

mod dataset;
mod dot;
mod error;
mod evaluator;
mod forest;
mod metrics;
mod node;
mod splitter;
mod tree;
mod tuner;

pub use dataset::Dataset;
pub use error::RfError;
pub use forest::{RandomForest, RandomForestConfig};
pub use metrics::{ConfusionMatrix, Metric};
pub use node::{FeatureIndex, Node, NodeIndex, SplitRule};
pub use splitter::{k_fold_split, train_test_split};
pub use tree::{DecisionTree, DecisionTreeConfig};
pub use tuner::{HyperparameterTuner, ParameterGrid, TuningResult};
