/// Errors from Random Forest operations.
#[derive(Debug, thiserror::Error)]
pub enum RfError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when max_features is 0 or exceeds n_features.
    #[error("max_features is {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The max_features value provided.
        max_features: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when test_fraction is not in (0.0, 1.0).
    #[error("test_fraction must be in (0.0, 1.0), got {fraction}")]
    InvalidTestFraction {
        /// The invalid test_fraction value provided.
        fraction: f64,
    },

    /// Returned when n_folds is less than 2.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid n_folds value provided.
        n_folds: usize,
    },

    /// Returned when n_folds exceeds the sample count.
    #[error("cannot split {n_samples} samples into {n_folds} folds")]
    FoldCountExceedsSamples {
        /// The requested number of folds.
        n_folds: usize,
        /// The number of samples available for folding.
        n_samples: usize,
    },

    /// Returned when a parameter grid axis has no candidate values.
    #[error("parameter grid axis \"{axis}\" has no candidate values")]
    EmptyGrid {
        /// The name of the empty axis.
        axis: &'static str,
    },

    /// Returned when the dataset has zero samples.
    #[error("dataset has zero samples")]
    EmptyDataset,

    /// Returned when the dataset has zero feature columns.
    #[error("dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a feature value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a label is not 0 or 1.
    #[error("label at sample {sample_index} is {label}, expected 0 or 1")]
    InvalidLabel {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The offending label value.
        label: usize,
    },

    /// Returned when a categorical column index is out of range.
    #[error("categorical column index {index} is out of range for {n_features} features")]
    CategoricalIndexOutOfRange {
        /// The offending column index.
        index: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when feature names do not match the feature count.
    #[error("{got} feature names provided, expected {expected}")]
    FeatureNameCountMismatch {
        /// The expected number of names (one per feature column).
        expected: usize,
        /// The actual number of names provided.
        got: usize,
    },

    /// Returned when the label vector length differs from the sample count.
    #[error("{got} labels provided, expected {expected}")]
    LabelCountMismatch {
        /// The expected number of labels (one per sample).
        expected: usize,
        /// The actual number of labels provided.
        got: usize,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when prediction and ground-truth vectors differ in length.
    #[error("{predictions} predictions against {actuals} ground-truth labels")]
    LengthMismatch {
        /// The number of predictions.
        predictions: usize,
        /// The number of ground-truth labels.
        actuals: usize,
    },

    /// Returned when a metric name cannot be parsed.
    #[error("unknown metric \"{name}\", expected accuracy, precision, recall, or f1")]
    UnknownMetric {
        /// The unrecognised metric name.
        name: String,
    },
}
