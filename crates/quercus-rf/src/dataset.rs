//! Immutable tabular dataset with index-based subsetting.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::RfError;

/// Shared backing storage for one loaded table.
///
/// Validated once at construction; every [`Dataset`] view over it holds an
/// `Arc`, so bootstrap samples and fold slices never copy rows.
#[derive(Debug)]
struct Storage {
    /// Feature values: `features[sample_index][feature_index]`.
    features: Vec<Vec<f64>>,
    /// Binary class labels, one per sample.
    labels: Vec<usize>,
    /// Feature column names, one per column.
    feature_names: Vec<String>,
    /// Column indices whose values are whole-number category identifiers.
    categorical: BTreeSet<usize>,
}

/// An immutable feature matrix with binary labels and a categorical-column set.
///
/// A `Dataset` is a view: it pairs shared storage with its own ordered list
/// of row indices. [`Dataset::subset`] produces a new view over the same
/// storage, so one sample may appear in many datasets (and, for bootstrap
/// samples, many times in one) without the backing rows ever being cloned
/// or mutated.
#[derive(Debug, Clone)]
pub struct Dataset {
    storage: Arc<Storage>,
    /// Logical row order: position `i` of this view is storage row `rows[i]`.
    rows: Vec<usize>,
}

impl Dataset {
    /// Build a dataset from row-major features and binary labels.
    ///
    /// `feature_names` defaults to `feat_0..feat_{F-1}` when `None`.
    /// `categorical` lists the column indices to treat as category
    /// identifiers at split time; values in those columns are truncated to
    /// whole numbers when grouped.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | `features` is empty |
    /// | [`RfError::ZeroFeatures`] | rows have zero feature columns |
    /// | [`RfError::FeatureCountMismatch`] | rows have inconsistent lengths |
    /// | [`RfError::NonFiniteValue`] | any value is NaN or infinite |
    /// | [`RfError::LabelCountMismatch`] | `labels.len() != features.len()` |
    /// | [`RfError::InvalidLabel`] | any label is outside {0, 1} |
    /// | [`RfError::FeatureNameCountMismatch`] | names provided but count differs from columns |
    /// | [`RfError::CategoricalIndexOutOfRange`] | a categorical index >= n_features |
    pub fn new(
        features: Vec<Vec<f64>>,
        labels: Vec<usize>,
        feature_names: Option<Vec<String>>,
        categorical: BTreeSet<usize>,
    ) -> Result<Self, RfError> {
        if features.is_empty() {
            return Err(RfError::EmptyDataset);
        }

        let n_samples = features.len();
        let n_features = features[0].len();

        if n_features == 0 {
            return Err(RfError::ZeroFeatures);
        }

        for (sample_index, row) in features.iter().enumerate() {
            if row.len() != n_features {
                return Err(RfError::FeatureCountMismatch {
                    expected: n_features,
                    got: row.len(),
                    sample_index,
                });
            }
            for (feature_index, &val) in row.iter().enumerate() {
                if !val.is_finite() {
                    return Err(RfError::NonFiniteValue {
                        sample_index,
                        feature_index,
                    });
                }
            }
        }

        if labels.len() != n_samples {
            return Err(RfError::LabelCountMismatch {
                expected: n_samples,
                got: labels.len(),
            });
        }
        for (sample_index, &label) in labels.iter().enumerate() {
            if label > 1 {
                return Err(RfError::InvalidLabel {
                    sample_index,
                    label,
                });
            }
        }

        let feature_names = match feature_names {
            Some(names) => {
                if names.len() != n_features {
                    return Err(RfError::FeatureNameCountMismatch {
                        expected: n_features,
                        got: names.len(),
                    });
                }
                names
            }
            None => (0..n_features).map(|i| format!("feat_{i}")).collect(),
        };

        if let Some(&index) = categorical.iter().next_back()
            && index >= n_features
        {
            return Err(RfError::CategoricalIndexOutOfRange { index, n_features });
        }

        let rows = (0..n_samples).collect();
        Ok(Self {
            storage: Arc::new(Storage {
                features,
                labels,
                feature_names,
                categorical,
            }),
            rows,
        })
    }

    /// Return the number of samples in this view.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.storage.feature_names.len()
    }

    /// Return the feature row for view position `index`.
    #[must_use]
    pub fn sample(&self, index: usize) -> &[f64] {
        &self.storage.features[self.rows[index]]
    }

    /// Return the label for view position `index`.
    #[must_use]
    pub fn label(&self, index: usize) -> usize {
        self.storage.labels[self.rows[index]]
    }

    /// Collect the labels of this view in row order.
    #[must_use]
    pub fn labels(&self) -> Vec<usize> {
        self.rows.iter().map(|&r| self.storage.labels[r]).collect()
    }

    /// Return the feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.storage.feature_names
    }

    /// Return the set of categorical column indices.
    #[must_use]
    pub fn categorical_features(&self) -> &BTreeSet<usize> {
        &self.storage.categorical
    }

    /// Return `true` if column `feature` holds category identifiers.
    #[must_use]
    pub fn is_categorical(&self, feature: usize) -> bool {
        self.storage.categorical.contains(&feature)
    }

    /// Return a new view whose row order follows `indices`.
    ///
    /// Indices address positions of *this* view (not storage rows) and may
    /// repeat — bootstrap sampling relies on that. Feature names and the
    /// categorical set carry over unchanged.
    #[must_use]
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            storage: Arc::clone(&self.storage),
            rows: indices.iter().map(|&i| self.rows[i]).collect(),
        }
    }
}
