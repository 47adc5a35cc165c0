//! Domain types for quercus-io.

use crate::IoError;

/// A validated run name for artifact file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunName(String);

impl RunName {
    /// Parse and validate a run name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidRunName`] if the name is empty or contains
    /// characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidRunName { name });
        }
        Ok(Self(name))
    }

    /// Return the run name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A loaded table of features and binary labels.
///
/// Produced by [`TabularReader`](crate::TabularReader). Feature rows and
/// labels are stored in parallel vectors — `features[i]` corresponds to
/// `labels[i]`.
#[derive(Debug)]
pub struct TabularData {
    /// Feature column names from the CSV header (target column excluded).
    feature_names: Vec<String>,
    /// Feature values: `features[sample_index][feature_index]`.
    features: Vec<Vec<f64>>,
    /// Binary target labels in row order.
    labels: Vec<usize>,
}

impl TabularData {
    /// Create a new table.
    pub(crate) fn new(
        feature_names: Vec<String>,
        features: Vec<Vec<f64>>,
        labels: Vec<usize>,
    ) -> Self {
        Self {
            feature_names,
            features,
            labels,
        }
    }

    /// Return the feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the feature matrix (row-major).
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the labels.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Return the number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.features.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Consume the table, returning `(feature_names, features, labels)`.
    #[must_use]
    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<f64>>, Vec<usize>) {
        (self.feature_names, self.features, self.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_name_valid() {
        let name = RunName::new("heart-disease_01".to_string());
        assert!(name.is_ok());
        assert_eq!(name.unwrap().as_str(), "heart-disease_01");
    }

    #[test]
    fn run_name_rejects_empty() {
        let name = RunName::new(String::new());
        assert!(matches!(name, Err(IoError::InvalidRunName { .. })));
    }

    #[test]
    fn run_name_rejects_special_chars() {
        let name = RunName::new("bad name!".to_string());
        assert!(matches!(name, Err(IoError::InvalidRunName { .. })));
    }

    #[test]
    fn tabular_data_accessors() {
        let data = TabularData::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
            vec![0, 1],
        );
        assert_eq!(data.n_samples(), 2);
        assert_eq!(data.n_features(), 2);
        assert_eq!(data.labels(), &[0, 1]);
        let (names, features, labels) = data.into_parts();
        assert_eq!(names.len(), 2);
        assert_eq!(features.len(), 2);
        assert_eq!(labels.len(), 2);
    }
}
