//! CSV tabular reader with full input validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::TabularData;

/// Reads a feature table with a binary target from a CSV file.
///
/// Expected CSV format:
/// - Header row required; the last column is the target, the columns before
///   it are features
/// - `feature1,feature2,...,featureN,target`
/// - Every cell parses as a real number; the target truncates to 0 or 1
/// - Empty lines are skipped
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NoFeatureColumns`] | Header has only the target column |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable |
/// | [`IoError::InvalidLabel`] | Target value truncates outside {0, 1} |
pub struct TabularReader {
    path: PathBuf,
}

impl TabularReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`TabularData`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<TabularData, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) allows rows with varying column counts so that our
        // own InconsistentRowLength check fires instead of a low-level
        // CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        })?;
        let expected_cols = header.len();
        debug!(expected_cols, "read CSV header");

        // The last column is the target; everything before it is a feature.
        if expected_cols < 2 {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }
        let n_features = expected_cols - 1;
        let feature_names: Vec<String> =
            header.iter().take(n_features).map(String::from).collect();

        let mut features = Vec::new();
        let mut labels = Vec::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;

            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let mut row = Vec::with_capacity(n_features);
            for col_index in 0..n_features {
                let raw = record.get(col_index).unwrap_or("");
                row.push(self.parse_cell(raw, row_index, col_index)?);
            }
            features.push(row);

            let raw_target = record.get(n_features).unwrap_or("");
            let target = self.parse_cell(raw_target, row_index, n_features)?;
            let label = target as i64;
            if label != 0 && label != 1 {
                return Err(IoError::InvalidLabel {
                    path: self.path.clone(),
                    row_index,
                    raw: raw_target.to_string(),
                });
            }
            labels.push(label as usize);
        }

        if features.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(
            n_samples = features.len(),
            n_features,
            "tabular dataset loaded"
        );

        Ok(TabularData::new(feature_names, features, labels))
    }

    fn parse_cell(&self, raw: &str, row_index: usize, col_index: usize) -> Result<f64, IoError> {
        let non_finite = || IoError::NonFiniteValue {
            path: self.path.clone(),
            row_index,
            col_index,
            raw: raw.to_string(),
        };
        let value: f64 = raw.trim().parse().map_err(|_| non_finite())?;
        if !value.is_finite() {
            return Err(non_finite());
        }
        Ok(value)
    }
}
