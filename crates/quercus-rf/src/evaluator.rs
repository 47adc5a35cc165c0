//! Per-tree split scoring: Laplace-smoothed entropy and information gain ratio.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::dataset::Dataset;
use crate::node::SplitRule;

/// Additive smoothing applied to every class-probability estimate.
const LAPLACE_ALPHA: f64 = 1.0;

fn log2(x: f64) -> f64 {
    if x <= 0.0 { 0.0 } else { x.log2() }
}

/// Incrementally maintained binary class histogram.
///
/// A class enters the smoothing domain when first added and stays there
/// even after its count is decremented back to zero: the shrinking side of
/// a sweep keeps smoothing over every class the parent had, while the
/// growing side smooths only over classes actually moved in.
#[derive(Debug, Clone, Copy, Default)]
struct LabelCounts {
    counts: [usize; 2],
    tracked: [bool; 2],
    total: usize,
}

impl LabelCounts {
    fn add(&mut self, label: usize, count: usize) {
        self.counts[label] += count;
        self.tracked[label] = true;
        self.total += count;
    }

    fn remove(&mut self, label: usize, count: usize) {
        self.counts[label] -= count;
        self.total -= count;
    }

    /// Laplace-smoothed Shannon entropy (base 2) over the tracked classes.
    fn entropy(&self) -> f64 {
        let k = self.tracked.iter().filter(|&&t| t).count() as f64;
        let smoothed_total = self.total as f64 + LAPLACE_ALPHA * k;
        let mut entropy = 0.0;
        for class in 0..2 {
            if self.tracked[class] {
                let p = (self.counts[class] as f64 + LAPLACE_ALPHA) / smoothed_total;
                entropy -= p * log2(p);
            }
        }
        entropy
    }
}

/// Gain ratio of a left/right partition against the parent entropy.
///
/// Returns 0.0 when the split information is zero (one side empty).
fn gain_ratio_of(parent_entropy: f64, left: &LabelCounts, right: &LabelCounts) -> f64 {
    let total = (left.total + right.total) as f64;
    let left_weight = left.total as f64 / total;
    let right_weight = right.total as f64 / total;

    let weighted_entropy = left_weight * left.entropy() + right_weight * right.entropy();
    let info_gain = parent_entropy - weighted_entropy;

    let mut split_info = 0.0;
    if left_weight > 0.0 {
        split_info -= left_weight * log2(left_weight);
    }
    if right_weight > 0.0 {
        split_info -= right_weight * log2(right_weight);
    }

    if split_info == 0.0 {
        0.0
    } else {
        info_gain / split_info
    }
}

/// Split scoring scratchpad for one tree build.
///
/// Scores candidate attributes over a working row list and memoises the
/// winning split descriptor per attribute so the caller can commit to the
/// best-scoring attribute afterwards. One evaluator belongs to exactly one
/// tree build and is never shared between threads.
pub(crate) struct SplitEvaluator<'a> {
    dataset: &'a Dataset,
    /// Best numeric threshold found so far, per attribute.
    best_thresholds: HashMap<usize, f64>,
    /// Best left-side category set found so far, per attribute.
    categorical_splits: HashMap<usize, BTreeSet<i64>>,
}

impl<'a> SplitEvaluator<'a> {
    pub(crate) fn new(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            best_thresholds: HashMap::new(),
            categorical_splits: HashMap::new(),
        }
    }

    /// Laplace-smoothed entropy of the label distribution over `rows`.
    ///
    /// Returns 0.0 for empty `rows`.
    pub(crate) fn entropy(&self, rows: &[usize]) -> f64 {
        let mut counts = LabelCounts::default();
        for &row in rows {
            counts.add(self.dataset.label(row), 1);
        }
        counts.entropy()
    }

    /// Majority class over `rows`; ties and empty input resolve to class 0.
    pub(crate) fn most_common(&self, rows: &[usize]) -> usize {
        let mut counts = [0usize; 2];
        for &row in rows {
            counts[self.dataset.label(row)] += 1;
        }
        usize::from(counts[1] > counts[0])
    }

    pub(crate) fn is_categorical(&self, attribute: usize) -> bool {
        self.dataset.is_categorical(attribute)
    }

    /// Information gain ratio of the best binary split on `attribute`.
    ///
    /// Memoises the winning descriptor (threshold or category set) only
    /// when a strictly positive gain ratio is found; returns 0.0 otherwise.
    pub(crate) fn gain_ratio(
        &mut self,
        attribute: usize,
        rows: &[usize],
        parent_entropy: f64,
    ) -> f64 {
        if rows.len() <= 1 {
            return 0.0;
        }
        if self.is_categorical(attribute) {
            self.categorical_gain_ratio(attribute, rows, parent_entropy)
        } else {
            self.numeric_gain_ratio(attribute, rows, parent_entropy)
        }
    }

    /// Linear sweep over sorted values, moving one sample at a time from the
    /// right histogram to the left and scoring each boundary where the
    /// attribute value changes. The candidate threshold is the midpoint of
    /// the adjacent values.
    fn numeric_gain_ratio(
        &mut self,
        attribute: usize,
        rows: &[usize],
        parent_entropy: f64,
    ) -> f64 {
        let n_samples = rows.len();

        let mut sorted: Vec<usize> = rows.to_vec();
        sorted.sort_unstable_by(|&a, &b| {
            self.dataset.sample(a)[attribute].total_cmp(&self.dataset.sample(b)[attribute])
        });

        let mut left = LabelCounts::default();
        let mut right = LabelCounts::default();
        for &row in rows {
            right.add(self.dataset.label(row), 1);
        }

        let mut best_gain_ratio = 0.0;
        let mut best_threshold = None;

        for i in 0..n_samples - 1 {
            let row = sorted[i];
            let label = self.dataset.label(row);
            right.remove(label, 1);
            left.add(label, 1);

            let current = self.dataset.sample(row)[attribute];
            let next = self.dataset.sample(sorted[i + 1])[attribute];
            if current == next {
                continue;
            }

            let gain_ratio = gain_ratio_of(parent_entropy, &left, &right);
            if gain_ratio > best_gain_ratio {
                best_gain_ratio = gain_ratio;
                best_threshold = Some((current + next) / 2.0);
            }
        }

        match best_threshold {
            Some(threshold) => {
                self.best_thresholds.insert(attribute, threshold);
                best_gain_ratio
            }
            None => 0.0,
        }
    }

    /// Purity-ordered sequential merge over the distinct categories in `rows`.
    ///
    /// Categories are ranked by majority-class purity ascending (ties by
    /// ascending id), then absorbed one at a time into the left side; each
    /// non-trivial prefix is scored as a candidate left-category set.
    fn categorical_gain_ratio(
        &mut self,
        attribute: usize,
        rows: &[usize],
        parent_entropy: f64,
    ) -> f64 {
        // Per-category class histograms, keyed by truncated category id.
        let mut category_counts: BTreeMap<i64, [usize; 2]> = BTreeMap::new();
        for &row in rows {
            let category = self.dataset.sample(row)[attribute] as i64;
            category_counts.entry(category).or_default()[self.dataset.label(row)] += 1;
        }

        if category_counts.len() <= 1 {
            return 0.0;
        }

        let purity = |counts: &[usize; 2]| -> f64 {
            let total = counts[0] + counts[1];
            counts[0].max(counts[1]) as f64 / total as f64
        };

        // BTreeMap iteration is ascending by id, so the stable sort keeps
        // id order among equal purities.
        let mut ranked: Vec<i64> = category_counts.keys().copied().collect();
        ranked.sort_by(|a, b| purity(&category_counts[a]).total_cmp(&purity(&category_counts[b])));

        let mut left = LabelCounts::default();
        let mut right = LabelCounts::default();
        for &row in rows {
            right.add(self.dataset.label(row), 1);
        }

        let mut left_categories = BTreeSet::new();
        let mut best_gain_ratio = 0.0;
        let mut best_left = None;

        for &category in &ranked[..ranked.len() - 1] {
            left_categories.insert(category);
            let counts = category_counts[&category];
            for class in 0..2 {
                if counts[class] > 0 {
                    right.remove(class, counts[class]);
                    left.add(class, counts[class]);
                }
            }

            let gain_ratio = gain_ratio_of(parent_entropy, &left, &right);
            if gain_ratio > best_gain_ratio {
                best_gain_ratio = gain_ratio;
                best_left = Some(left_categories.clone());
            }
        }

        match best_left {
            Some(categories) => {
                self.categorical_splits.insert(attribute, categories);
                best_gain_ratio
            }
            None => 0.0,
        }
    }

    /// Return the memoised split descriptor for `attribute`, if any.
    pub(crate) fn split_rule(&self, attribute: usize) -> Option<SplitRule> {
        if self.is_categorical(attribute) {
            self.categorical_splits
                .get(&attribute)
                .map(|left| SplitRule::Categories(left.clone()))
        } else {
            self.best_thresholds
                .get(&attribute)
                .copied()
                .map(SplitRule::Threshold)
        }
    }

    /// Partition `rows` by the memoised descriptor for `attribute`.
    ///
    /// With no memoised descriptor every row goes right.
    pub(crate) fn split(&self, attribute: usize, rows: &[usize]) -> (Vec<usize>, Vec<usize>) {
        let mut left_rows = Vec::new();
        let mut right_rows = Vec::new();
        match self.split_rule(attribute) {
            Some(rule) => {
                for &row in rows {
                    if rule.goes_left(self.dataset.sample(row)[attribute]) {
                        left_rows.push(row);
                    } else {
                        right_rows.push(row);
                    }
                }
            }
            None => right_rows.extend_from_slice(rows),
        }
        (left_rows, right_rows)
    }

    /// Return the memoised numeric threshold for `attribute`.
    pub(crate) fn threshold(&self, attribute: usize) -> Option<f64> {
        self.best_thresholds.get(&attribute).copied()
    }

    /// Return the memoised left-side category set for `attribute`.
    pub(crate) fn categorical_split(&self, attribute: usize) -> Option<&BTreeSet<i64>> {
        self.categorical_splits.get(&attribute)
    }
}
