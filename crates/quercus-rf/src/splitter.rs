//! Deterministic shuffled train/test and k-fold dataset partitioning.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::RfError;

/// Split a dataset into shuffled train and test views.
///
/// Indices `0..N` are shuffled with a ChaCha8 generator seeded by `seed`;
/// the first `N - floor(N * test_fraction)` become the training set, the
/// remainder the test set.
///
/// # Errors
///
/// Returns [`RfError::InvalidTestFraction`] unless `test_fraction` is in (0, 1).
pub fn train_test_split(
    dataset: &Dataset,
    test_fraction: f64,
    seed: u64,
) -> Result<(Dataset, Dataset), RfError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(RfError::InvalidTestFraction {
            fraction: test_fraction,
        });
    }

    let n_samples = dataset.n_samples();
    let n_test = (n_samples as f64 * test_fraction) as usize;
    let n_train = n_samples - n_test;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n_samples).collect();
    indices.shuffle(&mut rng);

    debug!(n_train, n_test, "train/test split");

    Ok((
        dataset.subset(&indices[..n_train]),
        dataset.subset(&indices[n_train..]),
    ))
}

/// Partition a dataset into K shuffled (train, validation) pairs.
///
/// Indices are shuffled once, then sliced into K contiguous blocks; the
/// first `N mod K` blocks hold one extra sample. Pair `j` uses block `j`
/// for validation and the concatenation of the other blocks (in block
/// order) for training.
///
/// # Errors
///
/// | Variant | When |
/// |---|---|
/// | [`RfError::InvalidFoldCount`] | `n_folds` < 2 |
/// | [`RfError::FoldCountExceedsSamples`] | `n_folds` > sample count |
pub fn k_fold_split(
    dataset: &Dataset,
    n_folds: usize,
    seed: u64,
) -> Result<Vec<(Dataset, Dataset)>, RfError> {
    if n_folds < 2 {
        return Err(RfError::InvalidFoldCount { n_folds });
    }
    let n_samples = dataset.n_samples();
    if n_folds > n_samples {
        return Err(RfError::FoldCountExceedsSamples {
            n_folds,
            n_samples,
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n_samples).collect();
    indices.shuffle(&mut rng);

    let base = n_samples / n_folds;
    let remainder = n_samples % n_folds;

    let mut blocks: Vec<&[usize]> = Vec::with_capacity(n_folds);
    let mut start = 0;
    for fold in 0..n_folds {
        let size = base + usize::from(fold < remainder);
        blocks.push(&indices[start..start + size]);
        start += size;
    }

    let splits = (0..n_folds)
        .map(|fold| {
            let train: Vec<usize> = blocks
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != fold)
                .flat_map(|(_, block)| block.iter().copied())
                .collect();
            (dataset.subset(&train), dataset.subset(blocks[fold]))
        })
        .collect();

    debug!(n_folds, n_samples, "k-fold split");

    Ok(splits)
}
