//! Randomised train/test partitioning.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{ModelingError, Result};
use crate::matrix::FeatureMatrix;
use crate::target::Labels;

/// Row-aligned train and test partitions of a feature matrix and its labels.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub x_train: FeatureMatrix,
    pub x_test: FeatureMatrix,
    pub y_train: Labels,
    pub y_test: Labels,
}

/// A random number generator seeded from `seed`, or from entropy when absent.
pub(crate) fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Shuffle `0..n_rows` and cut it into (train, test) index lists.
///
/// The test side holds `ceil(test_fraction * n_rows)` rows and both sides
/// must end up non-empty.
pub fn shuffled_partition(
    n_rows: usize,
    test_fraction: f64,
    seed: Option<u64>,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ModelingError::InvalidTestFraction(test_fraction));
    }
    let n_test = (test_fraction * n_rows as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_rows {
        return Err(ModelingError::ShapeMismatch(format!(
            "test fraction {} of {} rows leaves an empty partition",
            test_fraction, n_rows
        )));
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    indices.shuffle(&mut rng_from(seed));
    let train = indices.split_off(n_test);
    Ok((train, indices))
}

/// Split `x` and `y` into train and test parts, keeping rows aligned.
///
/// # Arguments
///
/// * `test_fraction` - Share of rows held out, strictly between 0 and 1
/// * `seed` - Fixes the partition; `None` draws a fresh one on every call
pub fn train_test_split(
    x: &FeatureMatrix,
    y: &Labels,
    test_fraction: f64,
    seed: Option<u64>,
) -> Result<TrainTestSplit> {
    if x.n_rows() != y.len() {
        return Err(ModelingError::ShapeMismatch(format!(
            "feature matrix has {} rows but target has {}",
            x.n_rows(),
            y.len()
        )));
    }
    let (train, test) = shuffled_partition(x.n_rows(), test_fraction, seed)?;
    log::debug!(
        "Split {} rows into {} training and {} test rows",
        x.n_rows(),
        train.len(),
        test.len()
    );
    Ok(TrainTestSplit {
        x_train: x.take_rows(&train),
        x_test: x.take_rows(&test),
        y_train: y.take(&train),
        y_test: y.take(&test),
    })
}
