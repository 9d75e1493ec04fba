//! Holdout and k-fold evaluation of a model specification.
use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::ModelSpec;
use crate::error::{ModelingError, Result};
use crate::matrix::FeatureMatrix;
use crate::metrics::{accuracy, confusion_matrix};
use crate::models::factory::build_model;
use crate::split::{rng_from, TrainTestSplit};
use crate::target::Labels;

/// Default number of cross-validation folds.
pub const DEFAULT_FOLDS: usize = 5;

/// K-fold splitter. Fold sizes differ by at most one row; the first
/// `n_rows % n_splits` folds get the extra row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl Default for KFold {
    fn default() -> Self {
        KFold::shuffled(DEFAULT_FOLDS, Some(1))
    }
}

/// Train and validation row indices of one fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub index: usize,
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

impl KFold {
    /// Contiguous folds in row order.
    pub fn ordered(n_splits: usize) -> Self {
        KFold {
            n_splits,
            shuffle: false,
            seed: None,
        }
    }

    /// Folds drawn from a shuffled row order.
    pub fn shuffled(n_splits: usize, seed: Option<u64>) -> Self {
        KFold {
            n_splits,
            shuffle: true,
            seed,
        }
    }

    pub fn split(&self, n_rows: usize) -> Result<Vec<Fold>> {
        if self.n_splits < 2 || self.n_splits > n_rows {
            return Err(ModelingError::InvalidFoldCount {
                folds: self.n_splits,
                rows: n_rows,
            });
        }

        let mut indices: Vec<usize> = (0..n_rows).collect();
        if self.shuffle {
            indices.shuffle(&mut rng_from(self.seed));
        }

        let base = n_rows / self.n_splits;
        let remainder = n_rows % self.n_splits;
        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for index in 0..self.n_splits {
            let size = if index < remainder { base + 1 } else { base };
            let end = start + size;
            folds.push(Fold {
                index,
                train: indices[..start].iter().chain(&indices[end..]).copied().collect(),
                validation: indices[start..end].to_vec(),
            });
            start = end;
        }
        Ok(folds)
    }
}

/// Confusion matrix and accuracy on a held-out test set.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldoutResult {
    pub confusion_matrix: Array2<usize>,
    pub accuracy: f64,
    pub classes: Vec<String>,
}

/// Per-fold scores and their summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValidationResult {
    pub fold_scores: Vec<f64>,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl CrossValidationResult {
    pub fn from_scores(fold_scores: Vec<f64>) -> Self {
        let n = fold_scores.len().max(1) as f64;
        let mean = fold_scores.iter().sum::<f64>() / n;
        let min = fold_scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max = fold_scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        CrossValidationResult {
            fold_scores,
            // summation error must not push the mean outside [min, max]
            mean: mean.clamp(min.min(max), max.max(min)),
            min,
            max,
        }
    }

    /// The `score`, `min` and `max` metrics reported to experiment tracking.
    pub fn metrics(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("score".to_string(), self.mean),
            ("min".to_string(), self.min),
            ("max".to_string(), self.max),
        ])
    }
}

/// Fit a fresh model on the training rows and score it on the validation rows.
fn fit_and_score(
    spec: &ModelSpec,
    x_train: &Array2<f64>,
    y_train: &Labels,
    x_valid: &Array2<f64>,
    y_valid: &Labels,
) -> Result<(Array1<usize>, f64)> {
    let mut model = build_model(spec)?;
    model.fit(x_train, y_train)?;
    let predicted = model.predict(x_valid)?;
    let score = accuracy(y_valid.codes(), &predicted)?;
    Ok((predicted, score))
}

fn check_rows(x: &FeatureMatrix, y: &Labels) -> Result<()> {
    if x.n_rows() != y.len() {
        return Err(ModelingError::ShapeMismatch(format!(
            "feature matrix has {} rows but target has {}",
            x.n_rows(),
            y.len()
        )));
    }
    Ok(())
}

/// Fit on the training partition, predict the test partition.
pub fn holdout(spec: &ModelSpec, split: &TrainTestSplit) -> Result<HoldoutResult> {
    check_rows(&split.x_train, &split.y_train)?;
    check_rows(&split.x_test, &split.y_test)?;
    let (predicted, score) = fit_and_score(
        spec,
        split.x_train.values(),
        &split.y_train,
        split.x_test.values(),
        &split.y_test,
    )?;
    let n_classes = split.y_train.n_classes();
    let matrix = confusion_matrix(split.y_test.codes(), &predicted, n_classes)?;
    log::info!(
        "Holdout accuracy for {} on {} test rows: {:.4}",
        spec.family,
        split.y_test.len(),
        score
    );
    Ok(HoldoutResult {
        confusion_matrix: matrix,
        accuracy: score,
        classes: split.y_train.classes().to_vec(),
    })
}

/// Accuracy of `spec` on every fold, in fold order.
///
/// Folds are fit in parallel; the first failing fold (by index) is returned
/// as a `FitFailure` carrying that fold's index.
pub fn fold_scores(spec: &ModelSpec, x: &FeatureMatrix, y: &Labels, folds: &[Fold]) -> Result<Vec<f64>> {
    check_rows(x, y)?;
    let outcomes: Vec<Result<f64>> = folds
        .par_iter()
        .map(|fold| {
            let x_train = x.take_rows(&fold.train);
            let x_valid = x.take_rows(&fold.validation);
            let (_, score) = fit_and_score(
                spec,
                x_train.values(),
                &y.take(&fold.train),
                x_valid.values(),
                &y.take(&fold.validation),
            )
            .map_err(|e| e.in_fold(fold.index))?;
            log::trace!("{} fold {} accuracy {:.4}", spec.family, fold.index, score);
            Ok(score)
        })
        .collect();
    outcomes.into_iter().collect()
}

/// K-fold cross-validation of `spec` over the full matrix.
///
/// The fold seed also seeds models that take one and were given none.
pub fn cross_validate(
    spec: &ModelSpec,
    x: &FeatureMatrix,
    y: &Labels,
    kfold: &KFold,
) -> Result<CrossValidationResult> {
    let spec = &spec.seeded(kfold.seed);
    let folds = kfold.split(x.n_rows())?;
    let scores = fold_scores(spec, x, y, &folds)?;
    for (i, score) in scores.iter().enumerate() {
        log::info!("Fold {}/{} accuracy {:.4}", i + 1, folds.len(), score);
    }
    let result = CrossValidationResult::from_scores(scores);
    log::info!(
        "Cross-validated {}: mean {:.4}, min {:.4}, max {:.4}",
        spec.family,
        result.mean,
        result.min,
        result.max
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelFamily, ParamValue};
    use crate::split::train_test_split;

    fn separable(n: usize) -> (FeatureMatrix, Labels) {
        let values = Array2::from_shape_fn((n, 2), |(i, j)| {
            let class = (i % 2) as f64;
            class * 10.0 + (i % 5) as f64 * 0.1 + j as f64
        });
        let x = FeatureMatrix::new(vec!["a".into(), "b".into()], values).unwrap();
        let codes: Array1<usize> = (0..n).map(|i| i % 2).collect();
        (x, Labels::new(vec!["no".into(), "yes".into()], codes).unwrap())
    }

    #[test]
    fn folds_partition_every_row_once() {
        let folds = KFold::shuffled(3, Some(1)).split(10).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|f| f.validation.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.validation.clone()).collect();
        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        for fold in &folds {
            assert_eq!(fold.train.len() + fold.validation.len(), 10);
            assert!(fold.train.iter().all(|r| !fold.validation.contains(r)));
        }
    }

    #[test]
    fn ordered_folds_are_contiguous() {
        let folds = KFold::ordered(2).split(4).unwrap();
        assert_eq!(folds[0].validation, vec![0, 1]);
        assert_eq!(folds[1].train, vec![0, 1]);
    }

    #[test]
    fn fold_count_bounds() {
        assert!(matches!(
            KFold::ordered(1).split(10),
            Err(ModelingError::InvalidFoldCount { folds: 1, rows: 10 })
        ));
        assert!(matches!(
            KFold::ordered(11).split(10),
            Err(ModelingError::InvalidFoldCount { folds: 11, rows: 10 })
        ));
        assert!(KFold::ordered(10).split(10).is_ok());
    }

    #[test]
    fn cross_validation_summary_is_ordered() {
        let (x, y) = separable(30);
        let spec = ModelSpec::new(ModelFamily::DecisionTree);
        let result = cross_validate(&spec, &x, &y, &KFold::default()).unwrap();
        assert_eq!(result.fold_scores.len(), 5);
        assert!(result.min <= result.mean && result.mean <= result.max);
        assert_eq!(result.metrics().keys().collect::<Vec<_>>(), vec!["max", "min", "score"]);
    }

    #[test]
    fn fit_failure_names_the_fold() {
        let (x, y) = separable(10);
        let spec = ModelSpec::new(ModelFamily::Knn).with_param("n_neighbors", ParamValue::Int(9));
        let err = cross_validate(&spec, &x, &y, &KFold::ordered(5)).unwrap_err();
        assert!(matches!(err, ModelingError::FitFailure { fold: Some(0), .. }));
    }

    #[test]
    fn holdout_reports_confusion_matrix() {
        let (x, y) = separable(30);
        let split = train_test_split(&x, &y, 0.33, Some(1)).unwrap();
        let result = holdout(&ModelSpec::new(ModelFamily::GaussianNb), &split).unwrap();
        assert_eq!(result.confusion_matrix.dim(), (2, 2));
        assert_eq!(result.confusion_matrix.sum(), split.y_test.len());
        assert_eq!(result.accuracy, 1.0);
        assert_eq!(result.classes, vec!["no", "yes"]);
    }

    #[test]
    fn seeded_folds_make_forest_scores_repeatable() {
        // labels only loosely follow the features, so tree draws matter
        let n = 200;
        let values = Array2::from_shape_fn((n, 3), |(i, j)| ((i * 37 + j * 11) % 101) as f64);
        let x = FeatureMatrix::new(vec!["a".into(), "b".into(), "c".into()], values).unwrap();
        let codes: Array1<usize> = (0..n).map(|i| usize::from((i * 7) % 3 == 0)).collect();
        let y = Labels::new(vec!["no".into(), "yes".into()], codes).unwrap();

        let spec = ModelSpec::new(ModelFamily::RandomForest).with_param("n_estimators", 10i64);
        let kfold = KFold::shuffled(5, Some(1));
        let first = cross_validate(&spec, &x, &y, &kfold).unwrap();
        let second = cross_validate(&spec, &x, &y, &kfold).unwrap();
        assert_eq!(first.fold_scores, second.fold_scores);
    }

    #[test]
    fn summary_of_constant_scores() {
        let result = CrossValidationResult::from_scores(vec![0.1; 7]);
        assert!(result.min <= result.mean && result.mean <= result.max);
    }
}
