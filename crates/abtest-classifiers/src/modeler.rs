//! End-to-end modeling workflow over one loaded dataset.
use crate::assembly::{assemble_with, AssemblyOptions};
use crate::config::{ModelSpec, SearchEntry};
use crate::dataset::Dataset;
use crate::encoding::{encode_one_hot, encode_ordinal, EncodingPlan};
use crate::error::{ModelingError, Result};
use crate::evaluation::{cross_validate, holdout, CrossValidationResult, HoldoutResult, KFold};
use crate::features::{select_columns_by, SelectMode};
use crate::matrix::FeatureMatrix;
use crate::pipeline::{FitSource, FittedPipeline, Pipeline, PipelineKind};
use crate::search::{GridSearch, SearchOutcome};
use crate::split::{train_test_split, TrainTestSplit};
use crate::target::{Labels, TargetVector};

/// Owns a read-only dataset and the name of its target column.
///
/// Every method derives fresh artifacts from the dataset; nothing is cached
/// between calls except the dataset's own feature partition.
#[derive(Debug, Clone)]
pub struct Modeler {
    dataset: Dataset,
    target: String,
    options: AssemblyOptions,
}

impl Modeler {
    /// Fails with `MissingTarget` when `target` is not a column of `dataset`.
    pub fn new(dataset: Dataset, target: impl Into<String>) -> Result<Self> {
        let target = target.into();
        if !dataset.contains(&target) {
            return Err(ModelingError::MissingTarget(target));
        }
        Ok(Modeler {
            dataset,
            target,
            options: AssemblyOptions::default(),
        })
    }

    pub fn with_options(mut self, options: AssemblyOptions) -> Self {
        self.options = options;
        self
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Columns of the whole dataset, target included, that match
    /// `discriminator` (numeric kind) or do not match it (categorical kind).
    pub fn store_features(&self, kind: PipelineKind, discriminator: &str) -> Result<Vec<String>> {
        let mode = match kind {
            PipelineKind::Numeric => SelectMode::Include,
            PipelineKind::Categorical => SelectMode::Exclude,
        };
        select_columns_by(&self.dataset, discriminator, mode)
    }

    /// One-hot and ordinal buckets for the categorical feature columns.
    pub fn encoding_data(&self) -> Result<EncodingPlan> {
        let features = self.dataset.partition().without(&self.target);
        EncodingPlan::classify(&self.dataset, features.categorical())
    }

    pub fn hot_encode(&self) -> Result<FeatureMatrix> {
        encode_one_hot(&self.dataset, &self.encoding_data()?.one_hot)
    }

    pub fn label_encode(&self) -> Result<FeatureMatrix> {
        encode_ordinal(&self.dataset, &self.encoding_data()?.ordinal)
    }

    pub fn assemble(&self) -> Result<(FeatureMatrix, TargetVector)> {
        assemble_with(&self.dataset, &self.target, &self.options)
    }

    /// Assembled matrix with the target already turned into class labels.
    pub fn labelled(&self) -> Result<(FeatureMatrix, Labels)> {
        let (x, y) = self.assemble()?;
        Ok((x, y.labels()?))
    }

    pub fn split(&self, test_fraction: f64, seed: Option<u64>) -> Result<TrainTestSplit> {
        let (x, y) = self.labelled()?;
        train_test_split(&x, &y, test_fraction, seed)
    }

    /// Fit on a train split and report the confusion matrix and accuracy on
    /// the held-out rows.
    pub fn fit_holdout(&self, spec: &ModelSpec, test_fraction: f64, seed: Option<u64>) -> Result<HoldoutResult> {
        holdout(&spec.seeded(seed), &self.split(test_fraction, seed)?)
    }

    /// K-fold cross-validation over every row.
    pub fn evaluate(&self, spec: &ModelSpec, kfold: &KFold) -> Result<CrossValidationResult> {
        let (x, y) = self.labelled()?;
        cross_validate(spec, &x, &y, kfold)
    }

    /// Grid search each entry on the training part of a seeded split. The
    /// split seed also seeds models that take one and were given none.
    pub fn hyperparameters(
        &self,
        entries: &[SearchEntry],
        search: &GridSearch,
        test_fraction: f64,
        seed: Option<u64>,
    ) -> Result<SearchOutcome> {
        let split = self.split(test_fraction, seed)?;
        let entries: Vec<SearchEntry> = entries
            .iter()
            .map(|entry| SearchEntry {
                model: entry.model.seeded(seed),
                ..entry.clone()
            })
            .collect();
        search.run(&entries, &split.x_train, &split.y_train)
    }

    /// Fit a pipeline of `kind` on that kind's feature columns and apply it to
    /// the rows it was fit on.
    pub fn generate_transformation(
        &self,
        kind: PipelineKind,
        source: FitSource,
    ) -> Result<(FittedPipeline, FeatureMatrix)> {
        let features = self.dataset.partition().without(&self.target);
        let columns = match kind {
            PipelineKind::Numeric => features.numeric(),
            PipelineKind::Categorical => features.categorical(),
        };
        Pipeline::build(kind).fit_transform(&self.dataset, columns, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelFamily;
    use crate::dataset::Column;

    fn modeler() -> Modeler {
        let n = 24;
        let dataset = Dataset::new(vec![
            Column::text(
                "experiment",
                (0..n).map(|i| if i % 2 == 0 { "control" } else { "exposed" }).collect(),
            ),
            Column::integer("hour", (0..n).map(|i| (i % 24) as i64).collect()),
            Column::text(
                "platform",
                (0..n).map(|i| ["ios", "android", "web"][i % 3]).collect(),
            ),
            Column::integer("yes", (0..n).map(|i| (i % 2) as i64).collect()),
        ])
        .unwrap();
        Modeler::new(dataset, "yes").unwrap()
    }

    #[test]
    fn missing_target_is_rejected_up_front() {
        let dataset = Dataset::new(vec![Column::integer("a", vec![1])]).unwrap();
        assert!(matches!(Modeler::new(dataset, "yes"), Err(ModelingError::MissingTarget(_))));
    }

    #[test]
    fn store_features_covers_all_columns() {
        let m = modeler();
        let numeric = m.store_features(PipelineKind::Numeric, "number").unwrap();
        let categorical = m.store_features(PipelineKind::Categorical, "number").unwrap();
        assert_eq!(numeric, vec!["hour", "yes"]);
        assert_eq!(categorical, vec!["experiment", "platform"]);
    }

    #[test]
    fn encoders_follow_the_plan() {
        let m = modeler();
        let plan = m.encoding_data().unwrap();
        assert_eq!(plan.one_hot, vec!["platform"]);
        assert_eq!(plan.ordinal, vec!["experiment"]);
        assert_eq!(m.hot_encode().unwrap().n_cols(), 3);
        assert_eq!(m.label_encode().unwrap().names(), &["experiment"]);
    }

    #[test]
    fn evaluate_and_holdout_run_end_to_end() {
        let m = modeler();
        let spec = ModelSpec::new(ModelFamily::DecisionTree);
        let cv = m.evaluate(&spec, &KFold::default()).unwrap();
        assert_eq!(cv.mean, 1.0);
        let holdout = m.fit_holdout(&spec, 0.33, Some(1)).unwrap();
        assert_eq!(holdout.accuracy, 1.0);
        assert_eq!(holdout.confusion_matrix.sum(), 8);
    }

    #[test]
    fn seeded_search_is_repeatable_for_forests() {
        let m = modeler();
        let entries = vec![SearchEntry::new(
            "rf",
            ModelSpec::new(ModelFamily::RandomForest).with_param("n_estimators", 5i64),
            crate::config::ParamGrid::new(),
        )];
        let search = GridSearch::new(KFold::ordered(3));
        let first = m.hyperparameters(&entries, &search, 0.25, Some(3)).unwrap();
        let second = m.hyperparameters(&entries, &search, 0.25, Some(3)).unwrap();
        assert_eq!(first.results, second.results);
        assert_eq!(
            first.results[0].best_params["seed"],
            crate::config::ParamValue::Int(3)
        );
    }

    #[test]
    fn transformation_fits_on_training_fraction() {
        let m = modeler();
        let (fitted, out) = m
            .generate_transformation(
                PipelineKind::Categorical,
                FitSource::TrainFraction {
                    test_fraction: 0.25,
                    seed: Some(2),
                },
            )
            .unwrap();
        assert_eq!(fitted.columns(), &["experiment", "platform"]);
        assert_eq!(out.n_rows(), 18);
        assert_eq!(out.n_cols(), 5);
    }
}
