//! Assembly of the model-ready feature matrix and target vector.
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::encoding::{encode_one_hot, encode_ordinal, EncodingPlan};
use crate::error::{ModelingError, Result};
use crate::matrix::FeatureMatrix;
use crate::pipeline::{Pipeline, PipelineKind};
use crate::target::TargetVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyOptions {
    /// Pass numeric columns through the numeric pipeline (mean impute and
    /// min-max scale) instead of copying them as they are.
    pub scale_numeric: bool,
}

/// Build `(X, y)` from a dataset with default options.
pub fn assemble(dataset: &Dataset, target: &str) -> Result<(FeatureMatrix, TargetVector)> {
    assemble_with(dataset, target, &AssemblyOptions::default())
}

/// Build `(X, y)` from a dataset.
///
/// Categorical features are routed by cardinality to one-hot or ordinal
/// encoding. `X` holds the numeric columns, then the one-hot indicators, then
/// the ordinal codes, with rows in dataset order. `y` is the target column.
pub fn assemble_with(
    dataset: &Dataset,
    target: &str,
    options: &AssemblyOptions,
) -> Result<(FeatureMatrix, TargetVector)> {
    let target_column = dataset
        .column(target)
        .ok_or_else(|| ModelingError::MissingTarget(target.to_string()))?;

    let features = dataset.partition().without(target);
    let plan = EncodingPlan::classify(dataset, features.categorical())?;

    // the base keeps every non-categorical feature column
    let base_columns = features.numeric();
    let base = if options.scale_numeric && !base_columns.is_empty() {
        Pipeline::build(PipelineKind::Numeric)
            .fit(dataset, base_columns)?
            .transform(dataset)?
    } else {
        FeatureMatrix::from_numeric_columns(dataset, base_columns)?
    };
    let one_hot = encode_one_hot(dataset, &plan.one_hot)?;
    let ordinal = encode_ordinal(dataset, &plan.ordinal)?;

    let blocks = [base, one_hot, ordinal];
    let x = FeatureMatrix::hconcat(&blocks)?;
    log::debug!(
        "Assembled {} x {} feature matrix ({} numeric, {} one-hot from {} columns, {} ordinal)",
        x.n_rows(),
        x.n_cols(),
        blocks[0].n_cols(),
        blocks[1].n_cols(),
        plan.one_hot.len(),
        blocks[2].n_cols()
    );

    let y = TargetVector::new(target, target_column.data.clone());
    Ok((x, y))
}
