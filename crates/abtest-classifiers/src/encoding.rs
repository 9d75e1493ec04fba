//! Categorical encoders.
//!
//! Categorical columns are routed by cardinality: columns with more than two
//! and at most ten distinct values are one-hot encoded, every other
//! categorical column (binary or high-cardinality) is ordinal encoded.
//!
//! Both encoders are fit-then-apply and share one policy for values that
//! were not seen at fit time, as well as for missing cells: they encode to
//! "no category", which is an all-zero indicator row for one-hot and
//! [`UNKNOWN_CODE`] for ordinal.
use std::collections::BTreeMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::Result;
use crate::matrix::FeatureMatrix;

/// Largest distinct-value count that is still one-hot encoded.
pub const ONE_HOT_MAX_CARDINALITY: usize = 10;
/// Distinct-value counts at or below this go to ordinal encoding.
pub const ONE_HOT_MIN_CARDINALITY: usize = 2;
/// Ordinal code for missing and unseen values.
pub const UNKNOWN_CODE: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    OneHot,
    Ordinal,
}

impl Encoding {
    /// Encoding for a column with `n_unique` distinct non-missing values.
    pub fn for_cardinality(n_unique: usize) -> Encoding {
        if n_unique > ONE_HOT_MIN_CARDINALITY && n_unique <= ONE_HOT_MAX_CARDINALITY {
            Encoding::OneHot
        } else {
            Encoding::Ordinal
        }
    }
}

/// Every categorical column assigned to exactly one encoding bucket.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EncodingPlan {
    pub one_hot: Vec<String>,
    pub ordinal: Vec<String>,
}

impl EncodingPlan {
    pub fn classify(dataset: &Dataset, categorical: &[String]) -> Result<EncodingPlan> {
        let mut plan = EncodingPlan::default();
        for name in categorical {
            let n_unique = dataset.require_column(name)?.data.n_unique();
            let encoding = Encoding::for_cardinality(n_unique);
            log::debug!(
                "Column '{}' has {} distinct values, encoding as {:?}",
                name,
                n_unique,
                encoding
            );
            match encoding {
                Encoding::OneHot => plan.one_hot.push(name.clone()),
                Encoding::Ordinal => plan.ordinal.push(name.clone()),
            }
        }
        Ok(plan)
    }
}

/// Learned category lists for one-hot expansion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OneHotEncoder {
    columns: Vec<(String, Vec<String>)>,
}

impl OneHotEncoder {
    pub fn fit(dataset: &Dataset, columns: &[String]) -> Result<Self> {
        let columns = columns
            .iter()
            .map(|name| {
                let column = dataset.require_column(name)?;
                Ok((name.clone(), column.data.distinct().into_iter().collect()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(OneHotEncoder { columns })
    }

    pub(crate) fn fit_categories(columns: &[(String, Vec<Option<String>>)]) -> Self {
        let columns = columns
            .iter()
            .map(|(name, values)| {
                let mut categories: Vec<String> = values.iter().flatten().cloned().collect();
                categories.sort();
                categories.dedup();
                (name.clone(), categories)
            })
            .collect();
        OneHotEncoder { columns }
    }

    /// Output feature names, `<column>_<value>` in category order.
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|(name, categories)| categories.iter().map(move |c| format!("{}_{}", name, c)))
            .collect()
    }

    pub fn n_features_out(&self) -> usize {
        self.columns.iter().map(|(_, c)| c.len()).sum()
    }

    pub fn transform(&self, dataset: &Dataset) -> Result<FeatureMatrix> {
        let columns = self
            .columns
            .iter()
            .map(|(name, _)| Ok((name.clone(), dataset.require_column(name)?.data.categories())))
            .collect::<Result<Vec<_>>>()?;
        self.transform_categories(&columns, dataset.n_rows())
    }

    pub(crate) fn transform_categories(
        &self,
        columns: &[(String, Vec<Option<String>>)],
        n_rows: usize,
    ) -> Result<FeatureMatrix> {
        let mut values = Array2::zeros((n_rows, self.n_features_out()));
        let mut offset = 0;
        for ((_, categories), (_, cells)) in self.columns.iter().zip(columns) {
            for (row, cell) in cells.iter().enumerate() {
                let hit = cell
                    .as_ref()
                    .and_then(|v| categories.binary_search(v).ok());
                if let Some(idx) = hit {
                    values[(row, offset + idx)] = 1.0;
                }
            }
            offset += categories.len();
        }
        FeatureMatrix::new(self.feature_names(), values)
    }
}

/// Learned value-to-code tables for ordinal (label) encoding.
///
/// Codes follow the sorted order of the distinct values; they are stable for
/// a fitted encoder and carry no meaning across datasets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrdinalEncoder {
    columns: Vec<(String, BTreeMap<String, usize>)>,
}

impl OrdinalEncoder {
    pub fn fit(dataset: &Dataset, columns: &[String]) -> Result<Self> {
        let columns = columns
            .iter()
            .map(|name| {
                let column = dataset.require_column(name)?;
                let codes = column
                    .data
                    .distinct()
                    .into_iter()
                    .enumerate()
                    .map(|(code, value)| (value, code))
                    .collect();
                Ok((name.clone(), codes))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(OrdinalEncoder { columns })
    }

    pub fn transform(&self, dataset: &Dataset) -> Result<FeatureMatrix> {
        let mut values = Array2::zeros((dataset.n_rows(), self.columns.len()));
        for (j, (name, codes)) in self.columns.iter().enumerate() {
            let column = dataset.require_column(name)?;
            for row in 0..dataset.n_rows() {
                values[(row, j)] = column
                    .data
                    .category(row)
                    .and_then(|v| codes.get(&v).copied())
                    .map(|code| code as f64)
                    .unwrap_or(UNKNOWN_CODE);
            }
        }
        let names = self.columns.iter().map(|(name, _)| name.clone()).collect();
        FeatureMatrix::new(names, values)
    }
}

/// One binary indicator column per distinct value of each column.
pub fn encode_one_hot(dataset: &Dataset, columns: &[String]) -> Result<FeatureMatrix> {
    OneHotEncoder::fit(dataset, columns)?.transform(dataset)
}

/// One integer-coded column per input column, keeping the column name.
pub fn encode_ordinal(dataset: &Dataset, columns: &[String]) -> Result<FeatureMatrix> {
    OrdinalEncoder::fit(dataset, columns)?.transform(dataset)
}
