//! Column classification by declared dtype.
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dataset::{Column, DType, Dataset};
use crate::error::{ModelingError, Result};

/// Dtype discriminator used to select columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DTypeSelector {
    /// Integer or float.
    Number,
    Integer,
    Float,
    Bool,
    Text,
}

impl DTypeSelector {
    pub fn matches(self, dtype: DType) -> bool {
        match self {
            DTypeSelector::Number => dtype.is_numeric(),
            DTypeSelector::Integer => dtype == DType::Integer,
            DTypeSelector::Float => dtype == DType::Float,
            DTypeSelector::Bool => dtype == DType::Boolean,
            DTypeSelector::Text => dtype == DType::Text,
        }
    }
}

impl FromStr for DTypeSelector {
    type Err = ModelingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "number" | "numeric" => Ok(DTypeSelector::Number),
            "int" | "integer" | "int64" => Ok(DTypeSelector::Integer),
            "float" | "float64" => Ok(DTypeSelector::Float),
            "bool" | "boolean" => Ok(DTypeSelector::Bool),
            "object" | "str" | "string" | "text" | "category" => Ok(DTypeSelector::Text),
            _ => Err(ModelingError::InvalidSchema(s.to_string())),
        }
    }
}

/// Whether a selection keeps or drops the matching columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
    Include,
    Exclude,
}

/// Names of the columns whose dtype matches (or, with `Exclude`, does not
/// match) the selector, in dataset order. Covers every column, target included.
pub fn select_columns(dataset: &Dataset, selector: DTypeSelector, mode: SelectMode) -> Vec<String> {
    dataset
        .columns()
        .iter()
        .filter(|c| selector.matches(c.dtype()) == (mode == SelectMode::Include))
        .map(|c| c.name.clone())
        .collect()
}

/// [`select_columns`] with a textual discriminator such as `"number"`.
pub fn select_columns_by(dataset: &Dataset, discriminator: &str, mode: SelectMode) -> Result<Vec<String>> {
    let selector = discriminator.parse::<DTypeSelector>()?;
    Ok(select_columns(dataset, selector, mode))
}

/// Disjoint numeric and categorical column names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FeaturePartition {
    numeric: Vec<String>,
    categorical: Vec<String>,
}

impl FeaturePartition {
    pub(crate) fn from_columns(columns: &[Column]) -> Self {
        let (numeric, categorical): (Vec<&Column>, Vec<&Column>) =
            columns.iter().partition(|c| c.dtype().is_numeric());
        FeaturePartition {
            numeric: numeric.into_iter().map(|c| c.name.clone()).collect(),
            categorical: categorical.into_iter().map(|c| c.name.clone()).collect(),
        }
    }

    pub fn numeric(&self) -> &[String] {
        &self.numeric
    }

    pub fn categorical(&self) -> &[String] {
        &self.categorical
    }

    /// The same partition with `column` removed from whichever side holds it.
    pub fn without(&self, column: &str) -> FeaturePartition {
        FeaturePartition {
            numeric: self.numeric.iter().filter(|c| *c != column).cloned().collect(),
            categorical: self
                .categorical
                .iter()
                .filter(|c| *c != column)
                .cloned()
                .collect(),
        }
    }
}
