//! Named, fully numeric feature matrices.
use ndarray::{concatenate, Array2, Axis};

use crate::dataset::Dataset;
use crate::error::{ModelingError, Result};

/// A numeric matrix whose columns carry feature names.
///
/// Rows are samples and columns are features. Missing numeric cells are
/// stored as `NaN` until an imputation step replaces them.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    names: Vec<String>,
    values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn new(names: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if names.len() != values.ncols() {
            return Err(ModelingError::ShapeMismatch(format!(
                "{} feature names for a matrix with {} columns",
                names.len(),
                values.ncols()
            )));
        }
        Ok(FeatureMatrix { names, values })
    }

    /// A matrix with `n_rows` rows and no columns.
    pub fn empty(n_rows: usize) -> Self {
        FeatureMatrix {
            names: Vec::new(),
            values: Array2::zeros((n_rows, 0)),
        }
    }

    /// Gather the named numeric columns of a dataset, `NaN` for missing cells.
    pub fn from_numeric_columns(dataset: &Dataset, names: &[String]) -> Result<Self> {
        let mut values = Array2::zeros((dataset.n_rows(), names.len()));
        for (j, name) in names.iter().enumerate() {
            let column = dataset.require_column(name)?;
            let numeric = column.data.to_f64().ok_or_else(|| ModelingError::ColumnType {
                column: name.clone(),
                expected: "integer or float",
            })?;
            for (i, v) in numeric.into_iter().enumerate() {
                values[(i, j)] = v;
            }
        }
        FeatureMatrix::new(names.to_vec(), values)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn into_values(self) -> Array2<f64> {
        self.values
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.values.ncols()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn take_rows(&self, indices: &[usize]) -> FeatureMatrix {
        FeatureMatrix {
            names: self.names.clone(),
            values: self.values.select(Axis(0), indices),
        }
    }

    /// Column-wise concatenation; every block must have the same row count.
    pub fn hconcat(blocks: &[FeatureMatrix]) -> Result<FeatureMatrix> {
        let Some(first) = blocks.first() else {
            return Ok(FeatureMatrix::empty(0));
        };
        let n_rows = first.n_rows();
        if let Some(bad) = blocks.iter().find(|b| b.n_rows() != n_rows) {
            return Err(ModelingError::ShapeMismatch(format!(
                "cannot concatenate a block of {} rows with one of {} rows",
                bad.n_rows(),
                n_rows
            )));
        }

        let names = blocks.iter().flat_map(|b| b.names.iter().cloned()).collect();
        let views: Vec<_> = blocks.iter().map(|b| b.values.view()).collect();
        let values = concatenate(Axis(1), &views)
            .map_err(|e| ModelingError::ShapeMismatch(e.to_string()))?;
        FeatureMatrix::new(names, values)
    }
}
