//! In-memory experiment tables.
//!
//! A `Dataset` is an ordered set of named, typed columns with aligned rows.
//! It is loaded once and never mutated: every "edit" (dropping columns,
//! selecting rows) returns a new `Dataset`, so the cached feature partition
//! can never go stale.
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{ModelingError, Result};
use crate::features::FeaturePartition;

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    Integer,
    Float,
    Boolean,
    Text,
}

impl DType {
    /// Integer and float columns count as numeric; booleans do not.
    pub fn is_numeric(self) -> bool {
        matches!(self, DType::Integer | DType::Float)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::Integer => "integer",
            DType::Float => "float",
            DType::Boolean => "boolean",
            DType::Text => "text",
        };
        write!(f, "{}", name)
    }
}

/// Column values; `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Boolean(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Integer(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Boolean(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            ColumnData::Integer(_) => DType::Integer,
            ColumnData::Float(_) => DType::Float,
            ColumnData::Boolean(_) => DType::Boolean,
            ColumnData::Text(_) => DType::Text,
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        self.category(row).is_none()
    }

    /// Numeric view of the column with `NaN` for missing cells.
    ///
    /// Returns `None` for boolean and text columns.
    pub fn to_f64(&self) -> Option<Vec<f64>> {
        match self {
            ColumnData::Integer(v) => Some(
                v.iter()
                    .map(|x| x.map(|x| x as f64).unwrap_or(f64::NAN))
                    .collect(),
            ),
            ColumnData::Float(v) => Some(v.iter().map(|x| x.unwrap_or(f64::NAN)).collect()),
            ColumnData::Boolean(_) | ColumnData::Text(_) => None,
        }
    }

    /// String form of a single cell, used as its category label.
    pub fn category(&self, row: usize) -> Option<String> {
        match self {
            ColumnData::Integer(v) => v[row].map(|x| x.to_string()),
            ColumnData::Float(v) => v[row].filter(|x| !x.is_nan()).map(|x| x.to_string()),
            ColumnData::Boolean(v) => v[row].map(|x| x.to_string()),
            ColumnData::Text(v) => v[row].clone(),
        }
    }

    /// Category labels for every row.
    pub fn categories(&self) -> Vec<Option<String>> {
        (0..self.len()).map(|row| self.category(row)).collect()
    }

    /// Distinct non-missing values, in sorted order.
    pub fn distinct(&self) -> BTreeSet<String> {
        (0..self.len()).filter_map(|row| self.category(row)).collect()
    }

    /// Number of distinct non-missing values.
    pub fn n_unique(&self) -> usize {
        self.distinct().len()
    }

    pub fn take(&self, indices: &[usize]) -> ColumnData {
        match self {
            ColumnData::Integer(v) => ColumnData::Integer(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Float(v) => ColumnData::Float(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Boolean(v) => ColumnData::Boolean(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Text(v) => {
                ColumnData::Text(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Column {
            name: name.into(),
            data,
        }
    }

    pub fn integer(name: impl Into<String>, values: Vec<i64>) -> Self {
        Column::new(name, ColumnData::Integer(values.into_iter().map(Some).collect()))
    }

    /// Float column; `NaN` entries become missing cells.
    pub fn float(name: impl Into<String>, values: Vec<f64>) -> Self {
        Column::new(
            name,
            ColumnData::Float(
                values
                    .into_iter()
                    .map(|v| if v.is_nan() { None } else { Some(v) })
                    .collect(),
            ),
        )
    }

    pub fn boolean(name: impl Into<String>, values: Vec<bool>) -> Self {
        Column::new(name, ColumnData::Boolean(values.into_iter().map(Some).collect()))
    }

    pub fn text<S: Into<String>>(name: impl Into<String>, values: Vec<S>) -> Self {
        Column::new(
            name,
            ColumnData::Text(values.into_iter().map(|v| Some(v.into())).collect()),
        )
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<Column>,
    n_rows: usize,
    partition: OnceLock<FeaturePartition>,
}

impl Dataset {
    /// Build a dataset, checking that names are unique and rows line up.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(|c| c.len()).unwrap_or(0);

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(ModelingError::ShapeMismatch(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
            if column.len() != n_rows {
                return Err(ModelingError::ShapeMismatch(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name,
                    column.len(),
                    n_rows
                )));
            }
        }

        Ok(Dataset {
            columns,
            n_rows,
            partition: OnceLock::new(),
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Like [`Dataset::column`] but fails with `UnknownColumn`.
    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| ModelingError::UnknownColumn(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Numeric/categorical split of every column, computed once per dataset.
    pub fn partition(&self) -> &FeaturePartition {
        self.partition
            .get_or_init(|| FeaturePartition::from_columns(&self.columns))
    }

    /// Copy of the dataset without the named columns. Unknown names are ignored.
    pub fn without_columns(&self, names: &[String]) -> Dataset {
        let columns = self
            .columns
            .iter()
            .filter(|c| !names.contains(&c.name))
            .cloned()
            .collect();
        Dataset {
            columns,
            n_rows: self.n_rows,
            partition: OnceLock::new(),
        }
    }

    /// Copy of the dataset holding only the named columns, in the given order.
    pub fn select_columns(&self, names: &[String]) -> Result<Dataset> {
        let columns = names
            .iter()
            .map(|name| self.require_column(name).cloned())
            .collect::<Result<Vec<_>>>()?;
        Dataset::new(columns)
    }

    /// Rows at `indices`, in that order, across every column.
    pub fn take_rows(&self, indices: &[usize]) -> Dataset {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), c.data.take(indices)))
            .collect();
        Dataset {
            columns,
            n_rows: indices.len(),
            partition: OnceLock::new(),
        }
    }

    pub fn log_summary(&self) {
        let partition = self.partition();
        log::info!(
            "Loaded dataset with {} rows and {} columns ({} numeric, {} categorical)",
            self.n_rows,
            self.n_cols(),
            partition.numeric().len(),
            partition.categorical().len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(vec![
            Column::integer("age", vec![21, 35, 44]),
            Column::text("city", vec!["a", "b", "a"]),
            Column::boolean("clicked", vec![true, false, true]),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_duplicate_names() {
        let result = Dataset::new(vec![
            Column::integer("age", vec![1]),
            Column::integer("age", vec![2]),
        ]);
        assert!(matches!(result, Err(ModelingError::ShapeMismatch(_))));
    }

    #[test]
    fn rejects_ragged_columns() {
        let result = Dataset::new(vec![
            Column::integer("age", vec![1, 2]),
            Column::text("city", vec!["x"]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn float_nan_is_missing() {
        let column = Column::float("spend", vec![1.5, f64::NAN]);
        assert!(!column.data.is_missing(0));
        assert!(column.data.is_missing(1));
        assert_eq!(column.data.n_unique(), 1);
    }

    #[test]
    fn take_rows_keeps_alignment() {
        let ds = sample().take_rows(&[2, 0]);
        assert_eq!(ds.n_rows(), 2);
        assert_eq!(
            ds.column("city").unwrap().data.categories(),
            vec![Some("a".to_string()), Some("a".to_string())]
        );
        assert_eq!(
            ds.column("age").unwrap().data,
            ColumnData::Integer(vec![Some(44), Some(21)])
        );
    }

    #[test]
    fn without_columns_recomputes_partition() {
        let ds = sample();
        assert_eq!(ds.partition().categorical().len(), 2);
        let reduced = ds.without_columns(&["city".to_string()]);
        assert_eq!(reduced.partition().categorical(), &["clicked".to_string()]);
        assert_eq!(reduced.n_cols(), 2);
    }
}
