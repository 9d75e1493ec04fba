//! Target column extraction and class labelling.
use std::collections::BTreeSet;

use ndarray::Array1;

use crate::dataset::ColumnData;
use crate::error::{ModelingError, Result};

/// The column being predicted, detached from the feature table.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetVector {
    name: String,
    data: ColumnData,
}

impl TargetVector {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        TargetVector {
            name: name.into(),
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Integer class codes for the target.
    ///
    /// Classes are the distinct values sorted by their string form, so a
    /// boolean target always maps `false -> 0` and `true -> 1`.
    pub fn labels(&self) -> Result<Labels> {
        let cells = self.data.categories();
        if let Some(row) = cells.iter().position(|c| c.is_none()) {
            return Err(ModelingError::InvalidTarget {
                column: self.name.clone(),
                reason: format!("missing value at row {}", row),
            });
        }
        let classes: Vec<String> = cells
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let codes = cells
            .iter()
            .flatten()
            .map(|c| classes.binary_search(c).unwrap_or_default())
            .collect();
        Ok(Labels { classes, codes })
    }
}

/// Class codes in `0..n_classes` together with the class names they stand for.
#[derive(Debug, Clone, PartialEq)]
pub struct Labels {
    classes: Vec<String>,
    codes: Array1<usize>,
}

impl Labels {
    pub fn new(classes: Vec<String>, codes: Array1<usize>) -> Result<Self> {
        if let Some(bad) = codes.iter().find(|&&c| c >= classes.len()) {
            return Err(ModelingError::ShapeMismatch(format!(
                "class code {} out of range for {} classes",
                bad,
                classes.len()
            )));
        }
        Ok(Labels { classes, codes })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn codes(&self) -> &Array1<usize> {
        &self.codes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Subset of rows; the class list is kept whole so codes stay comparable.
    pub fn take(&self, indices: &[usize]) -> Labels {
        Labels {
            classes: self.classes.clone(),
            codes: indices.iter().map(|&i| self.codes[i]).collect(),
        }
    }
}
