//! Error type shared by every stage of the modeling pipeline.
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ModelingError>;

#[derive(Debug, Error)]
pub enum ModelingError {
    /// A dtype discriminator that does not name a known column type.
    #[error("invalid schema: unrecognized dtype discriminator '{0}'")]
    InvalidSchema(String),

    #[error("unsupported pipeline kind '{0}' (expected 'numeric' or 'categorical')")]
    UnsupportedKind(String),

    #[error("target column '{0}' is not present in the dataset")]
    MissingTarget(String),

    #[error("invalid fold count {folds}: must satisfy 2 <= k <= {rows} (row count)")]
    InvalidFoldCount { folds: usize, rows: usize },

    #[error("test fraction {0} must lie strictly between 0 and 1")]
    InvalidTestFraction(f64),

    #[error("model '{model}' failed to fit{}: {reason}", fold_suffix(.fold))]
    FitFailure {
        model: String,
        fold: Option<usize>,
        reason: String,
    },

    #[error("grid search for model '{model}' failed")]
    SearchEntryFailure {
        model: String,
        #[source]
        source: Box<ModelingError>,
    },

    #[error("invalid parameter '{name}' for model '{model}': {reason}")]
    InvalidParameter {
        model: String,
        name: String,
        reason: String,
    },

    #[error("column '{0}' is not present in the dataset")]
    UnknownColumn(String),

    #[error("column '{column}' has an unexpected type: expected {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
    },

    #[error("target column '{column}' cannot be used as class labels: {reason}")]
    InvalidTarget { column: String, reason: String },

    /// Inputs outside the domain of an A/B test statistic.
    #[error("invalid statistic input: {0}")]
    InvalidStatistic(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn fold_suffix(fold: &Option<usize>) -> String {
    match fold {
        Some(fold) => format!(" on fold {}", fold),
        None => String::new(),
    }
}

impl ModelingError {
    /// Build a `FitFailure` outside of any cross-validation fold.
    pub fn fit(model: impl Into<String>, reason: impl Into<String>) -> Self {
        ModelingError::FitFailure {
            model: model.into(),
            fold: None,
            reason: reason.into(),
        }
    }

    /// Attach a fold index to a `FitFailure`; other variants pass through.
    pub fn in_fold(self, fold_idx: usize) -> Self {
        match self {
            ModelingError::FitFailure { model, reason, .. } => ModelingError::FitFailure {
                model,
                fold: Some(fold_idx),
                reason,
            },
            other => other,
        }
    }

    pub fn invalid_param(
        model: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ModelingError::InvalidParameter {
            model: model.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }
}
