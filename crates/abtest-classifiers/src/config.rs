use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::assembly::AssemblyOptions;
use crate::error::{ModelingError, Result};
use crate::models::factory::known_params;

/// A single hyper-parameter value as written in a configuration file.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Some(*v as usize),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

/// One concrete assignment of hyper-parameters, ordered by name.
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Candidate values per hyper-parameter, ordered by name.
pub type ParamGrid = BTreeMap<String, Vec<ParamValue>>;

/// Render a parameter set as `a=1, b=0.5` for logs and reports.
pub fn format_params(params: &ParamSet) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Supported model families.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Gbdt,
    #[default]
    LogisticRegression,
    Knn,
    GaussianNb,
    DecisionTree,
    RandomForest,
}

impl ModelFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Gbdt => "gbdt",
            ModelFamily::LogisticRegression => "logistic_regression",
            ModelFamily::Knn => "knn",
            ModelFamily::GaussianNb => "gaussian_nb",
            ModelFamily::DecisionTree => "decision_tree",
            ModelFamily::RandomForest => "random_forest",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = ModelingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gbdt" => Ok(ModelFamily::Gbdt),
            "logistic_regression" | "logistic" | "lr" => Ok(ModelFamily::LogisticRegression),
            "knn" | "k_neighbors" => Ok(ModelFamily::Knn),
            "gaussian_nb" | "naive_bayes" => Ok(ModelFamily::GaussianNb),
            "decision_tree" | "tree" => Ok(ModelFamily::DecisionTree),
            "random_forest" | "rf" => Ok(ModelFamily::RandomForest),
            _ => Err(ModelingError::invalid_param(
                s,
                "family",
                "unknown model family; expected one of gbdt, logistic_regression, knn, gaussian_nb, decision_tree, random_forest",
            )),
        }
    }
}

/// A model family plus the hyper-parameters that override its defaults.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct ModelSpec {
    pub family: ModelFamily,
    #[serde(default)]
    pub params: ParamSet,
}

impl ModelSpec {
    pub fn new(family: ModelFamily) -> Self {
        ModelSpec {
            family,
            params: ParamSet::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// This spec with a `seed` parameter set to `seed` when the family takes
    /// one and none was given. Other families are returned unchanged.
    pub fn seeded(&self, seed: Option<u64>) -> ModelSpec {
        let mut spec = self.clone();
        if let Some(seed) = seed {
            if known_params(self.family).contains(&"seed") && !spec.params.contains_key("seed") {
                let seed = i64::try_from(seed).unwrap_or(i64::MAX);
                spec.params.insert("seed".to_string(), ParamValue::Int(seed));
            }
        }
        spec
    }

    /// This spec with `overrides` layered on top of its own parameters.
    pub fn with_params(&self, overrides: &ParamSet) -> ModelSpec {
        let mut params = self.params.clone();
        params.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        ModelSpec {
            family: self.family,
            params,
        }
    }
}

/// A named model whose parameter grid is searched exhaustively.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SearchEntry {
    pub name: String,
    #[serde(flatten)]
    pub model: ModelSpec,
    #[serde(default)]
    pub grid: ParamGrid,
}

impl SearchEntry {
    pub fn new(name: impl Into<String>, model: ModelSpec, grid: ParamGrid) -> Self {
        SearchEntry {
            name: name.into(),
            model,
            grid,
        }
    }
}

/// Run configuration, loaded from JSON.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ModelingConfig {
    pub data: PathBuf,
    pub target: String,
    pub test_fraction: f64,
    pub folds: usize,
    pub seed: Option<u64>,
    pub scale_numeric: bool,
    pub model: ModelSpec,
    pub search: Vec<SearchEntry>,
    pub tracking_dir: Option<PathBuf>,
}

impl Default for ModelingConfig {
    fn default() -> Self {
        Self {
            data: PathBuf::new(),
            target: "yes".to_string(),
            test_fraction: 0.33,
            folds: 5,
            seed: Some(1),
            scale_numeric: false,
            model: ModelSpec::default(),
            search: Vec::new(),
            tracking_dir: None,
        }
    }
}

impl ModelingConfig {
    pub fn assembly_options(&self) -> AssemblyOptions {
        AssemblyOptions {
            scale_numeric: self.scale_numeric,
        }
    }

    /// Check the values that do not depend on the data. The fold count is
    /// checked against the row count once the data is loaded.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ModelingError::InvalidTestFraction(self.test_fraction));
        }
        Ok(())
    }
}

/// Load a modeling configuration from a JSON file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ModelingConfig> {
    let content = std::fs::read_to_string(&path)?;
    let config: ModelingConfig = serde_json::from_str(&content)?;
    log::debug!("Loaded configuration from {}", path.as_ref().display());
    Ok(config)
}
