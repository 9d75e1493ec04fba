//! Reusable imputation/scaling/encoding pipelines.
//!
//! A [`Pipeline`] is an ordered list of steps built for one column kind.
//! Fitting it on a set of columns learns the per-column statistics of every
//! step and returns a [`FittedPipeline`] that can be applied to any dataset
//! with the same columns, deterministically.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::encoding::OneHotEncoder;
use crate::error::{ModelingError, Result};
use crate::matrix::FeatureMatrix;
use crate::split::shuffled_partition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Numeric,
    Categorical,
}

impl FromStr for PipelineKind {
    type Err = ModelingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "numeric" => Ok(PipelineKind::Numeric),
            "categorical" => Ok(PipelineKind::Categorical),
            _ => Err(ModelingError::UnsupportedKind(s.to_string())),
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineKind::Numeric => write!(f, "numeric"),
            PipelineKind::Categorical => write!(f, "categorical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    MeanImpute,
    MinMaxScale,
    MostFrequentImpute,
    OneHot,
}

/// Which rows a pipeline learns its statistics from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitSource {
    Full,
    /// The training portion of a shuffled split holding out `test_fraction`.
    TrainFraction {
        test_fraction: f64,
        seed: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pipeline {
    kind: PipelineKind,
    steps: Vec<Step>,
}

impl Pipeline {
    /// Mean-impute then min-max scale for numeric columns; most-frequent
    /// impute then one-hot for categorical columns.
    pub fn build(kind: PipelineKind) -> Pipeline {
        let steps = match kind {
            PipelineKind::Numeric => vec![Step::MeanImpute, Step::MinMaxScale],
            PipelineKind::Categorical => vec![Step::MostFrequentImpute, Step::OneHot],
        };
        Pipeline { kind, steps }
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn fit(&self, dataset: &Dataset, columns: &[String]) -> Result<FittedPipeline> {
        let mut frame = Frame::extract(self.kind, dataset, columns)?;
        let mut fitted = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let step = FittedStep::fit(*step, &frame)?;
            frame = step.apply(frame)?;
            fitted.push(step);
        }
        log::debug!(
            "Fitted {} pipeline on {} columns and {} rows",
            self.kind,
            columns.len(),
            dataset.n_rows()
        );
        Ok(FittedPipeline {
            kind: self.kind,
            columns: columns.to_vec(),
            steps: fitted,
        })
    }

    /// Fit on the rows chosen by `source`, then transform those same rows.
    pub fn fit_transform(
        &self,
        dataset: &Dataset,
        columns: &[String],
        source: FitSource,
    ) -> Result<(FittedPipeline, FeatureMatrix)> {
        let subset = match source {
            FitSource::Full => dataset.clone(),
            FitSource::TrainFraction {
                test_fraction,
                seed,
            } => {
                let (train, _) = shuffled_partition(dataset.n_rows(), test_fraction, seed)?;
                dataset.take_rows(&train)
            }
        };
        let fitted = self.fit(&subset, columns)?;
        let transformed = fitted.transform(&subset)?;
        Ok((fitted, transformed))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedPipeline {
    kind: PipelineKind,
    columns: Vec<String>,
    steps: Vec<FittedStep>,
}

impl FittedPipeline {
    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn transform(&self, dataset: &Dataset) -> Result<FeatureMatrix> {
        let mut frame = Frame::extract(self.kind, dataset, &self.columns)?;
        for step in &self.steps {
            frame = step.apply(frame)?;
        }
        match frame {
            Frame::Numeric(m) => Ok(m),
            Frame::Categorical(_) => Err(ModelingError::ShapeMismatch(format!(
                "{} pipeline did not produce numeric output",
                self.kind
            ))),
        }
    }
}

/// Intermediate data flowing between steps.
enum Frame {
    Numeric(FeatureMatrix),
    Categorical(Vec<(String, Vec<Option<String>>)>),
}

impl Frame {
    fn extract(kind: PipelineKind, dataset: &Dataset, columns: &[String]) -> Result<Frame> {
        match kind {
            PipelineKind::Numeric => Ok(Frame::Numeric(FeatureMatrix::from_numeric_columns(
                dataset, columns,
            )?)),
            PipelineKind::Categorical => {
                let cells = columns
                    .iter()
                    .map(|name| Ok((name.clone(), dataset.require_column(name)?.data.categories())))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Frame::Categorical(cells))
            }
        }
    }

    fn n_rows(&self) -> usize {
        match self {
            Frame::Numeric(m) => m.n_rows(),
            Frame::Categorical(cols) => cols.first().map(|(_, c)| c.len()).unwrap_or(0),
        }
    }
}

/// Per-column mean used to fill missing numeric cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeanImputer {
    pub means: Vec<f64>,
}

/// Per-column minimum and scale factor mapping the fitted range onto [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinMaxScaler {
    pub min: Vec<f64>,
    pub scale: Vec<f64>,
}

impl MinMaxScaler {
    /// Ranges narrower than this are treated as constant columns.
    const MIN_RANGE: f64 = 1e-12;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MostFrequentImputer {
    pub fill: Vec<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
enum FittedStep {
    MeanImpute(MeanImputer),
    MinMaxScale(MinMaxScaler),
    MostFrequentImpute(MostFrequentImputer),
    OneHot(OneHotEncoder),
}

impl FittedStep {
    fn fit(step: Step, frame: &Frame) -> Result<FittedStep> {
        match (step, frame) {
            (Step::MeanImpute, Frame::Numeric(m)) => Ok(FittedStep::MeanImpute(fit_mean(m))),
            (Step::MinMaxScale, Frame::Numeric(m)) => Ok(FittedStep::MinMaxScale(fit_min_max(m))),
            (Step::MostFrequentImpute, Frame::Categorical(cols)) => {
                Ok(FittedStep::MostFrequentImpute(fit_most_frequent(cols)))
            }
            (Step::OneHot, Frame::Categorical(cols)) => {
                Ok(FittedStep::OneHot(OneHotEncoder::fit_categories(cols)))
            }
            (step, _) => Err(ModelingError::ShapeMismatch(format!(
                "step {:?} cannot consume this input",
                step
            ))),
        }
    }

    fn apply(&self, frame: Frame) -> Result<Frame> {
        let n_rows = frame.n_rows();
        match (self, frame) {
            (FittedStep::MeanImpute(imp), Frame::Numeric(m)) => {
                let names = m.names().to_vec();
                let mut values = m.into_values();
                for (j, mut col) in values.columns_mut().into_iter().enumerate() {
                    col.mapv_inplace(|v| if v.is_nan() { imp.means[j] } else { v });
                }
                Ok(Frame::Numeric(FeatureMatrix::new(names, values)?))
            }
            (FittedStep::MinMaxScale(sc), Frame::Numeric(m)) => {
                let names = m.names().to_vec();
                let mut values = m.into_values();
                for (j, mut col) in values.columns_mut().into_iter().enumerate() {
                    col.mapv_inplace(|v| (v - sc.min[j]) * sc.scale[j]);
                }
                Ok(Frame::Numeric(FeatureMatrix::new(names, values)?))
            }
            (FittedStep::MostFrequentImpute(imp), Frame::Categorical(cols)) => {
                let cols = cols
                    .into_iter()
                    .zip(&imp.fill)
                    .map(|((name, cells), fill)| {
                        let cells = cells
                            .into_iter()
                            .map(|c| c.or_else(|| fill.clone()))
                            .collect();
                        (name, cells)
                    })
                    .collect();
                Ok(Frame::Categorical(cols))
            }
            (FittedStep::OneHot(enc), Frame::Categorical(cols)) => {
                Ok(Frame::Numeric(enc.transform_categories(&cols, n_rows)?))
            }
            _ => Err(ModelingError::ShapeMismatch(
                "fitted step received input of the wrong kind".to_string(),
            )),
        }
    }
}

/// Fit a `MeanImputer`, ignoring `NaN` cells. An all-missing column is filled with 0.
pub fn fit_mean(x: &FeatureMatrix) -> MeanImputer {
    let means = x
        .values()
        .columns()
        .into_iter()
        .zip(x.names())
        .map(|(col, name)| {
            let (sum, count) = col
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
            if count == 0 {
                log::warn!("Column '{}' has no observed values; imputing 0", name);
                0.0
            } else {
                sum / count as f64
            }
        })
        .collect();
    MeanImputer { means }
}

/// Fit a `MinMaxScaler` from the observed (non-`NaN`) range of each column.
pub fn fit_min_max(x: &FeatureMatrix) -> MinMaxScaler {
    let mut min = Vec::with_capacity(x.n_cols());
    let mut scale = Vec::with_capacity(x.n_cols());
    for col in x.values().columns() {
        let (lo, hi) = col
            .iter()
            .filter(|v| !v.is_nan())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if lo > hi {
            min.push(0.0);
            scale.push(1.0);
            continue;
        }
        let range = hi - lo;
        min.push(lo);
        scale.push(if range < MinMaxScaler::MIN_RANGE { 1.0 } else { 1.0 / range });
    }
    MinMaxScaler { min, scale }
}

/// Most frequent value per column; ties go to the smallest value.
pub fn fit_most_frequent(columns: &[(String, Vec<Option<String>>)]) -> MostFrequentImputer {
    let fill = columns
        .iter()
        .map(|(name, cells)| {
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for cell in cells.iter().flatten() {
                *counts.entry(cell.as_str()).or_default() += 1;
            }
            let mut best: Option<(&str, usize)> = None;
            for (value, count) in counts {
                if best.map_or(true, |(_, n)| count > n) {
                    best = Some((value, count));
                }
            }
            if best.is_none() {
                log::warn!("Column '{}' has no observed values; leaving it missing", name);
            }
            best.map(|(value, _)| value.to_string())
        })
        .collect();
    MostFrequentImputer { fill }
}
