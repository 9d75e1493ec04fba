use ndarray::Array2;

use crate::config::{ParamSet, ParamValue};
use crate::error::{ModelingError, Result};
use crate::target::Labels;

/// Typed access to a model's hyper-parameters with family defaults.
///
/// Construction fails on any parameter the family does not know, so typos in
/// a configuration file surface as errors instead of silently using defaults.
pub struct ParamReader<'a> {
    model: &'a str,
    params: &'a ParamSet,
}

impl<'a> ParamReader<'a> {
    pub fn new(model: &'a str, params: &'a ParamSet, known: &[&str]) -> Result<Self> {
        if let Some(name) = params.keys().find(|k| !known.contains(&k.as_str())) {
            return Err(ModelingError::invalid_param(
                model,
                name.as_str(),
                format!("unknown parameter; expected one of {}", known.join(", ")),
            ));
        }
        Ok(ParamReader { model, params })
    }

    fn get<T>(&self, name: &str, default: T, expected: &str, read: impl Fn(&ParamValue) -> Option<T>) -> Result<T> {
        match self.params.get(name) {
            None => Ok(default),
            Some(value) => read(value).ok_or_else(|| {
                ModelingError::invalid_param(self.model, name, format!("expected {}, got {}", expected, value))
            }),
        }
    }

    pub fn f64(&self, name: &str, default: f64) -> Result<f64> {
        self.get(name, default, "a number", ParamValue::as_f64)
    }

    /// A strictly positive, finite number.
    pub fn positive_f64(&self, name: &str, default: f64) -> Result<f64> {
        self.get(name, default, "a positive number", |v| {
            v.as_f64().filter(|v| v.is_finite() && *v > 0.0)
        })
    }

    pub fn usize(&self, name: &str, default: usize) -> Result<usize> {
        self.get(name, default, "a non-negative integer", ParamValue::as_usize)
    }

    /// An integer of at least `min`.
    pub fn usize_at_least(&self, name: &str, default: usize, min: usize) -> Result<usize> {
        self.get(name, default, &format!("an integer >= {}", min), |v| {
            v.as_usize().filter(|v| *v >= min)
        })
    }

    /// An optional integer; JSON `null` is not accepted, leave the key out instead.
    pub fn optional_usize(&self, name: &str) -> Result<Option<usize>> {
        self.get(name, None, "a non-negative integer", |v| v.as_usize().map(Some))
    }

    pub fn optional_u64(&self, name: &str) -> Result<Option<u64>> {
        self.get(name, None, "a non-negative integer", |v| v.as_u64().map(Some))
    }

    /// One of a fixed set of strings.
    pub fn choice(&self, name: &str, default: &'static str, options: &[&'static str]) -> Result<&'static str> {
        let expected = format!("one of {}", options.join(", "));
        self.get(name, default, &expected, |v| {
            v.as_str().and_then(|s| options.iter().find(|o| **o == s).copied())
        })
    }
}

/// Checks shared by every `fit`: non-empty, aligned and finite.
pub fn check_training_data(model: &str, x: &Array2<f64>, y: &Labels) -> Result<()> {
    if x.nrows() == 0 {
        return Err(ModelingError::fit(model, "no training rows"));
    }
    if x.nrows() != y.len() {
        return Err(ModelingError::fit(
            model,
            format!("{} feature rows but {} labels", x.nrows(), y.len()),
        ));
    }
    check_finite(model, x)
}

/// Checks shared by every `predict`: the model is fit and the width matches.
pub fn check_prediction_data(model: &str, x: &Array2<f64>, n_features: Option<usize>) -> Result<()> {
    let n_features = n_features.ok_or_else(|| ModelingError::fit(model, "model used before fit"))?;
    if x.ncols() != n_features {
        return Err(ModelingError::fit(
            model,
            format!("fit on {} features but asked to predict {}", n_features, x.ncols()),
        ));
    }
    check_finite(model, x)
}

fn check_finite(model: &str, x: &Array2<f64>) -> Result<()> {
    if let Some(((row, col), _)) = x.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(ModelingError::fit(
            model,
            format!("non-finite feature value at row {}, column {}", row, col),
        ));
    }
    Ok(())
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Number of rows per class code.
pub fn class_counts(codes: impl IntoIterator<Item = usize>, n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0; n_classes];
    for c in codes {
        counts[c] += 1;
    }
    counts
}
