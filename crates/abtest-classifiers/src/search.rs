//! Exhaustive grid search over named model configurations.
use rayon::prelude::*;
use serde::Serialize;

use crate::config::{format_params, ModelFamily, ParamGrid, ParamSet, ParamValue, SearchEntry};
use crate::error::{ModelingError, Result};
use crate::evaluation::{fold_scores, Fold, KFold, DEFAULT_FOLDS};
use crate::matrix::FeatureMatrix;
use crate::target::Labels;

/// Every combination of the grid's values, in key order with the last key
/// varying fastest. An empty grid yields a single empty combination.
pub fn parameter_grid(grid: &ParamGrid) -> Vec<ParamSet> {
    let axes: Vec<_> = grid.iter().collect();
    cartesian_product(&axes)
}

fn cartesian_product(axes: &[(&String, &Vec<ParamValue>)]) -> Vec<ParamSet> {
    let Some(((name, values), rest)) = axes.split_first() else {
        return vec![ParamSet::new()];
    };
    let rest_sets = cartesian_product(rest);
    values
        .iter()
        .flat_map(|v| {
            rest_sets.iter().map(move |set| {
                let mut combined = set.clone();
                combined.insert((*name).clone(), v.clone());
                combined
            })
        })
        .collect()
}

/// Best cross-validated candidate of one search entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub name: String,
    pub family: ModelFamily,
    pub best_score: f64,
    pub best_params: ParamSet,
    pub n_candidates: usize,
}

/// Results for the entries that succeeded, in input order, and one
/// `SearchEntryFailure` per entry that did not.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub failures: Vec<ModelingError>,
}

impl SearchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSearch {
    pub cv: KFold,
}

impl Default for GridSearch {
    /// Five contiguous, unshuffled and unstratified folds.
    fn default() -> Self {
        GridSearch {
            cv: KFold::ordered(DEFAULT_FOLDS),
        }
    }
}

impl GridSearch {
    pub fn new(cv: KFold) -> Self {
        GridSearch { cv }
    }

    /// Search every entry. A failing entry is reported in `failures` and the
    /// remaining entries still run; only an invalid fold count for the data
    /// aborts the whole search.
    pub fn run(&self, entries: &[SearchEntry], x: &FeatureMatrix, y: &Labels) -> Result<SearchOutcome> {
        let folds = self.cv.split(x.n_rows())?;
        let mut outcome = SearchOutcome::default();
        for entry in entries {
            match search_entry(entry, x, y, &folds) {
                Ok(result) => {
                    log::info!(
                        "Best {} ({}) score {:.4} with {}",
                        result.name,
                        result.family,
                        result.best_score,
                        format_params(&result.best_params)
                    );
                    outcome.results.push(result);
                }
                Err(e) => {
                    log::warn!("Grid search for '{}' failed: {}", entry.name, e);
                    outcome.failures.push(ModelingError::SearchEntryFailure {
                        model: entry.name.clone(),
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(outcome)
    }
}

/// Cross-validate every candidate of `entry` on `folds` and keep the best
/// mean score. The first candidate wins ties.
pub fn search_entry(entry: &SearchEntry, x: &FeatureMatrix, y: &Labels, folds: &[Fold]) -> Result<SearchResult> {
    if let Some((name, _)) = entry.grid.iter().find(|(_, values)| values.is_empty()) {
        return Err(ModelingError::invalid_param(
            entry.name.as_str(),
            name.as_str(),
            "grid lists no values",
        ));
    }
    let candidates = parameter_grid(&entry.grid);
    log::debug!("Searching {} candidates for '{}'", candidates.len(), entry.name);

    let scores: Vec<Result<f64>> = candidates
        .par_iter()
        .map(|params| {
            let spec = entry.model.with_params(params);
            let scores = fold_scores(&spec, x, y, folds)?;
            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            log::trace!("'{}' [{}] mean score {:.4}", entry.name, format_params(params), mean);
            Ok(mean)
        })
        .collect();
    let scores = scores.into_iter().collect::<Result<Vec<f64>>>()?;

    let mut best = 0;
    for (i, score) in scores.iter().enumerate() {
        if *score > scores[best] {
            best = i;
        }
    }
    Ok(SearchResult {
        name: entry.name.clone(),
        family: entry.model.family,
        best_score: scores[best],
        best_params: entry.model.with_params(&candidates[best]).params,
        n_candidates: candidates.len(),
    })
}
