use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use abtest_classifiers::config::ModelingConfig;
use abtest_classifiers::evaluation::{CrossValidationResult, KFold};
use abtest_classifiers::io::read_delimited;
use abtest_classifiers::modeler::Modeler;
use abtest_classifiers::search::{GridSearch, SearchResult};
use abtest_classifiers::stats::AbTestSummary;
use abtest_classifiers::tracking::{JsonDirTracker, LogTracker, ModelArtifact, Tracker};
use abtest_classifiers::ModelingError;

/// Holdout evaluation as printed by `abtest holdout`.
#[derive(Debug, Clone, Serialize)]
pub struct HoldoutReport {
    pub model: String,
    pub classes: Vec<String>,
    /// Rows are true classes, columns predicted classes.
    pub confusion_matrix: Vec<Vec<usize>>,
    pub accuracy: f64,
}

/// Grid search results as printed by `abtest search`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub results: Vec<SearchResult>,
    pub failures: Vec<SearchFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchFailure {
    pub name: String,
    pub error: String,
}

fn load_modeler(config: &ModelingConfig) -> Result<Modeler> {
    let dataset = read_delimited(&config.data)
        .with_context(|| format!("Failed to read data file: {:?}", config.data))?;
    log::info!(
        "Loaded {} rows x {} columns from {:?}",
        dataset.n_rows(),
        dataset.n_cols(),
        config.data
    );
    let modeler = Modeler::new(dataset, config.target.clone())?
        .with_options(config.assembly_options());
    Ok(modeler)
}

fn tracker(config: &ModelingConfig) -> Result<Box<dyn Tracker>> {
    match &config.tracking_dir {
        Some(dir) => {
            let tracker = JsonDirTracker::new(dir)
                .with_context(|| format!("Failed to create tracking directory in {:?}", dir))?;
            Ok(Box::new(tracker))
        }
        None => Ok(Box::new(LogTracker)),
    }
}

/// k-fold cross-validation of the configured model on the whole dataset.
///
/// Logs `score`, `min` and `max` plus the model artifact to the configured
/// tracker.
pub fn run_evaluate(config: &ModelingConfig) -> Result<CrossValidationResult> {
    let modeler = load_modeler(config)?;
    let kfold = KFold::shuffled(config.folds, config.seed);
    let result = modeler.evaluate(&config.model, &kfold)?;
    log::info!(
        "{}-fold accuracy of {}: mean {:.4} (min {:.4}, max {:.4})",
        config.folds,
        config.model.family,
        result.mean,
        result.min,
        result.max
    );

    let (x, y) = modeler.labelled()?;
    let artifact = ModelArtifact::new(
        config.model.clone(),
        x.names().to_vec(),
        y.classes().to_vec(),
    );
    let mut tracker = tracker(config)?;
    tracker.log_metrics(&result.metrics())?;
    tracker.log_model(config.model.family.as_str(), &artifact)?;
    Ok(result)
}

/// Fit on a seeded train split and score the held-out rows.
pub fn run_holdout(config: &ModelingConfig) -> Result<HoldoutReport> {
    let modeler = load_modeler(config)?;
    let result = modeler.fit_holdout(&config.model, config.test_fraction, config.seed)?;
    log::info!(
        "Holdout accuracy of {}: {:.4}",
        config.model.family,
        result.accuracy
    );

    let mut tracker = tracker(config)?;
    tracker.log_metrics(&BTreeMap::from([("accuracy".to_string(), result.accuracy)]))?;
    Ok(HoldoutReport {
        model: config.model.family.to_string(),
        classes: result.classes,
        confusion_matrix: result
            .confusion_matrix
            .rows()
            .into_iter()
            .map(|row| row.to_vec())
            .collect(),
        accuracy: result.accuracy,
    })
}

/// Grid search every configured entry on the training split.
///
/// Entries that fail are reported next to the ones that succeeded; the run
/// itself only fails when nothing could be searched.
pub fn run_search(config: &ModelingConfig) -> Result<SearchReport> {
    if config.search.is_empty() {
        anyhow::bail!("No search entries in the configuration");
    }
    let modeler = load_modeler(config)?;
    let search = GridSearch::new(KFold::ordered(config.folds));
    let outcome = modeler.hyperparameters(&config.search, &search, config.test_fraction, config.seed)?;

    let mut tracker = tracker(config)?;
    let metrics: BTreeMap<String, f64> = outcome
        .results
        .iter()
        .map(|r| (format!("{}.best_score", r.name), r.best_score))
        .collect();
    tracker.log_metrics(&metrics)?;

    let failures: Vec<SearchFailure> = outcome
        .failures
        .iter()
        .map(|err| SearchFailure {
            name: match err {
                ModelingError::SearchEntryFailure { model, .. } => model.clone(),
                _ => String::from("<unknown>"),
            },
            error: error_chain(err),
        })
        .collect();
    for failure in &failures {
        log::error!("Search for '{}' failed: {}", failure.name, failure.error);
    }
    if outcome.results.is_empty() {
        anyhow::bail!("Every search entry failed");
    }
    Ok(SearchReport {
        results: outcome.results,
        failures,
    })
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}

/// Statistics of an A/B test with `n_a` control and `n_b` test samples.
pub fn run_summary(n_a: f64, n_b: f64, bcr: f64, d_hat: f64, sig_level: f64) -> Result<AbTestSummary> {
    let summary = AbTestSummary::new(n_a, n_b, bcr, d_hat, sig_level)?;
    log::info!(
        "Power {:.4} at significance {} (p-value {:.4})",
        summary.power,
        sig_level,
        summary.p_value
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use abtest_classifiers::config::{ModelFamily, ModelSpec, SearchEntry};
    use abtest_classifiers::config::{ParamGrid, ParamValue};
    use std::fmt::Write as _;

    fn write_dataset(dir: &std::path::Path) -> std::path::PathBuf {
        let mut csv = String::from("age,city,yes\n");
        let cities = ["rome", "oslo", "lima", "kiev"];
        for i in 0..40 {
            writeln!(csv, "{},{},{}", 20 + i, cities[i % 4], i % 2 == 0).unwrap();
        }
        let path = dir.join("ab.csv");
        std::fs::write(&path, csv).unwrap();
        path
    }

    fn config(dir: &std::path::Path) -> ModelingConfig {
        ModelingConfig {
            data: write_dataset(dir),
            model: ModelSpec::new(ModelFamily::DecisionTree),
            ..ModelingConfig::default()
        }
    }

    #[test]
    fn evaluate_writes_tracking_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.tracking_dir = Some(dir.path().join("runs"));
        let result = run_evaluate(&config).unwrap();
        assert_eq!(result.fold_scores.len(), 5);
        assert!(result.min <= result.mean && result.mean <= result.max);

        let run = std::fs::read_dir(dir.path().join("runs")).unwrap().next().unwrap().unwrap();
        assert!(run.path().join("metrics.json").exists());
        assert!(run.path().join("decision_tree.json").exists());
    }

    #[test]
    fn holdout_reports_square_confusion_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_holdout(&config(dir.path())).unwrap();
        assert_eq!(report.classes, vec!["false", "true"]);
        assert_eq!(report.confusion_matrix.len(), 2);
        let total: usize = report.confusion_matrix.iter().flatten().sum();
        assert_eq!(total, 14);
    }

    #[test]
    fn search_reports_failures_next_to_results() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.search = vec![
            SearchEntry::new(
                "tree",
                ModelSpec::new(ModelFamily::DecisionTree),
                ParamGrid::from([(
                    "max_depth".to_string(),
                    vec![ParamValue::Int(1), ParamValue::Int(3)],
                )]),
            ),
            SearchEntry::new(
                "broken_model",
                ModelSpec::new(ModelFamily::Knn).with_param("n_neighbors", 500i64),
                ParamGrid::new(),
            ),
        ];
        let report = run_search(&config).unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].name, "tree");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "broken_model");
        assert!(report.failures[0].error.contains("n_neighbors"));
    }

    #[test]
    fn summary_rejects_bad_significance() {
        assert!(run_summary(1000.0, 1000.0, 0.1, 0.02, 1.5).is_err());
        let summary = run_summary(1000.0, 1000.0, 0.1, 0.02, 0.05).unwrap();
        assert!(summary.power > 0.0 && summary.power < 1.0);
    }
}
