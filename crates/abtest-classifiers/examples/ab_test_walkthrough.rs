//! Walk through the modeling workflow on a synthetic A/B table.
//!
//! Run with `cargo run --example ab_test_walkthrough -- path/to/data.csv` to
//! use a real file; without an argument a synthetic table is generated.
use std::error::Error;

use abtest_classifiers::config::{ModelFamily, ModelSpec, ParamValue, SearchEntry};
use abtest_classifiers::dataset::{Column, Dataset};
use abtest_classifiers::evaluation::KFold;
use abtest_classifiers::io::read_delimited;
use abtest_classifiers::modeler::Modeler;
use abtest_classifiers::search::GridSearch;
use abtest_classifiers::stats::AbTestSummary;

fn synthetic(n: usize) -> Result<Dataset, Box<dyn Error>> {
    let browsers = ["Chrome Mobile", "Facebook", "Samsung Internet", "Mobile Safari"];
    Ok(Dataset::new(vec![
        Column::text(
            "experiment",
            (0..n).map(|i| if i % 2 == 0 { "control" } else { "exposed" }).collect(),
        ),
        Column::integer("hour", (0..n).map(|i| (i * 5 % 24) as i64).collect()),
        Column::text("browser", (0..n).map(|i| browsers[i % 4]).collect()),
        Column::integer("yes", (0..n).map(|i| i64::from(i % 3 == 0 || i % 2 == 1)).collect()),
    ])?)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let dataset = match std::env::args().nth(1) {
        Some(path) => read_delimited(path)?,
        None => synthetic(400)?,
    };
    let modeler = Modeler::new(dataset, "yes")?;

    let spec = ModelSpec::new(ModelFamily::LogisticRegression);
    let holdout = modeler.fit_holdout(&spec, 0.33, Some(1))?;
    println!("holdout accuracy: {:.4}", holdout.accuracy);
    println!("confusion matrix ({:?}):\n{}", holdout.classes, holdout.confusion_matrix);

    let cv = modeler.evaluate(&spec, &KFold::default())?;
    println!("cross-validation: {:?}", cv.metrics());

    let entries = vec![
        SearchEntry::new(
            "decision_tree",
            ModelSpec::new(ModelFamily::DecisionTree),
            [("max_depth".to_string(), vec![ParamValue::Int(2), ParamValue::Int(4)])]
                .into_iter()
                .collect(),
        ),
        SearchEntry::new(
            "knn",
            ModelSpec::new(ModelFamily::Knn),
            [("n_neighbors".to_string(), vec![ParamValue::Int(3), ParamValue::Int(7)])]
                .into_iter()
                .collect(),
        ),
    ];
    let outcome = modeler.hyperparameters(&entries, &GridSearch::default(), 0.33, Some(1))?;
    for result in &outcome.results {
        println!("{}: best score {:.4} with {:?}", result.name, result.best_score, result.best_params);
    }
    for failure in &outcome.failures {
        println!("search failed: {}", failure);
    }

    let summary = AbTestSummary::new(4000.0, 4000.0, 0.11, 0.03, 0.05)?;
    println!(
        "A/B test: stderr {:.5}, power {:.4}, p-value {:.4}",
        summary.stderr, summary.power, summary.p_value
    );
    Ok(())
}
