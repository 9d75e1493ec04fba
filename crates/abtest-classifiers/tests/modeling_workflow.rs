use std::io::Write;

use abtest_classifiers::assembly::assemble;
use abtest_classifiers::config::{ModelFamily, ModelSpec, ParamGrid, ParamValue, SearchEntry};
use abtest_classifiers::dataset::{Column, ColumnData, Dataset};
use abtest_classifiers::encoding::{encode_one_hot, encode_ordinal, Encoding, EncodingPlan};
use abtest_classifiers::evaluation::{cross_validate, KFold};
use abtest_classifiers::io::read_delimited;
use abtest_classifiers::modeler::Modeler;
use abtest_classifiers::pipeline::{Pipeline, PipelineKind};
use abtest_classifiers::search::GridSearch;
use abtest_classifiers::ModelingError;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const CITIES: [&str; 5] = ["lagos", "nairobi", "accra", "cairo", "dakar"];

fn clicks(n: usize) -> Dataset {
    Dataset::new(vec![
        Column::integer("age", (0..n).map(|i| 18 + (i * 7 % 40) as i64).collect()),
        Column::text("city", (0..n).map(|i| CITIES[i % 5]).collect()),
        Column::boolean("clicked", (0..n).map(|i| i % 5 < 2).collect()),
    ])
    .unwrap()
}

fn ab_table() -> String {
    let mut csv = String::from("auction_id,experiment,date,hour,device_make,platform_os,browser,yes\n");
    for i in 0..60 {
        let experiment = if i % 2 == 0 { "control" } else { "exposed" };
        let browser = ["Chrome Mobile", "Facebook", "Samsung Internet"][i % 3];
        let device = if i % 7 == 0 { "" } else { "Generic Smartphone" };
        let yes = usize::from(i % 4 == 1 || i % 4 == 3);
        csv.push_str(&format!(
            "id-{},{},2020-07-0{},{},{},6,{},{}\n",
            i,
            experiment,
            3 + i % 5,
            i % 24,
            device,
            browser,
            yes
        ));
    }
    csv
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

#[test]
fn test_assembly_scenario_age_city_clicked() {
    let ds = clicks(20);
    let (x, y) = assemble(&ds, "clicked").unwrap();

    assert_eq!(x.n_cols(), 6);
    assert_eq!(x.n_rows(), 20);
    assert_eq!(x.names()[0], "age");
    assert!(x.names()[1..].iter().all(|n| n.starts_with("city_")));
    assert!(x.column_index("clicked").is_none());
    assert_eq!(y.data(), &ds.column("clicked").unwrap().data);
}

#[test]
fn test_assembled_width_matches_encoding_plan() {
    let ds = clicks(30);
    let features = ds.partition().without("clicked");
    let plan = EncodingPlan::classify(&ds, features.categorical()).unwrap();
    let one_hot_width: usize = plan
        .one_hot
        .iter()
        .map(|c| ds.column(c).unwrap().data.n_unique())
        .sum();
    let (x, _) = assemble(&ds, "clicked").unwrap();
    assert_eq!(x.n_cols(), features.numeric().len() + one_hot_width + plan.ordinal.len());
}

#[test]
fn test_assemble_missing_target() {
    let err = assemble(&clicks(5), "converted").unwrap_err();
    assert!(matches!(err, ModelingError::MissingTarget(ref t) if t == "converted"));
}

// ---------------------------------------------------------------------------
// Encoding properties
// ---------------------------------------------------------------------------

#[test]
fn test_encoding_depends_only_on_cardinality() {
    for n in 0..15 {
        let expected = if n > 2 && n <= 10 { Encoding::OneHot } else { Encoding::Ordinal };
        assert_eq!(Encoding::for_cardinality(n), expected);
    }
}

#[test]
fn test_one_hot_rows_have_single_indicator_or_none() {
    let ds = Dataset::new(vec![Column::new(
        "browser",
        ColumnData::Text(vec![Some("a".into()), Some("b".into()), None, Some("c".into())]),
    )])
    .unwrap();
    let m = encode_one_hot(&ds, &["browser".to_string()]).unwrap();
    assert_eq!(m.n_cols(), 3);
    let sums: Vec<f64> = m.values().rows().into_iter().map(|r| r.sum()).collect();
    assert_eq!(sums, vec![1.0, 1.0, 0.0, 1.0]);
}

#[test]
fn test_encoding_is_idempotent() {
    let ds = clicks(25);
    let columns = vec!["city".to_string()];
    assert_eq!(encode_one_hot(&ds, &columns).unwrap(), encode_one_hot(&ds, &columns).unwrap());
    assert_eq!(encode_ordinal(&ds, &columns).unwrap(), encode_ordinal(&ds, &columns).unwrap());

    let first = Pipeline::build(PipelineKind::Numeric).fit(&ds, &["age".to_string()]).unwrap();
    let second = Pipeline::build(PipelineKind::Numeric).fit(&ds, &["age".to_string()]).unwrap();
    assert_eq!(first.transform(&ds).unwrap(), second.transform(&ds).unwrap());
}

// ---------------------------------------------------------------------------
// Evaluation and search
// ---------------------------------------------------------------------------

#[test]
fn test_single_fold_is_invalid() {
    let ds = clicks(20);
    let modeler = Modeler::new(ds, "clicked").unwrap();
    let err = modeler
        .evaluate(&ModelSpec::default(), &KFold::shuffled(1, Some(1)))
        .unwrap_err();
    assert!(matches!(err, ModelingError::InvalidFoldCount { folds: 1, rows: 20 }));
}

#[test]
fn test_cross_validation_mean_between_min_and_max() {
    let (x, y) = assemble(&clicks(40), "clicked").unwrap();
    let y = y.labels().unwrap();
    for family in [ModelFamily::LogisticRegression, ModelFamily::GaussianNb, ModelFamily::DecisionTree] {
        for k in [2, 3, 5, 8] {
            let result = cross_validate(&ModelSpec::new(family), &x, &y, &KFold::shuffled(k, Some(9))).unwrap();
            assert_eq!(result.fold_scores.len(), k);
            assert!(result.min <= result.mean, "{} k={}", family, k);
            assert!(result.mean <= result.max, "{} k={}", family, k);
        }
    }
}

#[test]
fn test_search_keeps_going_after_broken_entry() {
    let (x, y) = assemble(&clicks(40), "clicked").unwrap();
    let y = y.labels().unwrap();

    let rf_grid: ParamGrid = [
        ("n_estimators".to_string(), vec![ParamValue::Int(5), ParamValue::Int(10)]),
        ("max_depth".to_string(), vec![ParamValue::Int(2), ParamValue::Int(4)]),
    ]
    .into_iter()
    .collect();
    let rf = SearchEntry::new(
        "rf",
        ModelSpec::new(ModelFamily::RandomForest).with_param("seed", ParamValue::Int(1)),
        rf_grid,
    );
    // more neighbours than any training fold has rows
    let broken = SearchEntry::new(
        "broken_model",
        ModelSpec::new(ModelFamily::Knn),
        [("n_neighbors".to_string(), vec![ParamValue::Int(500)])].into_iter().collect(),
    );

    let outcome = GridSearch::default().run(&[rf, broken], &x, &y).unwrap();
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].name, "rf");
    assert_eq!(outcome.results[0].n_candidates, 4);
    assert!(outcome.results[0].best_params.contains_key("seed"));

    assert_eq!(outcome.failures.len(), 1);
    match &outcome.failures[0] {
        ModelingError::SearchEntryFailure { model, source } => {
            assert_eq!(model, "broken_model");
            assert!(matches!(**source, ModelingError::FitFailure { fold: Some(_), .. }));
        }
        other => panic!("unexpected failure {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn test_modeler_on_loaded_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("AdSmartABdata.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(ab_table().as_bytes()).unwrap();

    let ds = read_delimited(&path).unwrap();
    assert_eq!(ds.n_rows(), 60);
    assert_eq!(ds.partition().numeric(), &["hour", "platform_os", "yes"]);

    let modeler = Modeler::new(ds, "yes").unwrap();
    let plan = modeler.encoding_data().unwrap();
    // auction_id is unique per row, so it is ordinal encoded
    assert!(plan.ordinal.contains(&"auction_id".to_string()));
    assert!(plan.one_hot.contains(&"browser".to_string()));
    assert!(plan.one_hot.contains(&"date".to_string()));

    let result = modeler
        .evaluate(&ModelSpec::new(ModelFamily::DecisionTree), &KFold::default())
        .unwrap();
    assert!(result.mean > 0.0);
    let metrics = result.metrics();
    assert_eq!(metrics["score"], result.mean);
}

#[test]
fn test_tsv_extension_switches_delimiter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("visits.tsv");
    std::fs::write(&path, "group\tspend\nA\t1.5\nB\t2\n").unwrap();
    let ds = read_delimited(&path).unwrap();
    assert_eq!(ds.column_names(), vec!["group", "spend"]);
    assert_eq!(ds.partition().numeric(), &["spend"]);
}
