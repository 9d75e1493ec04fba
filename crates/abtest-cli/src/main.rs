use anyhow::Result;
use clap::{Arg, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use serde::Serialize;
use std::path::PathBuf;

use abtest_classifiers::config::format_params;
use abtest_cli::input::from_arguments;
use abtest_cli::runner::{run_evaluate, run_holdout, run_search, run_summary};

fn config_arg() -> Arg {
    Arg::new("config")
        .help("Path to the modeling JSON configuration file")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn data_overrides(command: Command) -> Command {
    command
        .arg(
            Arg::new("data")
                .short('d')
                .long("data")
                .help(
                    "Path to the input data (*.csv or *.tsv). \
                     Overrides the data file specified in the configuration file.",
                )
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("target")
                .short('t')
                .long("target")
                .help("Name of the target column. Overrides the configuration file.")
                .value_parser(clap::builder::NonEmptyStringValueParser::new()),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Seed for shuffling and splitting. Overrides the configuration file.")
                .value_parser(clap::value_parser!(u64)),
        )
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("ABTEST_LOG", "error,abtest=info"))
        .init();

    let matches = Command::new("abtest")
        .version(clap::crate_version!())
        .about("A/B test feature engineering and classifier evaluation")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(data_overrides(
            Command::new("evaluate")
                .about("Cross-validate the configured model with k folds")
                .arg(config_arg())
                .arg(
                    Arg::new("folds")
                        .help("Number of folds. Overrides the configuration file (default 5).")
                        .required(false)
                        .value_parser(clap::value_parser!(usize)),
                ),
        ))
        .subcommand(data_overrides(
            Command::new("holdout")
                .about("Fit on a train split and report the confusion matrix of the test split")
                .arg(config_arg()),
        ))
        .subcommand(data_overrides(
            Command::new("search")
                .about("Grid search every entry of the configuration's search list")
                .arg(config_arg())
                .arg(
                    Arg::new("folds")
                        .short('k')
                        .long("folds")
                        .help("Number of cross-validation folds per candidate.")
                        .value_parser(clap::value_parser!(usize)),
                ),
        ))
        .subcommand(
            Command::new("summary")
                .about("Power, p-value and null/alternative distributions of an A/B test")
                .arg(
                    Arg::new("n_a")
                        .long("n-a")
                        .help("Control group size")
                        .required(true)
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("n_b")
                        .long("n-b")
                        .help("Test group size")
                        .required(true)
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("bcr")
                        .long("bcr")
                        .help("Baseline conversion rate of the control group")
                        .required(true)
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("d_hat")
                        .long("d-hat")
                        .help("Observed difference between the test and control rates")
                        .required(true)
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("sig_level")
                        .long("sig-level")
                        .help("Significance level")
                        .default_value("0.05")
                        .value_parser(clap::value_parser!(f64)),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("evaluate", sub_m)) => handle_evaluate(sub_m),
        Some(("holdout", sub_m)) => handle_holdout(sub_m),
        Some(("search", sub_m)) => handle_search(sub_m),
        Some(("summary", sub_m)) => handle_summary(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn config_path(matches: &ArgMatches) -> &PathBuf {
    matches
        .get_one::<PathBuf>("config")
        .unwrap_or_else(|| unreachable!("config is a required argument"))
}

fn handle_evaluate(matches: &ArgMatches) -> Result<()> {
    let config_path = config_path(matches);
    log::info!("[abtest::evaluate] Using config: {:?}", config_path);
    let config = from_arguments(config_path, matches)?;

    match run_evaluate(&config) {
        Ok(result) => print_json(&result),
        Err(e) => {
            log::error!("Evaluation failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_holdout(matches: &ArgMatches) -> Result<()> {
    let config_path = config_path(matches);
    log::info!("[abtest::holdout] Using config: {:?}", config_path);
    let config = from_arguments(config_path, matches)?;

    match run_holdout(&config) {
        Ok(report) => print_json(&report),
        Err(e) => {
            log::error!("Holdout evaluation failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_search(matches: &ArgMatches) -> Result<()> {
    let config_path = config_path(matches);
    log::info!("[abtest::search] Using config: {:?}", config_path);
    let config = from_arguments(config_path, matches)?;

    match run_search(&config) {
        Ok(report) => {
            for result in &report.results {
                log::info!(
                    "{} ({}): best score {:.4} with {}",
                    result.name,
                    result.family,
                    result.best_score,
                    format_params(&result.best_params)
                );
            }
            print_json(&report)?;
            if !report.failures.is_empty() {
                log::error!(
                    "{} of {} search entries failed",
                    report.failures.len(),
                    config.search.len()
                );
                std::process::exit(2)
            }
            Ok(())
        }
        Err(e) => {
            log::error!("Search failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_summary(matches: &ArgMatches) -> Result<()> {
    let value = |id: &str| -> f64 {
        matches
            .get_one::<f64>(id)
            .copied()
            .unwrap_or_else(|| unreachable!("{} is required or defaulted", id))
    };

    match run_summary(
        value("n_a"),
        value("n_b"),
        value("bcr"),
        value("d_hat"),
        value("sig_level"),
    ) {
        Ok(summary) => print_json(&summary),
        Err(e) => {
            log::error!("Summary failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
