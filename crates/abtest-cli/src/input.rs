use anyhow::{Context, Result};
use clap::ArgMatches;
use std::path::{Path, PathBuf};

use abtest_classifiers::config::ModelingConfig;

/// Read a modeling configuration, then apply the command line overrides
/// (`data`, `target`, `seed`, `folds`) that were given.
///
/// A relative `data` path in the file is resolved against the directory of
/// the config file; a `--data` override is taken as given.
pub fn from_arguments(config_path: &Path, matches: &ArgMatches) -> Result<ModelingConfig> {
    let config_json = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
    let mut config: ModelingConfig = serde_json::from_str(&config_json)
        .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

    if config.data.is_relative() && !config.data.as_os_str().is_empty() {
        if let Some(dir) = config_path.parent() {
            config.data = dir.join(&config.data);
        }
    }
    apply_overrides(&mut config, matches);
    config.validate()?;

    if config.data.as_os_str().is_empty() {
        anyhow::bail!(
            "No input data: set \"data\" in {:?} or pass --data",
            config_path
        );
    }
    validate_tsv_or_csv_file(&config.data)?;
    Ok(config)
}

fn apply_overrides(config: &mut ModelingConfig, matches: &ArgMatches) {
    if let Some(data) = get_override::<PathBuf>(matches, "data") {
        config.data = data;
    }
    if let Some(target) = get_override::<String>(matches, "target") {
        config.target = target;
    }
    if let Some(seed) = get_override::<u64>(matches, "seed") {
        config.seed = Some(seed);
    }
    if let Some(folds) = get_override::<usize>(matches, "folds") {
        config.folds = folds;
    }
}

// Subcommands do not all define every override.
fn get_override<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Option<T> {
    matches.try_get_one::<T>(id).ok().flatten().cloned()
}

pub fn validate_tsv_or_csv_file(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    match ext.as_deref() {
        Some("tsv") | Some("csv") => {}
        _ => anyhow::bail!("File must have a .csv or .tsv extension: {:?}", path),
    }
    if !path.exists() {
        anyhow::bail!("File does not exist: {:?}", path);
    }
    Ok(())
}
