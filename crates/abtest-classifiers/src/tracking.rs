//! Experiment tracking sinks for metrics and model artifacts.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ModelSpec;
use crate::error::Result;

/// Serialized description of an evaluated model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model: ModelSpec,
    pub feature_names: Vec<String>,
    pub classes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ModelArtifact {
    pub fn new(model: ModelSpec, feature_names: Vec<String>, classes: Vec<String>) -> Self {
        ModelArtifact {
            model,
            feature_names,
            classes,
            created_at: Utc::now(),
        }
    }
}

/// Receives the scalar metrics and model artifacts of a run.
pub trait Tracker {
    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) -> Result<()>;

    fn log_model(&mut self, name: &str, artifact: &ModelArtifact) -> Result<()>;
}

/// Writes metrics and artifacts to the log.
#[derive(Debug, Default)]
pub struct LogTracker;

impl Tracker for LogTracker {
    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) -> Result<()> {
        for (name, value) in metrics {
            log::info!("metric {} = {:.6}", name, value);
        }
        Ok(())
    }

    fn log_model(&mut self, name: &str, artifact: &ModelArtifact) -> Result<()> {
        log::info!(
            "model '{}': {} with {} features",
            name,
            artifact.model.family,
            artifact.feature_names.len()
        );
        log::debug!("model '{}' artifact: {}", name, serde_json::to_string(artifact)?);
        Ok(())
    }
}

/// Stores each run in its own timestamped directory under a root.
///
/// Metrics accumulate in `metrics.json`; each model goes to `<name>.json`.
#[derive(Debug)]
pub struct JsonDirTracker {
    run_dir: PathBuf,
    metrics: BTreeMap<String, f64>,
}

impl JsonDirTracker {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let stamp = Utc::now().format("run-%Y%m%dT%H%M%S%.3fZ").to_string();
        let mut run_dir = root.as_ref().join(&stamp);
        let mut suffix = 1;
        while run_dir.exists() {
            run_dir = root.as_ref().join(format!("{}-{}", stamp, suffix));
            suffix += 1;
        }
        fs::create_dir_all(&run_dir)?;
        log::info!("Tracking run in {}", run_dir.display());
        Ok(JsonDirTracker {
            run_dir,
            metrics: BTreeMap::new(),
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

impl Tracker for JsonDirTracker {
    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) -> Result<()> {
        self.metrics
            .extend(metrics.iter().map(|(k, v)| (k.clone(), *v)));
        let file = fs::File::create(self.run_dir.join("metrics.json"))?;
        serde_json::to_writer_pretty(file, &self.metrics)?;
        Ok(())
    }

    fn log_model(&mut self, name: &str, artifact: &ModelArtifact) -> Result<()> {
        let file = fs::File::create(self.run_dir.join(format!("{}.json", name)))?;
        serde_json::to_writer_pretty(file, artifact)?;
        Ok(())
    }
}
