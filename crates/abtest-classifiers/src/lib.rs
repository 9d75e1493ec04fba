//! abtest-classifiers: feature engineering and model evaluation for A/B-test
//! experiment tables.
//!
//! A raw table ([`dataset::Dataset`]) is partitioned into numeric and
//! categorical columns, categorical columns are one-hot or ordinal encoded by
//! cardinality, and the result is assembled into a numeric feature matrix and
//! a target vector. Classifiers from several families are then scored on a
//! holdout split, under k-fold cross-validation, or compared by grid search.
//!
//! The [`modeler::Modeler`] facade strings these steps together. Loading
//! delimited files, experiment tracking sinks and the A/B test statistics
//! used for plotting live in [`io`], [`tracking`] and [`stats`].
pub mod assembly;
pub mod config;
pub mod dataset;
pub mod encoding;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod io;
pub mod matrix;
pub mod metrics;
pub mod modeler;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod split;
pub mod stats;
pub mod target;
pub mod tracking;

pub use error::{ModelingError, Result};
