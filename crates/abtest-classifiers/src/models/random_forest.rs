use ndarray::{Array1, Array2};
use rand::{Rng, RngCore};
use rayon::prelude::*;

use crate::config::ParamSet;
use crate::error::Result;
use crate::models::classifier_trait::Classifier;
use crate::models::decision_tree::{Tree, TreeParams};
use crate::models::utils::{argmax, check_prediction_data, check_training_data, ParamReader};
use crate::split::rng_from;
use crate::target::Labels;

const NAME: &str = "random_forest";

/// Bootstrap-aggregated CART trees with per-split feature subsampling.
///
/// Tree `i` is grown from its own generator seeded with `seed + i`, so a
/// seeded forest is identical whether trees are grown in parallel or not.
pub struct RandomForest {
    n_estimators: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    seed: Option<u64>,
    trees: Vec<Tree>,
    n_classes: usize,
    n_features: Option<usize>,
}

impl RandomForest {
    pub const PARAMS: &'static [&'static str] =
        &["n_estimators", "max_depth", "min_samples_split", "seed"];

    pub fn from_params(params: &ParamSet) -> Result<Self> {
        let reader = ParamReader::new(NAME, params, Self::PARAMS)?;
        Ok(RandomForest {
            n_estimators: reader.usize_at_least("n_estimators", 100, 1)?,
            max_depth: reader.optional_usize("max_depth")?,
            min_samples_split: reader.usize_at_least("min_samples_split", 2, 2)?,
            seed: reader.optional_u64("seed")?,
            trees: Vec::new(),
            n_classes: 0,
            n_features: None,
        })
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Labels) -> Result<()> {
        check_training_data(NAME, x, y)?;
        let n_rows = x.nrows();
        let tree_params = TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            max_features: Some(((x.ncols() as f64).sqrt().ceil() as usize).max(1)),
        };
        let base_seed = self
            .seed
            .unwrap_or_else(|| rng_from(None).next_u64());
        let codes = y.codes().to_vec();
        let n_classes = y.n_classes();

        self.trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = rng_from(Some(base_seed.wrapping_add(i as u64)));
                let bootstrap: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
                Tree::grow(x, &codes, &bootstrap, n_classes, &tree_params, &mut rng)
            })
            .collect();
        log::trace!("Grew {} trees on {} rows", self.trees.len(), n_rows);

        self.n_classes = n_classes;
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        check_prediction_data(NAME, x, self.n_features)?;
        Ok(x
            .rows()
            .into_iter()
            .map(|row| {
                let mut votes = vec![0.0; self.n_classes];
                for tree in &self.trees {
                    votes[tree.predict_row(row)] += 1.0;
                }
                argmax(&votes)
            })
            .collect())
    }

    fn name(&self) -> &str {
        NAME
    }
}
