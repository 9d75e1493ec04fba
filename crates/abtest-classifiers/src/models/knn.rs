use ndarray::{Array1, Array2};

use crate::config::ParamSet;
use crate::error::{ModelingError, Result};
use crate::models::classifier_trait::Classifier;
use crate::models::utils::{argmax, check_prediction_data, check_training_data, ParamReader};
use crate::target::Labels;

const NAME: &str = "knn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Weighting {
    Uniform,
    Distance,
}

/// Euclidean k-nearest-neighbours classifier.
pub struct KNearestNeighbors {
    n_neighbors: usize,
    weights: Weighting,
    x: Array2<f64>,
    y: Array1<usize>,
    n_classes: usize,
}

impl KNearestNeighbors {
    pub const PARAMS: &'static [&'static str] = &["n_neighbors", "weights"];

    pub fn from_params(params: &ParamSet) -> Result<Self> {
        let reader = ParamReader::new(NAME, params, Self::PARAMS)?;
        let weights = match reader.choice("weights", "uniform", &["uniform", "distance"])? {
            "distance" => Weighting::Distance,
            _ => Weighting::Uniform,
        };
        Ok(KNearestNeighbors {
            n_neighbors: reader.usize_at_least("n_neighbors", 5, 1)?,
            weights,
            x: Array2::zeros((0, 0)),
            y: Array1::zeros(0),
            n_classes: 0,
        })
    }

    fn vote(&self, row: ndarray::ArrayView1<f64>) -> usize {
        let mut distances: Vec<(f64, usize)> = self
            .x
            .rows()
            .into_iter()
            .zip(self.y.iter())
            .map(|(train, &label)| {
                let d = train
                    .iter()
                    .zip(row.iter())
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt();
                (d, label)
            })
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0));

        let neighbors = &distances[..self.n_neighbors];
        // an exact match outweighs everything else under distance weighting
        if self.weights == Weighting::Distance {
            if let Some(&(_, label)) = neighbors.iter().find(|(d, _)| *d == 0.0) {
                return label;
            }
        }
        let mut votes = vec![0.0; self.n_classes];
        for &(d, label) in neighbors {
            votes[label] += match self.weights {
                Weighting::Uniform => 1.0,
                Weighting::Distance => 1.0 / d,
            };
        }
        argmax(&votes)
    }
}

impl Classifier for KNearestNeighbors {
    fn fit(&mut self, x: &Array2<f64>, y: &Labels) -> Result<()> {
        check_training_data(NAME, x, y)?;
        if x.nrows() < self.n_neighbors {
            return Err(ModelingError::fit(
                NAME,
                format!(
                    "n_neighbors = {} exceeds the {} training rows",
                    self.n_neighbors,
                    x.nrows()
                ),
            ));
        }
        self.x = x.to_owned();
        self.y = y.codes().clone();
        self.n_classes = y.n_classes();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let fitted = (!self.y.is_empty()).then_some(self.x.ncols());
        check_prediction_data(NAME, x, fitted)?;
        Ok(x.rows().into_iter().map(|row| self.vote(row)).collect())
    }

    fn name(&self) -> &str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParamValue;
    use ndarray::array;

    fn two_clusters() -> (Array2<f64>, Labels) {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [9.0, 9.0], [9.0, 8.0], [8.0, 9.0]];
        let y = Labels::new(vec!["a".into(), "b".into()], array![0, 0, 0, 1, 1, 1]).unwrap();
        (x, y)
    }

    #[test]
    fn majority_vote_of_neighbours() {
        let (x, y) = two_clusters();
        let params = ParamSet::from([("n_neighbors".to_string(), ParamValue::Int(3))]);
        let mut model = KNearestNeighbors::from_params(&params).unwrap();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&array![[0.5, 0.5], [8.5, 8.5]]).unwrap().to_vec(), vec![0, 1]);
    }

    #[test]
    fn distance_weighting_returns_exact_match() {
        let (x, y) = two_clusters();
        let params = ParamSet::from([
            ("n_neighbors".to_string(), ParamValue::Int(6)),
            ("weights".to_string(), ParamValue::from("distance")),
        ]);
        let mut model = KNearestNeighbors::from_params(&params).unwrap();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y.codes().clone());
    }

    #[test]
    fn too_few_rows_is_a_fit_failure() {
        let (x, y) = two_clusters();
        let params = ParamSet::from([("n_neighbors".to_string(), ParamValue::Int(50))]);
        let mut model = KNearestNeighbors::from_params(&params).unwrap();
        let err = model.fit(&x, &y).unwrap_err();
        assert!(matches!(err, ModelingError::FitFailure { .. }));
        assert!(err.to_string().contains("n_neighbors = 50"));
    }
}
