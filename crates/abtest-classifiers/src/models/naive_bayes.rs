use ndarray::{Array1, Array2, Axis};

use crate::config::ParamSet;
use crate::error::Result;
use crate::models::classifier_trait::Classifier;
use crate::models::utils::{argmax, check_prediction_data, check_training_data, class_counts, ParamReader};
use crate::target::Labels;

const NAME: &str = "gaussian_nb";

/// Gaussian naive Bayes.
///
/// Variances are inflated by `var_smoothing` times the largest feature
/// variance so constant features do not produce zero-width likelihoods.
pub struct GaussianNB {
    var_smoothing: f64,
    /// Per-class log prior; classes absent from training stay at `-inf`.
    log_prior: Vec<f64>,
    means: Array2<f64>,
    variances: Array2<f64>,
    n_features: Option<usize>,
}

impl GaussianNB {
    pub const PARAMS: &'static [&'static str] = &["var_smoothing"];

    pub fn from_params(params: &ParamSet) -> Result<Self> {
        let reader = ParamReader::new(NAME, params, Self::PARAMS)?;
        Ok(GaussianNB {
            var_smoothing: reader.positive_f64("var_smoothing", 1e-9)?,
            log_prior: Vec::new(),
            means: Array2::zeros((0, 0)),
            variances: Array2::zeros((0, 0)),
            n_features: None,
        })
    }

    fn joint_log_likelihood(&self, row: ndarray::ArrayView1<f64>) -> Vec<f64> {
        self.log_prior
            .iter()
            .enumerate()
            .map(|(class, prior)| {
                if prior.is_infinite() {
                    return f64::NEG_INFINITY;
                }
                let mean = self.means.row(class);
                let var = self.variances.row(class);
                let log_likelihood: f64 = row
                    .iter()
                    .zip(mean.iter().zip(var.iter()))
                    .map(|(x, (m, v))| {
                        -0.5 * (2.0 * std::f64::consts::PI * v).ln() - (x - m).powi(2) / (2.0 * v)
                    })
                    .sum();
                prior + log_likelihood
            })
            .collect()
    }
}

impl Classifier for GaussianNB {
    fn fit(&mut self, x: &Array2<f64>, y: &Labels) -> Result<()> {
        check_training_data(NAME, x, y)?;
        let n_classes = y.n_classes();
        let counts = class_counts(y.codes().iter().copied(), n_classes);
        let epsilon = self.var_smoothing
            * x.var_axis(Axis(0), 0.0)
                .iter()
                .fold(0.0_f64, |m, v| m.max(*v))
                .max(1.0);

        self.means = Array2::zeros((n_classes, x.ncols()));
        self.variances = Array2::from_elem((n_classes, x.ncols()), epsilon);
        self.log_prior = vec![f64::NEG_INFINITY; n_classes];
        for class in 0..n_classes {
            if counts[class] == 0 {
                continue;
            }
            let rows: Vec<usize> = (0..x.nrows()).filter(|&i| y.codes()[i] == class).collect();
            let subset = x.select(Axis(0), &rows);
            if let Some(mean) = subset.mean_axis(Axis(0)) {
                self.means.row_mut(class).assign(&mean);
            }
            let var = subset.var_axis(Axis(0), 0.0) + epsilon;
            self.variances.row_mut(class).assign(&var);
            self.log_prior[class] = (counts[class] as f64 / x.nrows() as f64).ln();
        }
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        check_prediction_data(NAME, x, self.n_features)?;
        Ok(x
            .rows()
            .into_iter()
            .map(|row| argmax(&self.joint_log_likelihood(row)))
            .collect())
    }

    fn name(&self) -> &str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn separates_gaussian_blobs() {
        let x = array![[1.0, 2.0], [1.2, 1.8], [0.8, 2.1], [6.0, 7.0], [6.3, 6.8], [5.9, 7.2]];
        let y = Labels::new(vec!["a".into(), "b".into()], array![0, 0, 0, 1, 1, 1]).unwrap();
        let mut model = GaussianNB::from_params(&ParamSet::new()).unwrap();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y.codes().clone());
        assert_eq!(model.predict(&array![[6.1, 7.1]]).unwrap().to_vec(), vec![1]);
    }

    #[test]
    fn constant_feature_does_not_break_prediction() {
        let x = array![[1.0, 0.0], [1.0, 1.0], [1.0, 5.0], [1.0, 6.0]];
        let y = Labels::new(vec!["a".into(), "b".into(), "c".into()], array![0, 0, 1, 1]).unwrap();
        let mut model = GaussianNB::from_params(&ParamSet::new()).unwrap();
        model.fit(&x, &y).unwrap();
        // class "c" never appears in training and is never predicted
        assert_eq!(model.predict(&x).unwrap().to_vec(), vec![0, 0, 1, 1]);
    }
}
