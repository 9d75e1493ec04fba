use ndarray::{Array1, Array2, Axis};

use crate::config::ParamSet;
use crate::error::Result;
use crate::models::classifier_trait::Classifier;
use crate::models::utils::{argmax, check_prediction_data, check_training_data, ParamReader};
use crate::target::Labels;

const NAME: &str = "logistic_regression";

/// Standard deviations below this leave a feature unscaled.
const MIN_STD: f64 = 1e-8;
const TOLERANCE: f64 = 1e-6;

/// L2-regularised logistic regression fit by batch gradient descent.
///
/// Features are standardised internally with statistics learned at fit time.
/// More than two classes are handled one-vs-rest.
pub struct LogisticRegression {
    c: f64,
    learning_rate: f64,
    max_iter: usize,
    mean: Array1<f64>,
    std: Array1<f64>,
    /// One (weights, bias) pair per class, or a single pair for binary targets.
    coefficients: Vec<(Array1<f64>, f64)>,
    n_classes: usize,
    n_features: Option<usize>,
}

impl LogisticRegression {
    pub const PARAMS: &'static [&'static str] = &["c", "learning_rate", "max_iter"];

    pub fn from_params(params: &ParamSet) -> Result<Self> {
        let reader = ParamReader::new(NAME, params, Self::PARAMS)?;
        Ok(LogisticRegression {
            c: reader.positive_f64("c", 1.0)?,
            learning_rate: reader.positive_f64("learning_rate", 0.5)?,
            max_iter: reader.usize_at_least("max_iter", 300, 1)?,
            mean: Array1::zeros(0),
            std: Array1::zeros(0),
            coefficients: Vec::new(),
            n_classes: 0,
            n_features: None,
        })
    }

    fn standardize(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.std
    }

    /// Fit one binary problem where `positive[i]` marks the positive rows.
    fn fit_binary(&self, x: &Array2<f64>, positive: &Array1<f64>) -> (Array1<f64>, f64) {
        let n = x.nrows() as f64;
        let mut w = Array1::zeros(x.ncols());
        let mut b = 0.0;
        for _ in 0..self.max_iter {
            let p = (x.dot(&w) + b).mapv(sigmoid);
            let residual = &p - positive;
            let grad_w = x.t().dot(&residual) / n + &w / (self.c * n);
            let grad_b = residual.sum() / n;
            w = w - &grad_w * self.learning_rate;
            b -= grad_b * self.learning_rate;

            let largest = grad_w.iter().fold(grad_b.abs(), |m, g| m.max(g.abs()));
            if largest < TOLERANCE {
                break;
            }
        }
        (w, b)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Labels) -> Result<()> {
        check_training_data(NAME, x, y)?;
        self.mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
        self.std = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s < MIN_STD { 1.0 } else { s });
        let xs = self.standardize(x);

        self.n_classes = y.n_classes();
        let one_vs = |class: usize| y.codes().mapv(|c| if c == class { 1.0 } else { 0.0 });
        self.coefficients = if self.n_classes <= 2 {
            vec![self.fit_binary(&xs, &one_vs(1))]
        } else {
            (0..self.n_classes)
                .map(|class| self.fit_binary(&xs, &one_vs(class)))
                .collect()
        };
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        check_prediction_data(NAME, x, self.n_features)?;
        let xs = self.standardize(x);
        if self.coefficients.len() == 1 {
            let (w, b) = &self.coefficients[0];
            return Ok((xs.dot(w) + *b).mapv(|z| usize::from(sigmoid(z) >= 0.5)));
        }
        let scores: Vec<Array1<f64>> = self
            .coefficients
            .iter()
            .map(|(w, b)| xs.dot(w) + *b)
            .collect();
        Ok((0..xs.nrows())
            .map(|row| argmax(&scores.iter().map(|s| s[row]).collect::<Vec<_>>()))
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

    fn labels(classes: &[&str], codes: Vec<usize>) -> Labels {
        Labels::new(classes.iter().map(|c| c.to_string()).collect(), Array1::from_vec(codes)).unwrap()
    }

    #[test]
    fn separates_a_threshold() {
        let x = array![[10.0], [20.0], [30.0], [70.0], [80.0], [90.0]];
        let y = labels(&["no", "yes"], vec![0, 0, 0, 1, 1, 1]);
        let mut model = LogisticRegression::from_params(&ParamSet::new()).unwrap();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y.codes().clone());
        assert_eq!(model.predict(&array![[0.0], [100.0]]).unwrap().to_vec(), vec![0, 1]);
    }

    #[test]
    fn one_vs_rest_for_three_classes() {
        let x = array![[0.0, 0.0], [0.1, 0.2], [5.0, 0.0], [5.2, 0.1], [0.0, 5.0], [0.2, 5.1]];
        let y = labels(&["a", "b", "c"], vec![0, 0, 1, 1, 2, 2]);
        let mut model = LogisticRegression::from_params(&ParamSet::new()).unwrap();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap().to_vec(), vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn width_mismatch_is_a_fit_failure() {
        let x = array![[0.0], [1.0]];
        let y = labels(&["a", "b"], vec![0, 1]);
        let mut model = LogisticRegression::from_params(&ParamSet::new()).unwrap();
        model.fit(&x, &y).unwrap();
        assert!(model.predict(&array![[0.0, 1.0]]).is_err());
    }
}
