use ndarray::{Array1, Array2};

use crate::error::Result;
use crate::target::Labels;

/// Contract shared by every model family.
///
/// A classifier is fit on a numeric feature matrix and integer class codes
/// and predicts class codes for new rows. Models are created fresh for every
/// fit (one per fold, one per grid candidate) and never shared between fits.
pub trait Classifier: Send {
    /// Fit the model. Codes in `y` lie in `0..y.n_classes()`.
    fn fit(&mut self, x: &Array2<f64>, y: &Labels) -> Result<()>;

    /// Predict one class code per row of `x`.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>>;

    /// Human readable name used in logs and errors.
    fn name(&self) -> &str {
        "classifier"
    }
}
