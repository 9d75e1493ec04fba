//! Classification scores.
use ndarray::{Array1, Array2};

use crate::error::{ModelingError, Result};

/// Confusion matrix with true classes on rows and predicted classes on columns.
pub fn confusion_matrix(
    y_true: &Array1<usize>,
    y_pred: &Array1<usize>,
    n_classes: usize,
) -> Result<Array2<usize>> {
    check_lengths(y_true, y_pred)?;
    let mut matrix = Array2::zeros((n_classes, n_classes));
    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        if t >= n_classes || p >= n_classes {
            return Err(ModelingError::ShapeMismatch(format!(
                "class code out of range for {} classes",
                n_classes
            )));
        }
        matrix[(t, p)] += 1;
    }
    Ok(matrix)
}

/// Share of predictions equal to the true class.
pub fn accuracy(y_true: &Array1<usize>, y_pred: &Array1<usize>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    if y_true.is_empty() {
        return Err(ModelingError::ShapeMismatch(
            "accuracy of an empty prediction set".to_string(),
        ));
    }
    let correct = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

fn check_lengths(y_true: &Array1<usize>, y_pred: &Array1<usize>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(ModelingError::ShapeMismatch(format!(
            "{} true labels but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    Ok(())
}
