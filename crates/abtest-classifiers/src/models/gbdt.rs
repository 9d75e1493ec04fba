use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::{Array1, Array2};

use crate::config::ParamSet;
use crate::error::{ModelingError, Result};
use crate::models::classifier_trait::Classifier;
use crate::models::utils::{check_prediction_data, check_training_data, ParamReader};
use crate::target::Labels;

const NAME: &str = "gbdt";

/// Gradient Boosting Decision Tree (GBDT) classifier, binary targets only.
pub struct GBDTClassifier {
    model: Option<GBDT>,
    n_features: Option<usize>,
    learning_rate: f64,
    max_depth: u32,
    num_boost_round: usize,
    min_leaf_size: usize,
}

impl GBDTClassifier {
    pub const PARAMS: &'static [&'static str] =
        &["learning_rate", "max_depth", "num_boost_round", "min_leaf_size"];

    pub fn from_params(params: &ParamSet) -> Result<Self> {
        let reader = ParamReader::new(NAME, params, Self::PARAMS)?;
        let max_depth = reader.usize_at_least("max_depth", 6, 1)?;
        Ok(GBDTClassifier {
            model: None,
            n_features: None,
            learning_rate: reader.positive_f64("learning_rate", 0.1)?,
            max_depth: u32::try_from(max_depth)
                .map_err(|_| ModelingError::invalid_param(NAME, "max_depth", "too large"))?,
            num_boost_round: reader.usize_at_least("num_boost_round", 50, 1)?,
            min_leaf_size: reader.usize_at_least("min_leaf_size", 1, 1)?,
        })
    }

    fn to_data(x: &Array2<f64>, labels: Option<&Array1<usize>>) -> DataVec {
        x.rows()
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let features = row.iter().map(|v| *v as f32).collect();
                match labels {
                    // LogLikelyhood expects labels in {-1, 1}
                    Some(codes) => {
                        let label = if codes[i] == 1 { 1.0 } else { -1.0 };
                        Data::new_training_data(features, 1.0, label, None)
                    }
                    None => Data::new_test_data(features, None),
                }
            })
            .collect()
    }
}

impl Classifier for GBDTClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Labels) -> Result<()> {
        check_training_data(NAME, x, y)?;
        if y.n_classes() > 2 {
            return Err(ModelingError::fit(
                NAME,
                format!("only binary targets are supported, got {} classes", y.n_classes()),
            ));
        }

        let mut config = Config::new();
        config.set_feature_size(x.ncols());
        config.set_shrinkage(self.learning_rate as f32);
        config.set_max_depth(self.max_depth);
        config.set_iterations(self.num_boost_round);
        config.set_min_leaf_size(self.min_leaf_size);
        config.set_debug(false);
        config.set_loss("LogLikelyhood");

        let mut gbdt = GBDT::new(&config);
        let mut train_x = Self::to_data(x, Some(y.codes()));
        gbdt.fit(&mut train_x);

        self.model = Some(gbdt);
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        check_prediction_data(NAME, x, self.n_features)?;
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| ModelingError::fit(NAME, "model used before fit"))?;
        let probabilities = model.predict(&Self::to_data(x, None));
        Ok(probabilities
            .into_iter()
            .map(|p| usize::from(p >= 0.5))
            .collect())
    }

    fn name(&self) -> &str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParamValue;

    #[test]
    fn test_gbdt_classifier() {
        // the label follows the sign of the second feature
        let x = Array2::from_shape_vec(
            (10, 3),
            vec![
                0.1, 1.0, 5.0, 0.4, -1.0, 5.0, 0.6, 1.0, 5.0, 0.9, -1.0, 5.0, 1.2, 1.0, 5.0, 1.5,
                -1.0, 5.0, 1.8, 1.0, 5.0, 2.1, -1.0, 5.0, 2.4, 1.0, 5.0, 2.7, -1.0, 5.0,
            ],
        )
        .unwrap();
        let codes: Array1<usize> = (0..10).map(|i| usize::from(i % 2 == 0)).collect();
        let y = Labels::new(vec!["false".into(), "true".into()], codes).unwrap();

        let params = ParamSet::from([
            ("max_depth".to_string(), ParamValue::Int(3)),
            ("num_boost_round".to_string(), ParamValue::Int(20)),
        ]);
        let mut classifier = GBDTClassifier::from_params(&params).unwrap();
        classifier.fit(&x, &y).unwrap();

        let predictions = classifier.predict(&x).unwrap();
        assert_eq!(predictions.len(), 10);
        assert!(predictions.iter().all(|p| *p <= 1));
    }

    #[test]
    fn multi_class_target_is_a_fit_failure() {
        let x = Array2::zeros((3, 1));
        let y = Labels::new(
            vec!["a".into(), "b".into(), "c".into()],
            Array1::from_vec(vec![0, 1, 2]),
        )
        .unwrap();
        let mut classifier = GBDTClassifier::from_params(&ParamSet::new()).unwrap();
        let err = classifier.fit(&x, &y).unwrap_err();
        assert!(matches!(err, ModelingError::FitFailure { ref model, .. } if model == "gbdt"));
    }
}
