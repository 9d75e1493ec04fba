use crate::config::{ModelFamily, ModelSpec};
use crate::error::Result;
use crate::models::classifier_trait::Classifier;
use crate::models::decision_tree::DecisionTree;
use crate::models::gbdt::GBDTClassifier;
use crate::models::knn::KNearestNeighbors;
use crate::models::logistic::LogisticRegression;
use crate::models::naive_bayes::GaussianNB;
use crate::models::random_forest::RandomForest;

/// Build an unfitted classifier from a `ModelSpec`.
///
/// Fails with `InvalidParameter` when a parameter is unknown to the family or
/// has the wrong type or range.
pub fn build_model(spec: &ModelSpec) -> Result<Box<dyn Classifier>> {
    let params = &spec.params;
    Ok(match spec.family {
        ModelFamily::Gbdt => Box::new(GBDTClassifier::from_params(params)?),
        ModelFamily::LogisticRegression => Box::new(LogisticRegression::from_params(params)?),
        ModelFamily::Knn => Box::new(KNearestNeighbors::from_params(params)?),
        ModelFamily::GaussianNb => Box::new(GaussianNB::from_params(params)?),
        ModelFamily::DecisionTree => Box::new(DecisionTree::from_params(params)?),
        ModelFamily::RandomForest => Box::new(RandomForest::from_params(params)?),
    })
}

/// Parameter names accepted by a family.
pub fn known_params(family: ModelFamily) -> &'static [&'static str] {
    match family {
        ModelFamily::Gbdt => GBDTClassifier::PARAMS,
        ModelFamily::LogisticRegression => LogisticRegression::PARAMS,
        ModelFamily::Knn => KNearestNeighbors::PARAMS,
        ModelFamily::GaussianNb => GaussianNB::PARAMS,
        ModelFamily::DecisionTree => DecisionTree::PARAMS,
        ModelFamily::RandomForest => RandomForest::PARAMS,
    }
}
