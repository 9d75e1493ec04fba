use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::index::sample;

use crate::config::ParamSet;
use crate::error::Result;
use crate::models::classifier_trait::Classifier;
use crate::models::utils::{argmax, check_prediction_data, check_training_data, class_counts, ParamReader};
use crate::split::rng_from;
use crate::target::Labels;

const NAME: &str = "decision_tree";

/// Growth limits shared by single trees and forests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Features drawn at random for every split; `None` considers them all.
    pub max_features: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        class: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A CART tree split on Gini impurity, stored as a flat node list.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tree {
    nodes: Vec<Node>,
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| (c as f64 / total).powi(2))
        .sum::<f64>()
}

struct Grower<'a> {
    x: &'a Array2<f64>,
    y: &'a [usize],
    n_classes: usize,
    params: &'a TreeParams,
    rng: &'a mut StdRng,
    nodes: Vec<Node>,
}

/// A node slot waiting to be filled from `rows`.
struct Pending {
    index: usize,
    rows: Vec<usize>,
    depth: usize,
}

impl Grower<'_> {
    /// Grow from `rows` with an explicit work stack; tree depth is bounded
    /// only by the data when `max_depth` is unset.
    fn grow(&mut self, rows: Vec<usize>) {
        let root = self.push(Node::Leaf { class: 0 });
        let mut stack = vec![Pending {
            index: root,
            rows,
            depth: 0,
        }];
        while let Some(Pending { index, rows, depth }) = stack.pop() {
            let counts = class_counts(rows.iter().map(|&r| self.y[r]), self.n_classes);
            let majority = argmax(&counts.iter().map(|&c| c as f64).collect::<Vec<_>>());
            self.nodes[index] = Node::Leaf { class: majority };

            let depth_reached = self.params.max_depth.map_or(false, |d| depth >= d);
            if depth_reached
                || rows.len() < self.params.min_samples_split
                || gini(&counts, rows.len()) == 0.0
            {
                continue;
            }
            let Some((feature, threshold)) = self.best_split(&rows) else {
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .iter()
                .partition(|&&r| self.x[(r, feature)] <= threshold);
            let left = self.push(Node::Leaf { class: majority });
            let right = self.push(Node::Leaf { class: majority });
            self.nodes[index] = Node::Split {
                feature,
                threshold,
                left,
                right,
            };
            stack.push(Pending {
                index: right,
                rows: right_rows,
                depth: depth + 1,
            });
            stack.push(Pending {
                index: left,
                rows: left_rows,
                depth: depth + 1,
            });
        }
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let n_features = self.x.ncols();
        match self.params.max_features {
            Some(k) if k < n_features => sample(&mut *self.rng, n_features, k).into_vec(),
            _ => (0..n_features).collect(),
        }
    }

    /// Feature and threshold with the lowest weighted child impurity. `None`
    /// when every candidate feature is constant over `rows`.
    fn best_split(&mut self, rows: &[usize]) -> Option<(usize, f64)> {
        let n = rows.len();
        let mut best: Option<(usize, f64, f64)> = None;
        for feature in self.candidate_features() {
            let mut sorted: Vec<(f64, usize)> = rows
                .iter()
                .map(|&r| (self.x[(r, feature)], self.y[r]))
                .collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = vec![0usize; self.n_classes];
            let mut right = class_counts(sorted.iter().map(|s| s.1), self.n_classes);
            for i in 0..n - 1 {
                let (value, class) = sorted[i];
                left[class] += 1;
                right[class] -= 1;
                let next = sorted[i + 1].0;
                if next <= value {
                    continue;
                }
                let n_left = i + 1;
                let score = (n_left as f64 * gini(&left, n_left)
                    + (n - n_left) as f64 * gini(&right, n - n_left))
                    / n as f64;
                if best.map_or(true, |(_, _, s)| score < s) {
                    best = Some((feature, (value + next) / 2.0, score));
                }
            }
        }
        best.map(|(feature, threshold, _)| (feature, threshold))
    }
}

impl Tree {
    /// Grow a tree on the given `rows` of `x` (rows may repeat).
    pub(crate) fn grow(
        x: &Array2<f64>,
        y: &[usize],
        rows: &[usize],
        n_classes: usize,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Tree {
        let mut grower = Grower {
            x,
            y,
            n_classes,
            params,
            rng,
            nodes: Vec::new(),
        };
        grower.grow(rows.to_vec());
        Tree {
            nodes: grower.nodes,
        }
    }

    pub(crate) fn predict_row(&self, row: ArrayView1<f64>) -> usize {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { class } => return *class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub(crate) fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((index, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Node::Split { left, right, .. } = &self.nodes[index] {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        deepest
    }
}

/// Single CART classification tree.
pub struct DecisionTree {
    params: TreeParams,
    tree: Option<Tree>,
    n_features: Option<usize>,
}

impl DecisionTree {
    pub const PARAMS: &'static [&'static str] = &["max_depth", "min_samples_split"];

    pub fn from_params(params: &ParamSet) -> Result<Self> {
        let reader = ParamReader::new(NAME, params, Self::PARAMS)?;
        Ok(DecisionTree {
            params: TreeParams {
                max_depth: reader.optional_usize("max_depth")?,
                min_samples_split: reader.usize_at_least("min_samples_split", 2, 2)?,
                max_features: None,
            },
            tree: None,
            n_features: None,
        })
    }
}

impl Classifier for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Labels) -> Result<()> {
        check_training_data(NAME, x, y)?;
        let rows: Vec<usize> = (0..x.nrows()).collect();
        let codes = y.codes().to_vec();
        // every feature is considered, so the generator is never drawn from
        let mut rng = rng_from(Some(0));
        let tree = Tree::grow(x, &codes, &rows, y.n_classes(), &self.params, &mut rng);
        log::trace!("Grew decision tree of depth {}", tree.depth());
        self.tree = Some(tree);
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        check_prediction_data(NAME, x, self.n_features)?;
        let Some(tree) = &self.tree else {
            return Ok(Array1::zeros(0));
        };
        Ok(x.rows().into_iter().map(|row| tree.predict_row(row)).collect())
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

    fn xor() -> (Array2<f64>, Labels) {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0], [0.1, 0.1], [0.9, 0.9]];
        let y = Labels::new(vec!["a".into(), "b".into()], array![0, 1, 1, 0, 0, 0]).unwrap();
        (x, y)
    }

    #[test]
    fn unlimited_tree_memorises_training_data() {
        let (x, y) = xor();
        let mut model = DecisionTree::from_params(&ParamSet::new()).unwrap();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y.codes().clone());
    }

    #[test]
    fn max_depth_limits_growth() {
        let (x, y) = xor();
        let params = ParamSet::from([("max_depth".to_string(), ParamValue::Int(1))]);
        let mut model = DecisionTree::from_params(&params).unwrap();
        model.fit(&x, &y).unwrap();
        assert!(model.tree.as_ref().unwrap().depth() <= 1);
    }

    #[test]
    fn alternating_labels_grow_a_deep_tree() {
        // every best split peels off a single row, so depth grows with n
        let n = 20_000;
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f64);
        let codes: Array1<usize> = (0..n).map(|i| i % 2).collect();
        let y = Labels::new(vec!["a".into(), "b".into()], codes).unwrap();

        let mut model = DecisionTree::from_params(&ParamSet::new()).unwrap();
        model.fit(&x, &y).unwrap();
        assert!(model.tree.as_ref().unwrap().depth() > 1_000);
        let head = x.slice(ndarray::s![..100, ..]).to_owned();
        let predicted = model.predict(&head).unwrap();
        assert_eq!(predicted.to_vec(), y.codes().to_vec()[..100].to_vec());
    }

    #[test]
    fn gini_of_pure_and_mixed_nodes() {
        assert_eq!(gini(&[4, 0], 4), 0.0);
        assert_eq!(gini(&[2, 2], 4), 0.5);
    }

    #[test]
    fn min_samples_split_below_two_is_rejected() {
        let params = ParamSet::from([("min_samples_split".to_string(), ParamValue::Int(1))]);
        assert!(DecisionTree::from_params(&params).is_err());
    }
}
