use anyhow::{Result, anyhow};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::outcome::OUTCOME_COUNT;

const IMPURITY_EPS: f64 = 1e-12;
const VALUE_EPS: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: [f64; OUTCOME_COUNT],
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// CART classification tree over weighted samples, Gini criterion.
/// Rows go left when `row[feature] <= threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    n_features: usize,
    nodes: Vec<Node>,
    #[serde(default)]
    importances: Vec<f64>,
}

impl DecisionTree {
    /// `weights[i] == 0.0` excludes a row (used for bootstrap holdouts).
    pub fn fit<R, G>(
        x: &[R],
        y: &[usize],
        weights: &[f64],
        params: TreeParams,
        rng: &mut G,
    ) -> Result<Self>
    where
        R: AsRef<[f64]>,
        G: Rng + ?Sized,
    {
        if x.is_empty() {
            return Err(anyhow!("cannot fit a tree on zero rows"));
        }
        if x.len() != y.len() || x.len() != weights.len() {
            return Err(anyhow!(
                "fit input length mismatch x={} y={} weights={}",
                x.len(),
                y.len(),
                weights.len()
            ));
        }
        if let Some(bad) = y.iter().find(|c| **c >= OUTCOME_COUNT) {
            return Err(anyhow!("class index {} out of range", bad));
        }
        let n_features = x[0].as_ref().len();
        if n_features == 0 {
            return Err(anyhow!("rows have no features"));
        }
        if x.iter().any(|row| row.as_ref().len() != n_features) {
            return Err(anyhow!("rows have inconsistent feature counts"));
        }

        let mut idx: Vec<usize> = (0..x.len()).filter(|&i| weights[i] > 0.0).collect();
        if idx.is_empty() {
            return Err(anyhow!("all sample weights are zero"));
        }

        let mut builder = Builder {
            x,
            y,
            weights,
            params,
            n_features,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
            feature_order: (0..n_features).collect(),
            rng,
        };
        builder.build(&mut idx, 0);

        let Builder {
            nodes,
            mut importances,
            ..
        } = builder;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for v in &mut importances {
                *v /= total;
            }
        }

        Ok(Self {
            n_features,
            nodes,
            importances,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], at: usize) -> usize {
            match &nodes[at] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Normalized impurity decrease per feature; all zeros for a single-leaf tree.
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn predict_proba(&self, row: &[f64]) -> [f64; OUTCOME_COUNT] {
        let mut at = 0usize;
        loop {
            match &self.nodes[at] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

struct Builder<'a, R, G: ?Sized> {
    x: &'a [R],
    y: &'a [usize],
    weights: &'a [f64],
    params: TreeParams,
    n_features: usize,
    nodes: Vec<Node>,
    importances: Vec<f64>,
    feature_order: Vec<usize>,
    rng: &'a mut G,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    children_impurity: f64,
    left_impurity: f64,
    right_impurity: f64,
    left_weight: f64,
    right_weight: f64,
}

impl<R, G> Builder<'_, R, G>
where
    R: AsRef<[f64]>,
    G: Rng + ?Sized,
{
    fn build(&mut self, idx: &mut [usize], depth: usize) -> usize {
        let counts = self.class_weights(idx);
        let node_weight: f64 = counts.iter().sum();
        let impurity = gini(&counts, node_weight);

        let at = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: normalized(counts, node_weight),
        });

        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        let n = idx.len();
        if depth_reached
            || n < self.params.min_samples_split
            || n < 2 * self.params.min_samples_leaf.max(1)
            || impurity <= IMPURITY_EPS
        {
            return at;
        }

        let Some(best) = self.find_split(idx) else {
            return at;
        };

        self.importances[best.feature] += node_weight * impurity
            - best.left_weight * best.left_impurity
            - best.right_weight * best.right_impurity;

        let split_at = partition(idx, |i| {
            self.x[i].as_ref()[best.feature] <= best.threshold
        });
        let (left_idx, right_idx) = idx.split_at_mut(split_at);
        let left = self.build(left_idx, depth + 1);
        let right = self.build(right_idx, depth + 1);
        self.nodes[at] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        at
    }

    fn class_weights(&self, idx: &[usize]) -> [f64; OUTCOME_COUNT] {
        let mut counts = [0.0; OUTCOME_COUNT];
        for &i in idx {
            counts[self.y[i]] += self.weights[i];
        }
        counts
    }

    fn find_split(&mut self, idx: &[usize]) -> Option<BestSplit> {
        let n = idx.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let max_features = self.params.max_features.clamp(1, self.n_features);
        let total = self.class_weights(idx);
        let total_weight: f64 = total.iter().sum();

        self.feature_order.shuffle(&mut *self.rng);

        let mut best: Option<BestSplit> = None;
        let mut visited = 0usize;
        let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(n);

        for pos in 0..self.n_features {
            // Constant features don't count toward max_features, and drawing
            // continues past the budget until some feature yields a valid split.
            if visited >= max_features && best.is_some() {
                break;
            }
            let feature = self.feature_order[pos];

            sorted.clear();
            sorted.extend(idx.iter().map(|&i| (self.x[i].as_ref()[feature], i)));
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
            if sorted[n - 1].0 <= sorted[0].0 + VALUE_EPS {
                continue;
            }
            visited += 1;

            let mut left = [0.0; OUTCOME_COUNT];
            for split in 1..n {
                let (_, prev) = sorted[split - 1];
                left[self.y[prev]] += self.weights[prev];

                if split < min_leaf || n - split < min_leaf {
                    continue;
                }
                let lo = sorted[split - 1].0;
                let hi = sorted[split].0;
                if hi <= lo + VALUE_EPS {
                    continue;
                }

                let left_weight: f64 = left.iter().sum();
                let right = [total[0] - left[0], total[1] - left[1], total[2] - left[2]];
                let right_weight = (total_weight - left_weight).max(0.0);
                let left_impurity = gini(&left, left_weight);
                let right_impurity = gini(&right, right_weight);
                let children_impurity =
                    (left_weight * left_impurity + right_weight * right_impurity) / total_weight;

                let better = best
                    .as_ref()
                    .is_none_or(|b| children_impurity < b.children_impurity);
                if better {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        children_impurity,
                        left_impurity,
                        right_impurity,
                        left_weight,
                        right_weight,
                    });
                }
            }
        }

        best
    }
}

fn gini(counts: &[f64; OUTCOME_COUNT], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
}

fn normalized(counts: [f64; OUTCOME_COUNT], total: f64) -> [f64; OUTCOME_COUNT] {
    if total <= 0.0 {
        return [1.0 / OUTCOME_COUNT as f64; OUTCOME_COUNT];
    }
    counts.map(|c| c / total)
}

/// Moves every element satisfying `pred` to the front, returns how many did.
fn partition(idx: &mut [usize], mut pred: impl FnMut(usize) -> bool) -> usize {
    let mut next = 0usize;
    for pos in 0..idx.len() {
        if pred(idx[pos]) {
            idx.swap(next, pos);
            next += 1;
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn params() -> TreeParams {
        TreeParams {
            max_depth: Some(8),
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: 2,
        }
    }

    #[test]
    fn separable_data_is_fit_exactly() {
        let x: Vec<[f64; 2]> = (0..30).map(|i| [i as f64, 0.0]).collect();
        let y: Vec<usize> = (0..30).map(|i| i / 10).collect();
        let w = vec![1.0; 30];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = DecisionTree::fit(&x, &y, &w, params(), &mut rng).unwrap();

        for (row, class) in x.iter().zip(&y) {
            let p = tree.predict_proba(row);
            assert_eq!(p[*class], 1.0);
        }
        // Only feature 0 carries signal.
        assert!((tree.feature_importances()[0] - 1.0).abs() < 1e-12);
        assert_eq!(tree.feature_importances()[1], 0.0);
    }

    #[test]
    fn max_depth_and_min_leaf_are_honored() {
        let x: Vec<[f64; 1]> = (0..64).map(|i| [i as f64]).collect();
        let y: Vec<usize> = (0..64).map(|i| i % 3).collect();
        let w = vec![1.0; 64];
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let p = TreeParams {
            max_depth: Some(3),
            min_samples_split: 2,
            min_samples_leaf: 5,
            max_features: 1,
        };
        let tree = DecisionTree::fit(&x, &y, &w, p, &mut rng).unwrap();
        assert!(tree.depth() <= 3);

        // Every leaf must hold at least min_samples_leaf rows.
        let mut per_leaf = std::collections::HashMap::new();
        for row in &x {
            let value = tree.predict_proba(row);
            let key = value.map(f64::to_bits);
            *per_leaf.entry(key).or_insert(0usize) += 1;
        }
        assert!(per_leaf.values().all(|c| *c >= 5));
    }

    #[test]
    fn zero_weight_rows_are_ignored() {
        let x: Vec<[f64; 1]> = vec![[0.0], [1.0], [2.0], [3.0]];
        let y = vec![0, 0, 2, 2];
        let w = vec![1.0, 1.0, 0.0, 0.0];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let tree = DecisionTree::fit(&x, &y, &w, params(), &mut rng).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_proba(&[3.0]), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn leaf_values_are_distributions() {
        let x: Vec<[f64; 1]> = (0..20).map(|i| [(i % 4) as f64]).collect();
        let y: Vec<usize> = (0..20).map(|i| (i * 7) % 3).collect();
        let w: Vec<f64> = (0..20).map(|i| 1.0 + (i % 2) as f64).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let tree = DecisionTree::fit(&x, &y, &w, params(), &mut rng).unwrap();
        for row in &x {
            let p = tree.predict_proba(row);
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn keeps_drawing_features_until_a_split_is_valid() {
        // Feature 0 varies on a single row, so min_samples_leaf rules out every cut on it.
        let x: Vec<[f64; 2]> = (0..12)
            .map(|i| [if i == 0 { 1.0 } else { 0.0 }, i as f64])
            .collect();
        let y: Vec<usize> = (0..12).map(|i| if i < 6 { 0 } else { 2 }).collect();
        let w = vec![1.0; 12];
        let p = TreeParams {
            max_depth: Some(4),
            min_samples_split: 2,
            min_samples_leaf: 3,
            max_features: 1,
        };
        for seed in 0..16 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let tree = DecisionTree::fit(&x, &y, &w, p, &mut rng).unwrap();
            assert!(tree.node_count() > 1, "seed {seed} left the root unsplit");
            assert_eq!(tree.predict_proba(&[0.0, 1.0]), [1.0, 0.0, 0.0]);
            assert_eq!(tree.predict_proba(&[0.0, 10.0]), [0.0, 0.0, 1.0]);
            assert!((tree.feature_importances()[1] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_mismatched_inputs() {
        let x: Vec<[f64; 1]> = vec![[0.0], [1.0]];
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!(DecisionTree::fit(&x, &[0], &[1.0, 1.0], params(), &mut rng).is_err());
        assert!(DecisionTree::fit(&x, &[0, 3], &[1.0, 1.0], params(), &mut rng).is_err());
        assert!(DecisionTree::fit(&x, &[0, 1], &[0.0, 0.0], params(), &mut rng).is_err());
    }
}
