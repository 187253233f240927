//! Bootstrap-aggregated CART forest for three-way outcome classification.

mod tree;

pub use tree::{DecisionTree, Node, TreeParams};

use anyhow::{Result, anyhow};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::outcome::{OUTCOME_COUNT, Outcome, Prob3, outcome_counts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxFeatures {
    Sqrt,
    All,
    Count(usize),
}

impl MaxFeatures {
    pub fn resolve(self, n_features: usize) -> usize {
        let n = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Count(n) => n,
        };
        n.clamp(1, n_features.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassWeight {
    Uniform,
    /// `n_samples / (n_classes * count(class))`, computed once on the full training set.
    Balanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub class_weight: ClassWeight,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: Some(15),
            min_samples_split: 10,
            min_samples_leaf: 5,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            class_weight: ClassWeight::Balanced,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    n_features: usize,
    trees: Vec<DecisionTree>,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    /// Fits `config.n_estimators` trees in parallel on the current rayon pool.
    /// Tree `t` draws from its own RNG seeded with `seed + t`, so the result
    /// doesn't depend on the pool size.
    pub fn fit<R>(x: &[R], y: &[Outcome], config: ForestConfig) -> Result<Self>
    where
        R: AsRef<[f64]> + Sync,
    {
        if x.is_empty() {
            return Err(anyhow!("cannot fit a forest on zero rows"));
        }
        if x.len() != y.len() {
            return Err(anyhow!(
                "fit input length mismatch x={} y={}",
                x.len(),
                y.len()
            ));
        }
        if config.n_estimators == 0 {
            return Err(anyhow!("n_estimators must be at least 1"));
        }
        let n_features = x[0].as_ref().len();

        let classes: Vec<usize> = y.iter().map(|o| o.index()).collect();
        let class_weights = class_weights(y, config.class_weight);
        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            max_features: config.max_features.resolve(n_features),
        };

        let trees = (0..config.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(t as u64));
                let weights = sample_weights(&classes, &class_weights, config.bootstrap, &mut rng);
                DecisionTree::fit(x, &classes, &weights, params, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;

        let feature_importances = average_importances(&trees, n_features);

        Ok(Self {
            config,
            n_features,
            trees,
            feature_importances,
        })
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn predict_proba(&self, row: &[f64]) -> Result<Prob3> {
        if row.len() != self.n_features {
            return Err(anyhow!(
                "expected {} features, got {}",
                self.n_features,
                row.len()
            ));
        }
        let mut acc = [0.0; OUTCOME_COUNT];
        for tree in &self.trees {
            let p = tree.predict_proba(row);
            for (a, v) in acc.iter_mut().zip(p) {
                *a += v;
            }
        }
        let n = self.trees.len().max(1) as f64;
        Ok(Prob3::from_array(acc.map(|v| v / n)))
    }

    pub fn predict(&self, row: &[f64]) -> Result<Outcome> {
        Ok(self.predict_proba(row)?.argmax())
    }

    pub fn predict_proba_batch<R>(&self, x: &[R]) -> Result<Vec<Prob3>>
    where
        R: AsRef<[f64]> + Sync,
    {
        x.par_iter()
            .map(|row| self.predict_proba(row.as_ref()))
            .collect()
    }

    pub fn predict_batch<R>(&self, x: &[R]) -> Result<Vec<Outcome>>
    where
        R: AsRef<[f64]> + Sync,
    {
        Ok(self
            .predict_proba_batch(x)?
            .into_iter()
            .map(Prob3::argmax)
            .collect())
    }
}

fn class_weights(y: &[Outcome], mode: ClassWeight) -> [f64; OUTCOME_COUNT] {
    match mode {
        ClassWeight::Uniform => [1.0; OUTCOME_COUNT],
        ClassWeight::Balanced => {
            let counts = outcome_counts(y);
            let present = counts.iter().filter(|c| **c > 0).count().max(1) as f64;
            let n = y.len() as f64;
            counts.map(|c| if c == 0 { 0.0 } else { n / (present * c as f64) })
        }
    }
}

/// Bootstrap multiplicity times class weight, per row.
fn sample_weights<G: Rng + ?Sized>(
    classes: &[usize],
    class_weights: &[f64; OUTCOME_COUNT],
    bootstrap: bool,
    rng: &mut G,
) -> Vec<f64> {
    let n = classes.len();
    let mut counts = vec![if bootstrap { 0.0 } else { 1.0 }; n];
    if bootstrap {
        for _ in 0..n {
            counts[rng.gen_range(0..n)] += 1.0;
        }
    }
    counts
        .iter()
        .zip(classes)
        .map(|(c, class)| c * class_weights[*class])
        .collect()
}

fn average_importances(trees: &[DecisionTree], n_features: usize) -> Vec<f64> {
    let mut out = vec![0.0; n_features];
    for tree in trees {
        for (o, v) in out.iter_mut().zip(tree.feature_importances()) {
            *o += v;
        }
    }
    let total: f64 = out.iter().sum();
    if total > 0.0 {
        for v in &mut out {
            *v /= total;
        }
    }
    out
}
