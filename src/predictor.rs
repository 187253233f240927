use std::collections::HashMap;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::forest::RandomForest;
use crate::outcome::{Outcome, Prob3};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPrediction {
    pub prediction: Outcome,
    pub probabilities: Prob3,
    /// Highest class probability as a percentage.
    pub confidence: f64,
}

impl MatchPrediction {
    pub fn label(&self) -> &'static str {
        self.prediction.label()
    }
}

/// Lays the caller's values out in training-schema order. Schema features the
/// caller didn't supply become 0.0; keys outside the schema are dropped.
pub fn align_features(
    feature_columns: &[String],
    match_features: &HashMap<String, f64>,
) -> Vec<f64> {
    feature_columns
        .iter()
        .map(|name| match_features.get(name).copied().unwrap_or(0.0))
        .collect()
}

pub fn predict_match_outcome(
    model: &RandomForest,
    feature_columns: &[String],
    match_features: &HashMap<String, f64>,
) -> Result<MatchPrediction> {
    if feature_columns.len() != model.n_features() {
        return Err(anyhow!(
            "feature schema has {} columns but the model expects {}",
            feature_columns.len(),
            model.n_features()
        ));
    }

    let row = align_features(feature_columns, match_features);
    let probabilities = model.predict_proba(&row)?;
    Ok(MatchPrediction {
        prediction: probabilities.argmax(),
        probabilities,
        confidence: probabilities.max() * 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Vec<String> {
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    }

    #[test]
    fn alignment_follows_schema_order() {
        let map = HashMap::from([
            ("c".to_string(), 3.0),
            ("a".to_string(), 1.0),
            ("b".to_string(), 2.0),
        ]);
        assert_eq!(align_features(&schema(), &map), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn alignment_defaults_missing_and_drops_unknown() {
        let map = HashMap::from([("b".to_string(), 2.0), ("zzz".to_string(), 9.0)]);
        assert_eq!(align_features(&schema(), &map), vec![0.0, 2.0, 0.0]);
        assert_eq!(align_features(&schema(), &HashMap::new()), vec![0.0; 3]);
    }
}
