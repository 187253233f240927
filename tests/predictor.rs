use std::collections::HashMap;
use std::sync::OnceLock;

use proptest::prelude::*;

use football_predict::features::{FEATURE_NAMES, example_match, feature_columns};
use football_predict::forest::{ForestConfig, RandomForest};
use football_predict::predictor::{align_features, predict_match_outcome};
use football_predict::synth::{OutcomeSampling, generate_training_data};

fn model() -> &'static RandomForest {
    static MODEL: OnceLock<RandomForest> = OnceLock::new();
    MODEL.get_or_init(|| {
        let table = generate_training_data(800, 42, OutcomeSampling::Normalized).unwrap();
        let cfg = ForestConfig {
            n_estimators: 25,
            ..ForestConfig::default()
        };
        RandomForest::fit(&table.rows, &table.outcomes, cfg).unwrap()
    })
}

#[test]
fn example_match_prediction_is_well_formed() {
    let result =
        predict_match_outcome(model(), &feature_columns(), &example_match().to_map()).unwrap();
    assert!(["Home Win", "Draw", "Away Win"].contains(&result.label()));
    assert!(result.confidence > 33.3 && result.confidence <= 100.0);
    assert!((result.probabilities.sum() - 1.0).abs() < 1e-9);
    assert_eq!(result.prediction, result.probabilities.argmax());
}

#[test]
fn key_order_of_the_mapping_does_not_matter() {
    let forward: HashMap<String, f64> = example_match().to_map().into_iter().collect();
    let mut pairs: Vec<(String, f64)> = forward.clone().into_iter().collect();
    pairs.reverse();
    let mut reversed = HashMap::with_capacity(1);
    for (k, v) in pairs {
        reversed.insert(k, v);
    }

    let cols = feature_columns();
    let a = predict_match_outcome(model(), &cols, &forward).unwrap();
    let b = predict_match_outcome(model(), &cols, &reversed).unwrap();
    assert_eq!(a, b);
}

#[test]
fn missing_keys_default_to_zero_deterministically() {
    let mut partial = example_match().to_map();
    partial.remove("home_team_elo");
    partial.remove("elo_difference");

    let mut zeroed = example_match().to_map();
    zeroed.insert("home_team_elo".to_string(), 0.0);
    zeroed.insert("elo_difference".to_string(), 0.0);

    let cols = feature_columns();
    let from_partial = predict_match_outcome(model(), &cols, &partial).unwrap();
    let from_zeroed = predict_match_outcome(model(), &cols, &zeroed).unwrap();
    assert_eq!(from_partial, from_zeroed);
    assert_eq!(
        from_partial,
        predict_match_outcome(model(), &cols, &partial).unwrap()
    );
}

#[test]
fn extra_keys_are_ignored() {
    let mut extended = example_match().to_map();
    extended.insert("weather_index".to_string(), 99.0);
    let cols = feature_columns();
    assert_eq!(
        predict_match_outcome(model(), &cols, &extended).unwrap(),
        predict_match_outcome(model(), &cols, &example_match().to_map()).unwrap()
    );
}

#[test]
fn schema_width_mismatch_is_an_error() {
    let short: Vec<String> = feature_columns().into_iter().take(5).collect();
    assert!(predict_match_outcome(model(), &short, &example_match().to_map()).is_err());
}

#[test]
fn alignment_forces_training_order() {
    let mut cols = feature_columns();
    cols.reverse();
    let aligned = align_features(&cols, &example_match().to_map());
    let mut expected = example_match().as_array().to_vec();
    expected.reverse();
    assert_eq!(aligned, expected);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn probabilities_sum_to_one_for_any_mapping(
        values in proptest::collection::vec(-3000.0f64..3000.0, FEATURE_NAMES.len()),
        keep in proptest::collection::vec(any::<bool>(), FEATURE_NAMES.len()),
    ) {
        let map: HashMap<String, f64> = FEATURE_NAMES
            .iter()
            .zip(values)
            .zip(keep)
            .filter(|(_, k)| *k)
            .map(|((name, v), _)| (name.to_string(), v))
            .collect();
        let result = predict_match_outcome(model(), &feature_columns(), &map).unwrap();
        prop_assert!((result.probabilities.sum() - 1.0).abs() < 1e-9);
        prop_assert!(result.confidence >= 100.0 / 3.0 - 1e-9);
        prop_assert!(result.confidence <= 100.0 + 1e-9);
    }
}
