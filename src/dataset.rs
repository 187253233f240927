use anyhow::{Result, anyhow};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::features::FEATURE_COUNT;
use crate::outcome::{OUTCOME_COUNT, Outcome, outcome_counts};

pub type FeatureRow = [f64; FEATURE_COUNT];

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingTable {
    pub feature_names: Vec<String>,
    pub rows: Vec<FeatureRow>,
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Clone)]
pub struct Split {
    pub x_train: Vec<FeatureRow>,
    pub x_test: Vec<FeatureRow>,
    pub y_train: Vec<Outcome>,
    pub y_test: Vec<Outcome>,
}

impl TrainingTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn class_counts(&self) -> [usize; OUTCOME_COUNT] {
        outcome_counts(&self.outcomes)
    }
}

/// Per-class shuffled train/test partition. Each class contributes
/// `round(test_fraction * class_count)` rows to the test side.
pub fn stratified_split(table: &TrainingTable, test_fraction: f64, seed: u64) -> Result<Split> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(anyhow!(
            "test fraction must be in (0, 1), got {}",
            test_fraction
        ));
    }
    if table.rows.len() != table.outcomes.len() {
        return Err(anyhow!(
            "row/outcome length mismatch rows={} outcomes={}",
            table.rows.len(),
            table.outcomes.len()
        ));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_idx = Vec::new();
    let mut test_idx = Vec::new();
    for outcome in Outcome::ALL {
        let mut idx: Vec<usize> = table
            .outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| **o == outcome)
            .map(|(i, _)| i)
            .collect();
        idx.shuffle(&mut rng);
        let n_test = ((idx.len() as f64) * test_fraction).round() as usize;
        test_idx.extend_from_slice(&idx[..n_test]);
        train_idx.extend_from_slice(&idx[n_test..]);
    }

    if train_idx.is_empty() || test_idx.is_empty() {
        return Err(anyhow!(
            "failed to split train/test samples train={} test={}",
            train_idx.len(),
            test_idx.len()
        ));
    }

    // Interleave classes again so downstream consumers don't see class-sorted rows.
    train_idx.shuffle(&mut rng);
    test_idx.shuffle(&mut rng);

    Ok(Split {
        x_train: train_idx.iter().map(|&i| table.rows[i]).collect(),
        y_train: train_idx.iter().map(|&i| table.outcomes[i]).collect(),
        x_test: test_idx.iter().map(|&i| table.rows[i]).collect(),
        y_test: test_idx.iter().map(|&i| table.outcomes[i]).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::feature_columns;

    fn table_with(counts: [usize; 3]) -> TrainingTable {
        let mut rows = Vec::new();
        let mut outcomes = Vec::new();
        for (class, n) in counts.iter().enumerate() {
            for i in 0..*n {
                let mut row = [0.0; FEATURE_COUNT];
                row[0] = (class * 1000 + i) as f64;
                rows.push(row);
                outcomes.push(Outcome::from_index(class).unwrap());
            }
        }
        TrainingTable {
            feature_names: feature_columns(),
            rows,
            outcomes,
        }
    }

    #[test]
    fn split_preserves_class_proportions() {
        let table = table_with([500, 200, 300]);
        let split = stratified_split(&table, 0.2, 42).unwrap();
        assert_eq!(split.x_train.len() + split.x_test.len(), 1000);
        assert_eq!(outcome_counts(&split.y_test), [100, 40, 60]);
        assert_eq!(outcome_counts(&split.y_train), [400, 160, 240]);
    }

    #[test]
    fn split_keeps_rows_paired_with_labels() {
        let table = table_with([50, 30, 20]);
        let split = stratified_split(&table, 0.25, 7).unwrap();
        for (row, y) in split.x_train.iter().zip(&split.y_train) {
            assert_eq!((row[0] as usize) / 1000, y.index());
        }
        for (row, y) in split.x_test.iter().zip(&split.y_test) {
            assert_eq!((row[0] as usize) / 1000, y.index());
        }
    }

    #[test]
    fn split_is_deterministic_per_seed() {
        let table = table_with([40, 40, 40]);
        let a = stratified_split(&table, 0.2, 42).unwrap();
        let b = stratified_split(&table, 0.2, 42).unwrap();
        assert_eq!(a.x_test, b.x_test);
        assert_eq!(a.y_train, b.y_train);
    }

    #[test]
    fn split_rejects_bad_fraction() {
        let table = table_with([10, 10, 10]);
        assert!(stratified_split(&table, 0.0, 1).is_err());
        assert!(stratified_split(&table, 1.0, 1).is_err());
        assert!(stratified_split(&table_with([0, 0, 0]), 0.2, 1).is_err());
    }
}
