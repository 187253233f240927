use anyhow::{Result, anyhow};

use crate::dataset::{TrainingTable, stratified_split};
use crate::forest::{ForestConfig, RandomForest};
use crate::metrics::{
    ClassificationReport, Metrics, accuracy_score, classification_report, evaluate_probs,
};
use crate::persist::ModelArtifact;

pub const TOP_FEATURES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainerConfig {
    pub test_fraction: f64,
    pub split_seed: u64,
    pub forest: ForestConfig,
    pub train_parallelism: Option<usize>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            split_seed: 42,
            forest: ForestConfig::default(),
            train_parallelism: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedFeature {
    pub name: String,
    pub importance: f64,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: RandomForest,
    pub feature_columns: Vec<String>,
    pub train_samples: usize,
    pub test_samples: usize,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub test_probability_metrics: Metrics,
    pub ranked_features: Vec<RankedFeature>,
    pub report: ClassificationReport,
}

impl TrainingOutcome {
    pub fn to_artifact(&self) -> ModelArtifact {
        let mut artifact = ModelArtifact::new(self.model.clone(), self.feature_columns.clone());
        artifact.train_samples = self.train_samples;
        artifact.test_samples = self.test_samples;
        artifact.train_accuracy = self.train_accuracy;
        artifact.test_accuracy = self.test_accuracy;
        artifact
    }
}

pub fn train_prediction_model(
    table: &TrainingTable,
    cfg: &TrainerConfig,
) -> Result<TrainingOutcome> {
    if table.is_empty() {
        return Err(anyhow!("training table is empty"));
    }
    log::info!(
        "Training on {} matches with {} features",
        table.len(),
        table.feature_names.len()
    );

    let split = stratified_split(table, cfg.test_fraction, cfg.split_seed)?;
    log::debug!(
        "split train={} test={}",
        split.x_train.len(),
        split.x_test.len()
    );

    log::info!(
        "Training random forest ({} trees, max depth {:?})",
        cfg.forest.n_estimators,
        cfg.forest.max_depth
    );
    // Fitting and batch evaluation share the sized pool.
    let (model, train_pred, test_proba) = with_train_pool(cfg.train_parallelism, || {
        let model = RandomForest::fit(&split.x_train, &split.y_train, cfg.forest)?;
        let train_pred = model.predict_batch(&split.x_train)?;
        let test_proba = model.predict_proba_batch(&split.x_test)?;
        Ok::<_, anyhow::Error>((model, train_pred, test_proba))
    })?;
    let test_pred: Vec<_> = test_proba.iter().map(|p| p.argmax()).collect();

    let train_accuracy = accuracy_score(&split.y_train, &train_pred);
    let test_accuracy = accuracy_score(&split.y_test, &test_pred);
    log::debug!("evaluated {} test rows", test_pred.len());

    let ranked_features = rank_features(&table.feature_names, model.feature_importances());
    let report = classification_report(&split.y_test, &test_pred);
    let test_probability_metrics = evaluate_probs(&test_proba, &split.y_test);

    Ok(TrainingOutcome {
        model,
        feature_columns: table.feature_names.clone(),
        train_samples: split.x_train.len(),
        test_samples: split.x_test.len(),
        train_accuracy,
        test_accuracy,
        test_probability_metrics,
        ranked_features,
        report,
    })
}

/// Descending by importance; ties keep schema order.
pub fn rank_features(names: &[String], importances: &[f64]) -> Vec<RankedFeature> {
    let mut ranked: Vec<RankedFeature> = names
        .iter()
        .zip(importances)
        .map(|(name, importance)| RankedFeature {
            name: name.clone(),
            importance: *importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

pub fn render_top_features(ranked: &[RankedFeature], limit: usize) -> String {
    let width = ranked
        .iter()
        .take(limit)
        .map(|f| f.name.len())
        .max()
        .unwrap_or(7)
        .max("feature".len());
    let mut out = format!("{:>width$} {:>10}\n", "feature", "importance");
    for f in ranked.iter().take(limit) {
        out.push_str(&format!("{:>width$} {:>10.6}\n", f.name, f.importance));
    }
    out
}

pub fn render_training_summary(outcome: &TrainingOutcome) -> String {
    let mut out = format!(
        "Training Accuracy: {:.3}\nTest Accuracy: {:.3}\n",
        outcome.train_accuracy, outcome.test_accuracy
    );
    out.push_str(&format!(
        "Test log loss: {:.4}  Brier: {:.4}\n",
        outcome.test_probability_metrics.log_loss, outcome.test_probability_metrics.brier
    ));

    out.push_str(&format!("\nTop {} Most Important Features:\n", TOP_FEATURES));
    out.push_str(&render_top_features(&outcome.ranked_features, TOP_FEATURES));

    out.push_str("\nClassification Report:\n");
    out.push_str(&outcome.report.render());
    out
}

pub fn print_training_summary(outcome: &TrainingOutcome) {
    print!("{}", render_training_summary(outcome));
}

fn with_train_pool<T>(threads: Option<usize>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    let Some(threads) = threads else {
        return action();
    };
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(action),
        Err(err) => {
            log::warn!("falling back to the global rayon pool: {err}");
            action()
        }
    }
}
