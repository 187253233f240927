use std::fmt::Write as _;

use crate::outcome::{OUTCOME_COUNT, Outcome, Prob3};

#[derive(Debug, Clone, Copy)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Rows are true classes, columns predicted classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfusionMatrix {
    pub counts: [[usize; OUTCOME_COUNT]; OUTCOME_COUNT],
}

#[derive(Debug, Clone)]
pub struct ClassificationReport {
    pub per_class: [ClassMetrics; OUTCOME_COUNT],
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub samples: usize,
}

pub fn accuracy_score(truth: &[Outcome], predicted: &[Outcome]) -> f64 {
    if truth.is_empty() || truth.len() != predicted.len() {
        return 0.0;
    }
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    correct as f64 / truth.len() as f64
}

impl ConfusionMatrix {
    pub fn from_predictions(truth: &[Outcome], predicted: &[Outcome]) -> Self {
        let mut counts = [[0usize; OUTCOME_COUNT]; OUTCOME_COUNT];
        for (t, p) in truth.iter().zip(predicted) {
            counts[t.index()][p.index()] += 1;
        }
        Self { counts }
    }

    pub fn support(&self, class: usize) -> usize {
        self.counts[class].iter().sum()
    }

    pub fn predicted(&self, class: usize) -> usize {
        self.counts.iter().map(|row| row[class]).sum()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn class_metrics(&self, class: usize) -> ClassMetrics {
        let tp = self.counts[class][class] as f64;
        let support = self.support(class);
        let predicted = self.predicted(class);
        // Undefined ratios report as 0, matching the usual zero_division default.
        let precision = if predicted == 0 {
            0.0
        } else {
            tp / predicted as f64
        };
        let recall = if support == 0 {
            0.0
        } else {
            tp / support as f64
        };
        let f1 = if precision + recall <= 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        ClassMetrics {
            precision,
            recall,
            f1,
            support,
        }
    }
}

pub fn classification_report(truth: &[Outcome], predicted: &[Outcome]) -> ClassificationReport {
    let cm = ConfusionMatrix::from_predictions(truth, predicted);
    let per_class = [0, 1, 2].map(|c| cm.class_metrics(c));
    let samples = cm.total();

    let k = OUTCOME_COUNT as f64;
    let macro_avg = ClassMetrics {
        precision: per_class.iter().map(|m| m.precision).sum::<f64>() / k,
        recall: per_class.iter().map(|m| m.recall).sum::<f64>() / k,
        f1: per_class.iter().map(|m| m.f1).sum::<f64>() / k,
        support: samples,
    };

    let n = samples.max(1) as f64;
    let weighted = |f: fn(&ClassMetrics) -> f64| {
        per_class
            .iter()
            .map(|m| f(m) * m.support as f64)
            .sum::<f64>()
            / n
    };
    let weighted_avg = ClassMetrics {
        precision: weighted(|m| m.precision),
        recall: weighted(|m| m.recall),
        f1: weighted(|m| m.f1),
        support: samples,
    };

    ClassificationReport {
        per_class,
        accuracy: accuracy_score(truth, predicted),
        macro_avg,
        weighted_avg,
        samples,
    }
}

impl ClassificationReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>14} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        );
        out.push('\n');
        for outcome in Outcome::ALL {
            let m = self.per_class[outcome.index()];
            let _ = writeln!(
                out,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                outcome.label(),
                m.precision,
                m.recall,
                m.f1,
                m.support
            );
        }
        out.push('\n');
        let _ = writeln!(
            out,
            "{:>14} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.samples
        );
        for (name, m) in [
            ("macro avg", self.macro_avg),
            ("weighted avg", self.weighted_avg),
        ] {
            let _ = writeln!(
                out,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            );
        }
        out
    }
}

pub fn evaluate_probs(predictions: &[Prob3], outcomes: &[Outcome]) -> Metrics {
    if predictions.is_empty() || outcomes.is_empty() || predictions.len() != outcomes.len() {
        return Metrics {
            samples: 0,
            brier: 0.0,
            log_loss: 0.0,
            accuracy: 0.0,
        };
    }

    let mut brier_sum = 0.0_f64;
    let mut log_loss_sum = 0.0_f64;
    let mut correct = 0usize;

    for (p, outcome) in predictions.iter().zip(outcomes) {
        for candidate in Outcome::ALL {
            let y = if candidate == *outcome { 1.0 } else { 0.0 };
            brier_sum += (p.get(candidate) - y).powi(2);
        }
        log_loss_sum += -p.get(*outcome).clamp(1e-12, 1.0).ln();
        if p.argmax() == *outcome {
            correct += 1;
        }
    }

    let n = predictions.len() as f64;
    Metrics {
        samples: predictions.len(),
        brier: brier_sum / n,
        log_loss: log_loss_sum / n,
        accuracy: correct as f64 / n,
    }
}
