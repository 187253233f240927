use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use rand::Rng;
use rand::SeedableRng;
use rand::distributions::{Distribution, Uniform, WeightedIndex};
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;

use crate::dataset::TrainingTable;
use crate::features::{MatchFeatures, feature_columns};
use crate::outcome::{OUTCOME_COUNT, Outcome};

pub const DEFAULT_SAMPLES: usize = 5000;
pub const DEFAULT_SEED: u64 = 42;

const ELO_MEAN: f64 = 1500.0;
const ELO_STDDEV: f64 = 200.0;
const XG_DIFF_STDDEV: f64 = 0.5;

const BASE_PROB: f64 = 0.33;
const HOME_PROB_MIN: f64 = 0.1;
const HOME_PROB_MAX: f64 = 0.8;
const AWAY_NOISE: f64 = 0.1;

/// How the raw `[home, draw, away]` weights are turned into a sampling distribution.
/// `draw = 1 - home - away` can go negative when both sides are strong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutcomeSampling {
    /// Negative weights are clipped to zero and the vector renormalized.
    #[default]
    Normalized,
    /// Weights are used as-is; a negative weight fails generation.
    Reference,
}

impl FromStr for OutcomeSampling {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "normalized" | "normalised" | "clip" => Ok(OutcomeSampling::Normalized),
            "reference" | "raw" => Ok(OutcomeSampling::Reference),
            other => Err(anyhow!(
                "unknown outcome sampling '{}', use normalized or reference",
                other
            )),
        }
    }
}

pub fn home_win_probability(features: &MatchFeatures) -> f64 {
    let p = BASE_PROB
        + (features.elo_difference / 1000.0) * 0.2
        + features.home_form_weighted * 0.1
        + features.venue_advantage * 0.15
        + features.motivation_differential * 0.05;
    p.clamp(HOME_PROB_MIN, HOME_PROB_MAX)
}

pub fn outcome_weights(
    home_prob: f64,
    away_prob: f64,
    sampling: OutcomeSampling,
) -> Result<[f64; OUTCOME_COUNT]> {
    let draw_prob = 1.0 - home_prob - away_prob;
    let raw = [home_prob, draw_prob, away_prob];
    match sampling {
        OutcomeSampling::Reference => {
            if let Some(w) = raw.iter().find(|w| !w.is_finite() || **w < 0.0) {
                return Err(anyhow!(
                    "outcome weights are not non-negative: home={:.4} draw={:.4} away={:.4} (offending {:.4})",
                    home_prob,
                    draw_prob,
                    away_prob,
                    w
                ));
            }
            Ok(raw)
        }
        OutcomeSampling::Normalized => {
            let clipped = raw.map(|w| if w.is_finite() { w.max(0.0) } else { 0.0 });
            let sum: f64 = clipped.iter().sum();
            if sum <= 0.0 {
                return Err(anyhow!("outcome weights sum to zero"));
            }
            Ok(clipped.map(|w| w / sum))
        }
    }
}

/// Holds the per-feature distributions; one instance serves a whole table.
pub struct MatchSampler {
    elo: Normal<f64>,
    xg_diff: Normal<f64>,
    unit: Uniform<f64>,
    strength: Uniform<f64>,
    venue: Uniform<f64>,
    motivation: Uniform<f64>,
    competitiveness: Uniform<f64>,
    away_noise: Uniform<f64>,
    sampling: OutcomeSampling,
}

impl MatchSampler {
    pub fn new(sampling: OutcomeSampling) -> Result<Self> {
        Ok(Self {
            elo: Normal::new(ELO_MEAN, ELO_STDDEV).context("elo distribution")?,
            xg_diff: Normal::new(0.0, XG_DIFF_STDDEV).context("xg distribution")?,
            unit: Uniform::new(0.0, 1.0),
            strength: Uniform::new(0.5, 2.0),
            venue: Uniform::new(0.0, 0.3),
            motivation: Uniform::new(-0.5, 0.5),
            competitiveness: Uniform::new(0.6, 1.0),
            away_noise: Uniform::new(-AWAY_NOISE, AWAY_NOISE),
            sampling,
        })
    }

    /// Draw order is part of the reproducibility contract: elo pair, the
    /// remaining features in schema order, away noise, then the outcome.
    pub fn sample_features<R: Rng + ?Sized>(&self, rng: &mut R) -> MatchFeatures {
        let home_team_elo = self.elo.sample(rng);
        let away_team_elo = self.elo.sample(rng);
        MatchFeatures {
            home_team_elo,
            away_team_elo,
            elo_difference: home_team_elo - away_team_elo,
            home_form_weighted: self.unit.sample(rng),
            away_form_weighted: self.unit.sample(rng),
            h2h_win_rate: self.unit.sample(rng),
            home_xg_diff: self.xg_diff.sample(rng),
            away_xg_diff: self.xg_diff.sample(rng),
            home_attack_strength: self.strength.sample(rng),
            away_attack_strength: self.strength.sample(rng),
            home_defense_strength: self.strength.sample(rng),
            away_defense_strength: self.strength.sample(rng),
            home_key_players_score: self.unit.sample(rng),
            away_key_players_score: self.unit.sample(rng),
            venue_advantage: self.venue.sample(rng),
            motivation_differential: self.motivation.sample(rng),
            market_confidence: self.unit.sample(rng),
            league_competitiveness: self.competitiveness.sample(rng),
            season_stage: self.unit.sample(rng),
        }
    }

    pub fn sample_outcome<R: Rng + ?Sized>(
        &self,
        features: &MatchFeatures,
        rng: &mut R,
    ) -> Result<Outcome> {
        let home_prob = home_win_probability(features);
        let away_prob = BASE_PROB + self.away_noise.sample(rng);
        let weights = outcome_weights(home_prob, away_prob, self.sampling)?;
        let dist = WeightedIndex::new(weights).context("build outcome distribution")?;
        Outcome::from_index(dist.sample(rng))
            .ok_or_else(|| anyhow!("outcome index out of range"))
    }

    pub fn sample_row<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(MatchFeatures, Outcome)> {
        let features = self.sample_features(rng);
        let outcome = self.sample_outcome(&features, rng)?;
        Ok((features, outcome))
    }
}

pub fn generate_training_data(
    n_samples: usize,
    seed: u64,
    sampling: OutcomeSampling,
) -> Result<TrainingTable> {
    let sampler = MatchSampler::new(sampling)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut rows = Vec::with_capacity(n_samples);
    let mut outcomes = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let (features, outcome) = sampler
            .sample_row(&mut rng)
            .with_context(|| format!("generate row {}", i))?;
        rows.push(features.as_array());
        outcomes.push(outcome);
    }

    Ok(TrainingTable {
        feature_names: feature_columns(),
        rows,
        outcomes,
    })
}
