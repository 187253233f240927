use serde::{Deserialize, Serialize};

pub const OUTCOME_COUNT: usize = 3;

pub const OUTCOME_LABELS: [&str; OUTCOME_COUNT] = ["Home Win", "Draw", "Away Win"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    HomeWin,
    Draw,
    AwayWin,
}

impl Outcome {
    pub const ALL: [Outcome; OUTCOME_COUNT] = [Outcome::HomeWin, Outcome::Draw, Outcome::AwayWin];

    pub fn index(self) -> usize {
        match self {
            Outcome::HomeWin => 0,
            Outcome::Draw => 1,
            Outcome::AwayWin => 2,
        }
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn label(self) -> &'static str {
        OUTCOME_LABELS[self.index()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prob3 {
    #[serde(rename = "home_win")]
    pub home: f64,
    pub draw: f64,
    #[serde(rename = "away_win")]
    pub away: f64,
}

impl Prob3 {
    pub fn from_array(p: [f64; OUTCOME_COUNT]) -> Self {
        Self {
            home: p[0],
            draw: p[1],
            away: p[2],
        }
    }

    pub fn as_array(self) -> [f64; OUTCOME_COUNT] {
        [self.home, self.draw, self.away]
    }

    pub fn get(self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::HomeWin => self.home,
            Outcome::Draw => self.draw,
            Outcome::AwayWin => self.away,
        }
    }

    pub fn sum(self) -> f64 {
        self.home + self.draw + self.away
    }

    pub fn max(self) -> f64 {
        self.home.max(self.draw).max(self.away)
    }

    // Ties resolve toward the lower class index.
    pub fn argmax(self) -> Outcome {
        if self.home >= self.draw && self.home >= self.away {
            Outcome::HomeWin
        } else if self.draw >= self.away {
            Outcome::Draw
        } else {
            Outcome::AwayWin
        }
    }
}

pub fn outcome_counts(outcomes: &[Outcome]) -> [usize; OUTCOME_COUNT] {
    let mut counts = [0usize; OUTCOME_COUNT];
    for outcome in outcomes {
        counts[outcome.index()] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::{Outcome, Prob3, outcome_counts};

    #[test]
    fn index_round_trips_and_rejects_unknown() {
        for outcome in Outcome::ALL {
            assert_eq!(Outcome::from_index(outcome.index()), Some(outcome));
        }
        assert_eq!(Outcome::from_index(3), None);
        assert_eq!(Outcome::AwayWin.label(), "Away Win");
    }

    #[test]
    fn argmax_prefers_lower_index_on_ties() {
        let p = Prob3 {
            home: 0.4,
            draw: 0.4,
            away: 0.2,
        };
        assert_eq!(p.argmax(), Outcome::HomeWin);
        let q = Prob3 {
            home: 0.2,
            draw: 0.3,
            away: 0.5,
        };
        assert_eq!(q.argmax(), Outcome::AwayWin);
        assert!((q.max() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn counts_cover_all_samples() {
        let outcomes = vec![
            Outcome::HomeWin,
            Outcome::HomeWin,
            Outcome::Draw,
            Outcome::AwayWin,
        ];
        assert_eq!(outcome_counts(&outcomes), [2, 1, 1]);
        assert_eq!(outcome_counts(&[]), [0, 0, 0]);
    }

    #[test]
    fn probabilities_serialize_with_outcome_keys() {
        let raw = serde_json::to_string(&Prob3::from_array([1.0 / 3.0; 3])).unwrap();
        assert!(raw.contains("\"home_win\""));
        assert!(raw.contains("\"draw\""));
        assert!(raw.contains("\"away_win\""));
    }
}
