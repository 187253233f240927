use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const FEATURE_COUNT: usize = 19;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "home_team_elo",
    "away_team_elo",
    "elo_difference",
    "home_form_weighted",
    "away_form_weighted",
    "h2h_win_rate",
    "home_xg_diff",
    "away_xg_diff",
    "home_attack_strength",
    "away_attack_strength",
    "home_defense_strength",
    "away_defense_strength",
    "home_key_players_score",
    "away_key_players_score",
    "venue_advantage",
    "motivation_differential",
    "market_confidence",
    "league_competitiveness",
    "season_stage",
];

pub fn feature_columns() -> Vec<String> {
    FEATURE_NAMES.iter().map(|name| name.to_string()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchFeatures {
    pub home_team_elo: f64,
    pub away_team_elo: f64,
    pub elo_difference: f64,
    pub home_form_weighted: f64,
    pub away_form_weighted: f64,
    pub h2h_win_rate: f64,
    pub home_xg_diff: f64,
    pub away_xg_diff: f64,
    pub home_attack_strength: f64,
    pub away_attack_strength: f64,
    pub home_defense_strength: f64,
    pub away_defense_strength: f64,
    pub home_key_players_score: f64,
    pub away_key_players_score: f64,
    pub venue_advantage: f64,
    pub motivation_differential: f64,
    pub market_confidence: f64,
    pub league_competitiveness: f64,
    pub season_stage: f64,
}

impl MatchFeatures {
    /// Values in `FEATURE_NAMES` order.
    pub fn as_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.home_team_elo,
            self.away_team_elo,
            self.elo_difference,
            self.home_form_weighted,
            self.away_form_weighted,
            self.h2h_win_rate,
            self.home_xg_diff,
            self.away_xg_diff,
            self.home_attack_strength,
            self.away_attack_strength,
            self.home_defense_strength,
            self.away_defense_strength,
            self.home_key_players_score,
            self.away_key_players_score,
            self.venue_advantage,
            self.motivation_differential,
            self.market_confidence,
            self.league_competitiveness,
            self.season_stage,
        ]
    }

    pub fn from_array(v: [f64; FEATURE_COUNT]) -> Self {
        Self {
            home_team_elo: v[0],
            away_team_elo: v[1],
            elo_difference: v[2],
            home_form_weighted: v[3],
            away_form_weighted: v[4],
            h2h_win_rate: v[5],
            home_xg_diff: v[6],
            away_xg_diff: v[7],
            home_attack_strength: v[8],
            away_attack_strength: v[9],
            home_defense_strength: v[10],
            away_defense_strength: v[11],
            home_key_players_score: v[12],
            away_key_players_score: v[13],
            venue_advantage: v[14],
            motivation_differential: v[15],
            market_confidence: v[16],
            league_competitiveness: v[17],
            season_stage: v[18],
        }
    }

    pub fn to_map(&self) -> HashMap<String, f64> {
        FEATURE_NAMES
            .iter()
            .zip(self.as_array())
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}

/// Fixture used by the demo run and the predictor binary when no features file is given.
pub fn example_match() -> MatchFeatures {
    MatchFeatures {
        home_team_elo: 1650.0,
        away_team_elo: 1580.0,
        elo_difference: 70.0,
        home_form_weighted: 0.8,
        away_form_weighted: 0.6,
        h2h_win_rate: 0.6,
        home_xg_diff: 0.3,
        away_xg_diff: -0.1,
        home_attack_strength: 1.2,
        away_attack_strength: 0.9,
        home_defense_strength: 1.1,
        away_defense_strength: 0.8,
        home_key_players_score: 0.9,
        away_key_players_score: 0.7,
        venue_advantage: 0.15,
        motivation_differential: 0.1,
        market_confidence: 0.7,
        league_competitiveness: 0.85,
        season_stage: 0.6,
    }
}
