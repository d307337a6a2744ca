//! The one place the model's input columns are defined. Training, backtests,
//! live prediction and persisted artifacts all go through this list, so a
//! column can never drift between call sites.

use std::collections::HashMap;

use chrono::NaiveDate;
use once_cell::sync::Lazy;

use crate::match_record::FullTimeResult;

/// Bump whenever `FEATURE_NAMES` changes; persisted models record it.
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

pub const FEATURE_COUNT: usize = 35;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Home_AvgGoalsScored_Prev",
    "Home_AvgGoalsConceded_Prev",
    "Home_AvgShotsTarget_Prev",
    "Home_AvgCorners_Prev",
    "Home_WinRatio_Prev",
    "Home_DrawRatio_Prev",
    "Home_LossRatio_Prev",
    "Home_Form_GoalsScored_Last5",
    "Home_Form_GoalsConceded_Last5",
    "Home_Form_Wins_Last5",
    "Home_Form_Draws_Last5",
    "Home_Form_Losses_Last5",
    "Home_HomeWinRatio_Prev",
    "Home_HomeGoalsScored_Prev",
    "Home_HomeGoalsConceded_Prev",
    "Away_AvgGoalsScored_Prev",
    "Away_AvgGoalsConceded_Prev",
    "Away_AvgShotsTarget_Prev",
    "Away_AvgCorners_Prev",
    "Away_WinRatio_Prev",
    "Away_DrawRatio_Prev",
    "Away_LossRatio_Prev",
    "Away_Form_GoalsScored_Last5",
    "Away_Form_GoalsConceded_Last5",
    "Away_Form_Wins_Last5",
    "Away_Form_Draws_Last5",
    "Away_Form_Losses_Last5",
    "Away_AwayWinRatio_Prev",
    "Away_AwayGoalsScored_Prev",
    "Away_AwayGoalsConceded_Prev",
    "GoalDifference_Prev",
    "ShotsTargetDifference_Prev",
    "FormDifference_GoalsScored_Last5",
    "FormDifference_GoalsConceded_Last5",
    "FormDifference_Wins_Last5",
];

/// Number of per-side features; the away block starts at this offset.
pub const SIDE_FEATURES: usize = 15;
pub const RELATIVE_OFFSET: usize = SIDE_FEATURES * 2;

static FEATURE_INDEX: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    FEATURE_NAMES
        .iter()
        .enumerate()
        .map(|(idx, name)| (*name, idx))
        .collect()
});

pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_INDEX.get(name).copied()
}

pub fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}

/// Pre-match features of a single fixture plus its identifying columns.
/// `result` is the training label and never part of `values`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub home_team: String,
    pub away_team: String,
    pub date: NaiveDate,
    pub result: FullTimeResult,
    /// Prior matches of each side when the row was built.
    pub home_matches_prior: u32,
    pub away_matches_prior: u32,
    pub values: [f64; FEATURE_COUNT],
}

impl FeatureRow {
    pub fn get(&self, name: &str) -> Option<f64> {
        feature_index(name).map(|idx| self.values[idx])
    }

    pub fn min_prior_matches(&self) -> u32 {
        self.home_matches_prior.min(self.away_matches_prior)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_indexed() {
        assert_eq!(FEATURE_INDEX.len(), FEATURE_COUNT);
        assert_eq!(feature_index("Home_AvgGoalsScored_Prev"), Some(0));
        assert_eq!(feature_index("Away_AvgGoalsScored_Prev"), Some(SIDE_FEATURES));
        assert_eq!(feature_index("GoalDifference_Prev"), Some(RELATIVE_OFFSET));
        assert_eq!(feature_index("FullTimeResult"), None);
    }

    #[test]
    fn side_blocks_mirror_each_other() {
        for i in 0..SIDE_FEATURES {
            let home = FEATURE_NAMES[i].trim_start_matches("Home_");
            let away = FEATURE_NAMES[SIDE_FEATURES + i].trim_start_matches("Away_");
            assert_eq!(home.replace("Home", "Venue"), away.replace("Away", "Venue"));
        }
    }

    #[test]
    fn row_columns_are_read_by_name() {
        let mut values = [0.0; FEATURE_COUNT];
        values[RELATIVE_OFFSET] = 0.75;
        values[FEATURE_COUNT - 1] = -0.2;
        let row = FeatureRow {
            home_team: "Fulham".to_string(),
            away_team: "Everton".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 4, 6).unwrap(),
            result: FullTimeResult::Draw,
            home_matches_prior: 12,
            away_matches_prior: 9,
            values,
        };
        assert_eq!(row.values.len(), FEATURE_NAMES.len());
        assert_eq!(row.get("GoalDifference_Prev"), Some(0.75));
        assert_eq!(row.get("FormDifference_Wins_Last5"), Some(-0.2));
        assert_eq!(row.get("Referee"), None);
        assert_eq!(row.min_prior_matches(), 9);
        assert_eq!(row.clone(), row);
    }
}
