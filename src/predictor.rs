use anyhow::{Result, bail};
use chrono::{Duration, NaiveDate, Utc};
use tracing::warn;

use crate::aggregator::{FormAggregator, check_chronological};
use crate::feature_schema::FeatureRow;
use crate::match_record::{FullTimeResult, MatchRecord};
use crate::metrics::Prob3;
use crate::model_store::ModelArtifacts;
use crate::team_form::TeamFormState;

#[derive(Debug, Clone)]
pub struct Prediction {
    pub home_team: String,
    pub away_team: String,
    pub fixture_date: NaiveDate,
    pub probs: Prob3,
    /// Results ordered from most to least likely.
    pub ranked: Vec<(FullTimeResult, f64)>,
    /// Form of each side going into the fixture; `None` for an unseen team.
    pub home_form: Option<TeamFormState>,
    pub away_form: Option<TeamFormState>,
    pub features: FeatureRow,
}

impl Prediction {
    pub fn label(&self, result: FullTimeResult) -> String {
        outcome_label(result, &self.home_team, &self.away_team)
    }
}

pub fn outcome_label(result: FullTimeResult, home: &str, away: &str) -> String {
    match result {
        FullTimeResult::HomeWin => format!("{home} win"),
        FullTimeResult::Draw => "Draw".to_string(),
        FullTimeResult::AwayWin => format!("{away} win"),
    }
}

/// Placeholder fixture one day after the latest known match, or today with
/// no history. Its 0-0 draw never feeds back into a feature row.
pub fn synthetic_fixture(history: &[MatchRecord], home: &str, away: &str) -> MatchRecord {
    let date = history
        .iter()
        .map(|m| m.date)
        .max()
        .map(|d| d + Duration::days(1))
        .unwrap_or_else(|| Utc::now().date_naive());
    MatchRecord::new(date, home, away, 0, 0, FullTimeResult::Draw)
}

/// Pre-match features of `home` v `away` after the whole history, plus the
/// aggregator state as it stood before the fixture.
pub fn prepare_fixture(
    history: &[MatchRecord],
    home: &str,
    away: &str,
) -> Result<(FeatureRow, FormAggregator)> {
    if home.trim().is_empty() || away.trim().is_empty() {
        bail!("both teams must be named");
    }
    if home == away {
        bail!("home and away team are the same ({home})");
    }
    check_chronological(history)?;

    let mut aggregator = FormAggregator::new();
    aggregator.run(history);
    for team in [home, away] {
        if aggregator.team(team).is_none() {
            warn!(team, "team has no match history, its features are all zero");
        }
    }

    let fixture = synthetic_fixture(history, home, away);
    let row = aggregator.clone().process(&fixture);
    Ok((row, aggregator))
}

pub fn predict_fixture(
    history: &[MatchRecord],
    home: &str,
    away: &str,
    artifacts: &ModelArtifacts,
) -> Result<Prediction> {
    let (features, aggregator) = prepare_fixture(history, home, away)?;
    let probs = artifacts.predict_probs(&features);

    let mut ranked: Vec<(FullTimeResult, f64)> = FullTimeResult::ALL
        .iter()
        .map(|r| (*r, probs.get(*r)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    Ok(Prediction {
        home_team: home.to_string(),
        away_team: away.to_string(),
        fixture_date: features.date,
        probs,
        ranked,
        home_form: aggregator.team(home).cloned(),
        away_form: aggregator.team(away).cloned(),
        features,
    })
}
