use std::collections::HashMap;

use anyhow::{Result, bail};
use tracing::debug;

use crate::feature_schema::{FEATURE_COUNT, FeatureRow, RELATIVE_OFFSET, SIDE_FEATURES};
use crate::match_record::MatchRecord;
use crate::team_form::{TeamFormState, Venue};

// Positions inside a side block, see `TeamFormState::side_features`.
const AVG_SCORED: usize = 0;
const AVG_CONCEDED: usize = 1;
const AVG_SHOTS_TARGET: usize = 2;
const FORM_SCORED: usize = 7;
const FORM_CONCEDED: usize = 8;
const FORM_WINS: usize = 9;

/// Walks a date-sorted match list once, emitting each fixture's pre-match
/// features before folding its result into the per-team state.
///
/// Input order is trusted. Use [`aggregate_checked`] when the caller cannot
/// vouch for it.
#[derive(Debug, Clone, Default)]
pub struct FormAggregator {
    teams: HashMap<String, TeamFormState>,
    processed: usize,
}

impl FormAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, record: &MatchRecord) -> FeatureRow {
        self.teams.entry(record.home_team.clone()).or_default();
        self.teams.entry(record.away_team.clone()).or_default();

        let empty = TeamFormState::default();
        let home = self.teams.get(&record.home_team).unwrap_or(&empty);
        let away = self.teams.get(&record.away_team).unwrap_or(&empty);
        let row = build_row(record, home, away);

        if let Some(state) = self.teams.get_mut(&record.home_team) {
            state.apply(record, Venue::Home);
        }
        if let Some(state) = self.teams.get_mut(&record.away_team) {
            state.apply(record, Venue::Away);
        }
        self.processed += 1;
        row
    }

    pub fn run(&mut self, matches: &[MatchRecord]) -> Vec<FeatureRow> {
        let rows: Vec<FeatureRow> = matches.iter().map(|m| self.process(m)).collect();
        debug!(
            matches = rows.len(),
            teams = self.teams.len(),
            "form aggregation pass finished"
        );
        rows
    }

    pub fn team(&self, name: &str) -> Option<&TeamFormState> {
        self.teams.get(name)
    }

    pub fn teams(&self) -> &HashMap<String, TeamFormState> {
        &self.teams
    }

    pub fn processed(&self) -> usize {
        self.processed
    }
}

/// One full pass over `matches` with a fresh state table.
pub fn build_features(matches: &[MatchRecord]) -> Vec<FeatureRow> {
    FormAggregator::new().run(matches)
}

/// Fails on the first pair of records whose dates go backwards.
pub fn check_chronological(matches: &[MatchRecord]) -> Result<()> {
    for (idx, pair) in matches.windows(2).enumerate() {
        if pair[1].date < pair[0].date {
            bail!(
                "match list is not sorted by date: row {} ({} {} v {}) precedes row {} ({} {} v {})",
                idx,
                pair[0].date,
                pair[0].home_team,
                pair[0].away_team,
                idx + 1,
                pair[1].date,
                pair[1].home_team,
                pair[1].away_team,
            );
        }
    }
    Ok(())
}

/// Ordering check followed by a full pass; returns the rows and the final
/// team states.
pub fn aggregate_checked(matches: &[MatchRecord]) -> Result<(Vec<FeatureRow>, FormAggregator)> {
    check_chronological(matches)?;
    let mut aggregator = FormAggregator::new();
    let rows = aggregator.run(matches);
    Ok((rows, aggregator))
}

fn build_row(record: &MatchRecord, home: &TeamFormState, away: &TeamFormState) -> FeatureRow {
    let h = home.side_features(Venue::Home);
    let a = away.side_features(Venue::Away);

    let mut values = [0.0_f64; FEATURE_COUNT];
    values[..SIDE_FEATURES].copy_from_slice(&h);
    values[SIDE_FEATURES..RELATIVE_OFFSET].copy_from_slice(&a);
    values[RELATIVE_OFFSET] = h[AVG_SCORED] - a[AVG_CONCEDED];
    values[RELATIVE_OFFSET + 1] = h[AVG_SHOTS_TARGET] - a[AVG_SHOTS_TARGET];
    values[RELATIVE_OFFSET + 2] = h[FORM_SCORED] - a[FORM_SCORED];
    values[RELATIVE_OFFSET + 3] = h[FORM_CONCEDED] - a[FORM_CONCEDED];
    values[RELATIVE_OFFSET + 4] = h[FORM_WINS] - a[FORM_WINS];

    FeatureRow {
        home_team: record.home_team.clone(),
        away_team: record.away_team.clone(),
        date: record.date,
        result: record.result,
        home_matches_prior: home.matches_played,
        away_matches_prior: away.matches_played,
        values,
    }
}
